//! Terminal result of one simulation request and its wire form.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::{
    error::{ExecError, LocateError},
    harvest::{EncodedArtifact, Harvest},
};

pub const NOT_FOUND_MESSAGE: &str = "Simulation file not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    LocatorFailure,
    LoadFailure,
    RuntimeFailure,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure(FailureKind),
}

/// Why a located unit did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RunFailure {
    pub fn timed_out(limit: Duration) -> Self {
        Self {
            kind: FailureKind::TimedOut,
            message: format!("simulation exceeded the {:.1}s time limit", limit.as_secs_f64()),
        }
    }
}

impl From<ExecError> for RunFailure {
    fn from(err: ExecError) -> Self {
        let kind = match err {
            ExecError::Load(_) => FailureKind::LoadFailure,
            ExecError::Runtime(_) => FailureKind::RuntimeFailure,
        };
        Self { kind, message: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    status: Status,
    captured_text: String,
    artifacts: Vec<EncodedArtifact>,
    error: Option<String>,
}

impl ExecutionOutcome {
    pub fn not_found() -> Self {
        Self {
            status: Status::Failure(FailureKind::NotFound),
            captured_text: String::new(),
            artifacts: Vec::new(),
            error: Some(NOT_FOUND_MESSAGE.to_string()),
        }
    }

    pub fn locator_failed(err: &LocateError) -> Self {
        Self::failed(FailureKind::LocatorFailure, err.to_string(), String::new())
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>, captured_text: String) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "simulation failed".to_string();
        }
        Self {
            status: Status::Failure(kind),
            captured_text,
            artifacts: Vec::new(),
            error: Some(message),
        }
    }

    pub fn succeeded(captured_text: String, artifacts: Vec<EncodedArtifact>) -> Self {
        Self { status: Status::Success, captured_text, artifacts, error: None }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            Status::Success => None,
            Status::Failure(kind) => Some(kind),
        }
    }

    pub fn captured_text(&self) -> &str {
        &self.captured_text
    }

    pub fn artifacts(&self) -> &[EncodedArtifact] {
        &self.artifacts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// HTTP-style status for a request/response boundary.
    pub fn status_code(&self) -> u16 {
        match self.status {
            Status::Success => 200,
            Status::Failure(FailureKind::NotFound) => 404,
            Status::Failure(_) => 500,
        }
    }
}

/// Fold the run's pieces into one outcome. Artifacts are dropped on failure.
pub fn assemble(captured_text: String, harvest: Harvest, failure: Option<RunFailure>) -> ExecutionOutcome {
    match failure {
        Some(RunFailure { kind, message }) => ExecutionOutcome::failed(kind, message, captured_text),
        None => ExecutionOutcome::succeeded(captured_text, harvest.artifacts),
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a> {
    Success {
        success: bool,
        output: &'a str,
        plots: Vec<&'a str>,
    },
    Failure {
        error: &'a str,
    },
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self.status {
            Status::Success => Wire::Success {
                success: true,
                output: &self.captured_text,
                plots: self.artifacts.iter().map(|a| a.payload.as_str()).collect(),
            },
            Status::Failure(_) => Wire::Failure { error: self.error.as_deref().unwrap_or_default() },
        };
        wire.serialize(serializer)
    }
}
