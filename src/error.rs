//! Error types for each stage of a simulation request.

use std::path::PathBuf;

use thiserror::Error;

/// Locator errors. "Not found" is not an error; see [`crate::locator::Locator::locate`].
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("cannot read content directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A unit file could not be turned into a runnable program.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no loader accepts simulation file {}", .0.display())]
    Unsupported(PathBuf),
}

/// Failure raised while a program was loading or running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Source could not be parsed, or the interpreter could not start.
    #[error("{0}")]
    Load(String),

    /// The unit loaded but failed while running.
    #[error("{0}")]
    Runtime(String),
}

/// A single figure could not be rasterized or encoded.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("figure {ordinal} has zero area")]
    EmptyCanvas { ordinal: usize },

    #[error("figure {ordinal} at {} is not a PNG image", .path.display())]
    NotPng { ordinal: usize, path: PathBuf },

    #[error("figure {ordinal}: cannot read {}: {source}", .path.display())]
    Io {
        ordinal: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("figure {ordinal}: PNG encoding failed: {message}")]
    Encode { ordinal: usize, message: String },
}

impl HarvestError {
    pub fn ordinal(&self) -> usize {
        match self {
            HarvestError::EmptyCanvas { ordinal }
            | HarvestError::NotPng { ordinal, .. }
            | HarvestError::Io { ordinal, .. }
            | HarvestError::Encode { ordinal, .. } => *ordinal,
        }
    }
}
