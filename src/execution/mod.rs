//! Execution engine: program seam, output capture and outcome types.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{ExecError, LoadError},
    locator::SimulationUnit,
    plot::Plotter,
};

pub mod engine;
pub mod native;
pub mod outcome;
pub mod script;

pub use engine::Engine;
pub use native::NativeLoader;
pub use outcome::{ExecutionOutcome, FailureKind, Status};
pub use script::ScriptLoader;

/// Private, per-run text sink standing in for a unit's standard output.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, bytes: &[u8]) {
        self.buf.lock().extend_from_slice(bytes);
    }

    /// Clones of this sink still alive elsewhere, such as a pipe pump.
    pub fn other_writers(&self) -> usize {
        Arc::strong_count(&self.buf) - 1
    }

    /// Wait up to `grace` for every other clone to be dropped. Returns
    /// `false` if one is still attached when the grace period ends.
    pub async fn settle(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while self.other_writers() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}

impl io::Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything a unit is given to run with: an output sink and a plotting
/// capability. Nothing else from the host is reachable through it.
#[derive(Debug)]
pub struct RunContext {
    pub out: OutputSink,
    pub plot: Plotter,
    staging_dir: PathBuf,
    deadline: Option<Instant>,
    figure_dpi: u32,
}

impl RunContext {
    pub fn new(out: OutputSink, plot: Plotter, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            plot,
            staging_dir: staging_dir.into(),
            deadline: None,
            figure_dpi: crate::plot::canvas::BASE_DPI,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_figure_dpi(mut self, dpi: u32) -> Self {
        self.figure_dpi = dpi;
        self
    }

    /// Directory external interpreters write rendered figures into.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn figure_dpi(&self) -> u32 {
        self.figure_dpi
    }

    /// Cooperative cancellation check for long-running native units.
    pub fn should_stop(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d) || self.plot.is_closed()
    }
}

/// A loaded simulation unit, ready to run once.
#[async_trait]
pub trait Program: Send {
    async fn run(&mut self, cx: RunContext) -> Result<(), ExecError>;
}

/// Turns a located unit file into a [`Program`].
pub trait UnitLoader: Send + Sync {
    fn load(&self, unit: &SimulationUnit) -> Result<Box<dyn Program>, LoadError>;
}

/// Tries each loader in order; the first one that accepts the unit wins.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Box<dyn UnitLoader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, loader: impl UnitLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }
}

impl UnitLoader for LoaderChain {
    fn load(&self, unit: &SimulationUnit) -> Result<Box<dyn Program>, LoadError> {
        for loader in &self.loaders {
            match loader.load(unit) {
                Err(LoadError::Unsupported(_)) => continue,
                other => return other,
            }
        }
        Err(LoadError::Unsupported(unit.path.clone()))
    }
}
