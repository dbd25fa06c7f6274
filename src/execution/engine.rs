//! Locate → execute → harvest → assemble, one run per process at a time.

use std::{
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn, Instrument};

use super::{
    outcome::{assemble, ExecutionOutcome, FailureKind, RunFailure},
    LoaderChain, OutputSink, RunContext, ScriptLoader, UnitLoader,
};
use crate::{
    config::EngineConfig,
    content::ContentReference,
    harvest::Harvester,
    locator::{Locator, SimulationUnit},
    plot::FigureRegistry,
};

/// How long a timed-out run's output writers get to finish.
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// The figure registry, guarded by the lock every run holds from handing
/// out its sink until the registry has been drained.
fn bench() -> &'static AsyncMutex<FigureRegistry> {
    static BENCH: OnceLock<AsyncMutex<FigureRegistry>> = OnceLock::new();
    BENCH.get_or_init(|| AsyncMutex::new(FigureRegistry::new()))
}

/// Figures currently open in the process-wide registry.
pub async fn open_figures() -> usize {
    bench().lock().await.len()
}

#[derive(Clone)]
pub struct Engine {
    locator: Locator,
    loader: Arc<dyn UnitLoader>,
    harvester: Harvester,
    timeout: Option<Duration>,
}

impl Engine {
    pub fn new(locator: Locator, loader: impl UnitLoader + 'static) -> Self {
        Self {
            locator,
            loader: Arc::new(loader),
            harvester: Harvester::new(crate::plot::canvas::BASE_DPI),
            timeout: None,
        }
    }

    /// Script interpreters from `cfg`, consulted after `native` units.
    pub fn from_config(cfg: &EngineConfig, native: super::NativeLoader) -> Self {
        let loader = LoaderChain::new().with(native).with(ScriptLoader::from_config(cfg));
        Self::new(Locator::from_config(cfg), loader)
            .with_dpi(cfg.figure_dpi)
            .with_timeout(cfg.timeout)
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.harvester = Harvester::new(dpi);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the simulation attached to `reference`. Never fails: every error
    /// becomes a failure outcome.
    pub async fn run(&self, reference: &ContentReference) -> ExecutionOutcome {
        let unit = match self.locator.locate(reference) {
            Ok(Some(unit)) => unit,
            Ok(None) => {
                debug!(reference = %reference, "no simulation for content");
                return ExecutionOutcome::not_found();
            }
            Err(err) => {
                warn!(reference = %reference, error = %err, "locator failed");
                return ExecutionOutcome::locator_failed(&err);
            }
        };
        self.run_unit(&unit).await
    }

    pub async fn run_unit(&self, unit: &SimulationUnit) -> ExecutionOutcome {
        let span = tracing::info_span!("simulation", unit = %unit.path.display());
        self.execute(unit).instrument(span).await
    }

    async fn execute(&self, unit: &SimulationUnit) -> ExecutionOutcome {
        let mut program = match self.loader.load(unit) {
            Ok(program) => program,
            Err(err) => {
                warn!(error = %err, "unit did not load");
                return ExecutionOutcome::failed(FailureKind::LoadFailure, err.to_string(), String::new());
            }
        };

        let registry = bench().lock().await;
        let staging = match tempfile::Builder::new().prefix("simlab-figures-").tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                return ExecutionOutcome::failed(
                    FailureKind::LoadFailure,
                    format!("cannot create figure staging directory: {}", err),
                    String::new(),
                );
            }
        };

        let started = Instant::now();
        let sink = OutputSink::new();
        let cx = RunContext::new(sink.clone(), registry.plotter(), staging.path())
            .with_deadline(self.timeout.map(|t| started + t))
            .with_figure_dpi(self.harvester.dpi());
        info!(name = %unit.identifier, "simulation started");

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, program.run(cx)).await {
                Ok(r) => r.map_err(RunFailure::from),
                Err(_) => {
                    // let pipe pumps drain what the killed child already wrote
                    if !sink.settle(OUTPUT_GRACE).await {
                        debug!("output writer still attached after the deadline");
                    }
                    Err(RunFailure::timed_out(limit))
                }
            },
            None => program.run(cx).await.map_err(RunFailure::from),
        };

        let harvest = self.harvester.harvest(&registry);
        drop(staging);
        let text = sink.contents();
        drop(registry);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(
                elapsed_ms,
                plots = harvest.artifacts.len(),
                skipped = harvest.failures.len(),
                "simulation finished"
            ),
            Err(failure) => warn!(
                elapsed_ms,
                kind = ?failure.kind,
                error = %failure.message,
                discarded_plots = harvest.artifacts.len(),
                "simulation failed"
            ),
        }
        assemble(text, harvest, result.err())
    }
}
