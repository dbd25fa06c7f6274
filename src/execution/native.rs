//! Units implemented as in-process Rust functions.

use std::{any::Any, collections::HashMap, error::Error, sync::Arc};

use async_trait::async_trait;

use super::{Program, RunContext, UnitLoader};
use crate::{error::{ExecError, LoadError}, locator::SimulationUnit};

pub type UnitResult = Result<(), Box<dyn Error + Send + Sync>>;

type UnitFn = dyn Fn(&mut RunContext) -> UnitResult + Send + Sync;

/// Maps unit file names (`orbit_sim.py`) to native implementations.
///
/// The file still has to exist for the locator to find it; its contents are
/// not read.
#[derive(Clone, Default)]
pub struct NativeLoader {
    units: HashMap<String, Arc<UnitFn>>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, file_name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut RunContext) -> UnitResult + Send + Sync + 'static,
    {
        self.units.insert(file_name.into(), Arc::new(body));
        self
    }
}

impl UnitLoader for NativeLoader {
    fn load(&self, unit: &SimulationUnit) -> Result<Box<dyn Program>, LoadError> {
        let body = self
            .units
            .get(&unit.file_name())
            .ok_or_else(|| LoadError::Unsupported(unit.path.clone()))?;
        Ok(Box::new(NativeProgram { body: Arc::clone(body) }))
    }
}

pub struct NativeProgram {
    body: Arc<UnitFn>,
}

#[async_trait]
impl Program for NativeProgram {
    async fn run(&mut self, cx: RunContext) -> Result<(), ExecError> {
        let body = Arc::clone(&self.body);
        let joined = tokio::task::spawn_blocking(move || {
            let mut cx = cx;
            body(&mut cx)
        })
        .await;
        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ExecError::Runtime(e.to_string())),
            Err(e) if e.is_panic() => Err(ExecError::Runtime(panic_message(e.into_panic()))),
            Err(e) => Err(ExecError::Runtime(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "simulation panicked".to_string()
    }
}
