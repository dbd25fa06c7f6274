//! Units run by an external interpreter.

use std::{collections::HashMap, fs, path::{Path, PathBuf}, process::ExitStatus};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use super::{OutputSink, Program, RunContext, UnitLoader};
use crate::{
    config::EngineConfig,
    error::{ExecError, LoadError},
    locator::SimulationUnit,
    plot::{Figure, Plotter},
    process::{error_message, Interpreter},
};

/// Maps unit file extensions to interpreters.
#[derive(Debug, Clone, Default)]
pub struct ScriptLoader {
    interpreters: HashMap<String, Interpreter>,
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new()
            .with_interpreter("py", Interpreter::python(&cfg.python))
            .with_interpreter("sh", Interpreter::shell(&cfg.shell))
    }

    pub fn with_interpreter(mut self, extension: &str, interpreter: Interpreter) -> Self {
        self.interpreters
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), interpreter);
        self
    }
}

impl UnitLoader for ScriptLoader {
    fn load(&self, unit: &SimulationUnit) -> Result<Box<dyn Program>, LoadError> {
        let interpreter = unit
            .extension()
            .and_then(|ext| self.interpreters.get(&ext))
            .ok_or_else(|| LoadError::Unsupported(unit.path.clone()))?;
        Ok(Box::new(ScriptProgram {
            path: unit.path.clone(),
            interpreter: interpreter.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct ScriptProgram {
    path: PathBuf,
    interpreter: Interpreter,
}

#[async_trait]
impl Program for ScriptProgram {
    async fn run(&mut self, cx: RunContext) -> Result<(), ExecError> {
        let script = fs::canonicalize(&self.path)
            .map_err(|e| ExecError::Load(format!("cannot open {}: {}", self.path.display(), e)))?;
        self.check_syntax(&script).await?;

        let mut child = self
            .interpreter
            .command(&script, cx.staging_dir(), cx.figure_dpi())
            .spawn()
            .map_err(|e| ExecError::Load(format!("cannot start {}: {}", self.interpreter.program, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Load("no stdout".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::Load("no stderr".into()))?;

        // Pumped on its own task so text printed before a timeout survives the kill.
        let out_task = tokio::spawn(pump(stdout, cx.out.clone()));
        let err_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        });

        let status = child
            .wait()
            .await
            .map_err(|e| ExecError::Runtime(format!("waiting for simulation: {}", e)))?;
        match out_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "reading simulation stdout failed"),
            Err(e) => warn!(error = %e, "stdout pump task failed"),
        }
        let stderr = err_task.await.ok().and_then(Result::ok).unwrap_or_default();
        if !stderr.is_empty() {
            debug!(stderr = %String::from_utf8_lossy(&stderr), "simulation stderr");
        }

        stage_figures(cx.staging_dir(), &cx.plot);
        self.classify(status, &stderr)
    }
}

impl ScriptProgram {
    async fn check_syntax(&self, script: &Path) -> Result<(), ExecError> {
        let Some(mut cmd) = self.interpreter.syntax_check(script) else {
            return Ok(());
        };
        let out = cmd
            .output()
            .await
            .map_err(|e| ExecError::Load(format!("cannot start {}: {}", self.interpreter.program, e)))?;
        if out.status.success() {
            return Ok(());
        }
        Err(ExecError::Load(
            error_message(&out.stderr).unwrap_or_else(|| "syntax error".to_string()),
        ))
    }

    fn classify(&self, status: ExitStatus, stderr: &[u8]) -> Result<(), ExecError> {
        if status.success() {
            return Ok(());
        }
        if let Some(message) = self.interpreter.load_failure(stderr) {
            return Err(ExecError::Load(message));
        }
        Err(ExecError::Runtime(error_message(stderr).unwrap_or_else(|| {
            match status.code() {
                Some(code) => format!("simulation exited with status {}", code),
                None => "simulation terminated by a signal".to_string(),
            }
        })))
    }
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, sink: OutputSink) -> std::io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        sink.append(&buf[..n]);
    }
}

/// Register every file the interpreter staged, in file-name order.
fn stage_figures(dir: &Path, plot: &Plotter) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list staged figures");
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    for path in paths {
        if plot.add(Figure::Staged(path)).is_err() {
            warn!("plotter closed while staging figures");
            return;
        }
    }
}
