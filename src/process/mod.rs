//! Interpreter process management for script-backed units.

use std::{path::Path, process::Stdio};

use tokio::process::Command;

pub mod python;

/// Environment variable naming the directory figures are staged into.
pub const FIGURE_DIR_ENV: &str = "SIMLAB_FIGURE_DIR";
/// Environment variable carrying the rasterization resolution.
pub const FIGURE_DPI_ENV: &str = "SIMLAB_FIGURE_DPI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterType {
    Python,
    Shell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub kind: InterpreterType,
    pub program: String,
}

impl Interpreter {
    pub fn python(program: impl Into<String>) -> Self {
        Self { kind: InterpreterType::Python, program: program.into() }
    }

    pub fn shell(program: impl Into<String>) -> Self {
        Self { kind: InterpreterType::Shell, program: program.into() }
    }

    /// The compile diagnostic, if the interpreter reported that the script
    /// never loaded. Exit codes are not consulted; scripts may use any.
    pub fn load_failure(&self, stderr: &[u8]) -> Option<String> {
        match self.kind {
            InterpreterType::Python => marked_line(stderr, python::LOAD_ERROR_MARKER),
            InterpreterType::Shell => None,
        }
    }

    /// Command that runs `script` with its figures staged into `figure_dir`.
    pub fn command(&self, script: &Path, figure_dir: &Path, dpi: u32) -> Command {
        let mut cmd = match self.kind {
            InterpreterType::Python => python::command(&self.program, script),
            InterpreterType::Shell => {
                let mut cmd = Command::new(&self.program);
                cmd.arg(script);
                cmd
            }
        };
        if let Some(dir) = script.parent() {
            cmd.current_dir(dir);
        }
        cmd.env(FIGURE_DIR_ENV, figure_dir)
            .env(FIGURE_DPI_ENV, dpi.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Parse-only invocation, when the interpreter has one outside the bootstrap.
    pub fn syntax_check(&self, script: &Path) -> Option<Command> {
        match self.kind {
            InterpreterType::Python => None,
            InterpreterType::Shell => {
                let mut cmd = Command::new(&self.program);
                cmd.arg("-n")
                    .arg(script)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true);
                Some(cmd)
            }
        }
    }
}

/// Extract the diagnostic a failed script left on stderr.
///
/// Prefers the bootstrap's marked line, then the last non-empty line.
pub fn error_message(stderr: &[u8]) -> Option<String> {
    marked_line(stderr, python::ERROR_MARKER).or_else(|| {
        String::from_utf8_lossy(stderr)
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    })
}

fn marked_line(stderr: &[u8], marker: &str) -> Option<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix(marker))
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_marked_error_line() {
        let stderr = b"Traceback (most recent call last):\n  File \"x\"\nZeroDivisionError: division by zero\n__simlab_error__: division by zero\n";
        assert_eq!(error_message(stderr).as_deref(), Some("division by zero"));
    }

    #[test]
    fn falls_back_to_last_line() {
        assert_eq!(error_message(b"warn\nboom: bad input\n\n").as_deref(), Some("boom: bad input"));
        assert_eq!(error_message(b"   \n"), None);
    }

    #[test]
    fn only_shell_has_syntax_check() {
        let script = Path::new("/tmp/a_sim.sh");
        assert!(Interpreter::shell("sh").syntax_check(script).is_some());
        assert!(Interpreter::python("python3").syntax_check(script).is_none());
    }

    #[test]
    fn load_failure_needs_the_compile_marker() {
        let python = Interpreter::python("python3");
        let compile = b"__simlab_load_error__: SyntaxError: invalid syntax (a_sim.py, line 2)\n";
        assert_eq!(
            python.load_failure(compile).as_deref(),
            Some("SyntaxError: invalid syntax (a_sim.py, line 2)")
        );
        assert_eq!(python.load_failure(b"__simlab_error__: division by zero\n"), None);
        assert_eq!(python.load_failure(b""), None);
        assert_eq!(Interpreter::shell("sh").load_failure(compile), None);
    }
}
