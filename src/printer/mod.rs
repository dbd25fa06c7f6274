//! Printers: JSON wire form and a colored terminal summary.

use owo_colors::OwoColorize;
use simlab::{ExecutionOutcome, SimulationUnit};

pub struct JsonPrinter;

impl JsonPrinter {
    pub fn print(&self, outcome: &ExecutionOutcome) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(outcome)?);
        Ok(())
    }
}

pub struct TextPrinter {
    pub color: bool,
}

impl TextPrinter {
    pub fn print(&self, outcome: &ExecutionOutcome) {
        let text = outcome.captured_text();
        if !text.is_empty() {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
        match outcome.error() {
            None => {
                let summary = format!("ok: {} plot(s) captured", outcome.artifacts().len());
                self.line(&summary, "green");
            }
            Some(err) => {
                let summary = format!("error ({}): {}", outcome.status_code(), err);
                self.line(&summary, "red");
            }
        }
    }

    pub fn print_unit(&self, unit: &SimulationUnit) {
        self.line(&unit.identifier, "cyan");
        println!("{}", unit.path.display());
    }

    fn line(&self, text: &str, color: &str) {
        if !self.color {
            println!("{}", text);
            return;
        }
        match color {
            "green" => println!("{}", text.green()),
            "red" => println!("{}", text.red()),
            "cyan" => println!("{}", text.cyan()),
            _ => println!("{}", text),
        }
    }
}
