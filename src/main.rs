mod cli;
mod printer;

use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use simlab::{
    config::{Config, EngineConfig},
    logging::{init_logging, LoggingConfig},
    ContentReference, Engine, NativeLoader,
};

use crate::{
    cli::{Cli, Command},
    printer::{JsonPrinter, TextPrinter},
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    // Load config; CLI flags override it
    let mut cfg = Config::load();
    if let Some(dir) = &args.projects_dir {
        cfg.set("SIMLAB_PROJECTS_DIR", dir.to_string_lossy());
    }
    if let Some(dir) = &args.blog_dir {
        cfg.set("SIMLAB_BLOG_DIR", dir.to_string_lossy());
    }

    init_logging(&LoggingConfig::from_config(&cfg)).context("initialising logging")?;

    let stdout_is_tty = std::io::stdout().is_terminal();
    match args.command {
        Command::Run { category, identifier, json, timeout, dpi } => {
            let mut engine_cfg = EngineConfig::from_config(&cfg);
            if let Some(secs) = timeout {
                engine_cfg.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if let Some(dpi) = dpi {
                engine_cfg.figure_dpi = dpi;
            }
            let engine = Engine::from_config(&engine_cfg, NativeLoader::new());
            let reference = ContentReference::new(category, identifier);
            let outcome = engine.run(&reference).await;

            if json || !stdout_is_tty {
                JsonPrinter.print(&outcome)?;
            } else {
                TextPrinter { color: true }.print(&outcome);
            }
            Ok(if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Locate { category, identifier } => {
            let engine_cfg = EngineConfig::from_config(&cfg);
            let locator = simlab::Locator::from_config(&engine_cfg);
            let reference = ContentReference::new(category, identifier);
            match locator.locate(&reference)? {
                Some(unit) => {
                    TextPrinter { color: stdout_is_tty }.print_unit(&unit);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("no simulation for {}", reference);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
