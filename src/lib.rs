//! Simulation execution and artifact capture for portfolio content.
//!
//! A request names a content item; the engine finds its `*_sim` unit, runs it
//! with a private output sink and plotting capability, turns the figures it
//! left open into base64 PNGs, and folds everything into an
//! [`ExecutionOutcome`].

pub mod config;
pub mod content;
pub mod error;
pub mod execution;
pub mod harvest;
pub mod locator;
pub mod logging;
pub mod plot;
pub mod process;

pub use content::{Category, ContentReference};
pub use execution::{Engine, ExecutionOutcome, FailureKind, NativeLoader, RunContext, Status};
pub use locator::{Locator, SimulationUnit};
