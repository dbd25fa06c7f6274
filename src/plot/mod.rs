//! Figure registry handed to simulation units as their plotting capability.
//!
//! Units never see the registry itself, only a [`Plotter`]. Draining the
//! registry closes every plotter issued before the drain, so a unit that
//! outlives its run cannot slip figures into the next one.

use std::{path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use thiserror::Error;

pub mod canvas;

pub use canvas::{Canvas, Rgb};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Figure {
    /// Drawn in-process; rasterized by the harvester.
    Canvas(Canvas),
    /// Already rasterized by an external interpreter into a staged PNG file.
    Staged(PathBuf),
}

impl From<Canvas> for Figure {
    fn from(canvas: Canvas) -> Self {
        Figure::Canvas(canvas)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("plotter belongs to a finished run")]
pub struct PlotterClosed;

#[derive(Debug, Default)]
struct RegistryState {
    epoch: u64,
    figures: Vec<Figure>,
}

#[derive(Debug, Clone, Default)]
pub struct FigureRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl FigureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plotter(&self) -> Plotter {
        let epoch = self.state.lock().epoch;
        Plotter { state: Arc::clone(&self.state), epoch }
    }

    pub fn len(&self) -> usize {
        self.state.lock().figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every open figure in creation order and reset to empty.
    pub fn drain(&self) -> Vec<Figure> {
        let mut state = self.state.lock();
        state.epoch += 1;
        std::mem::take(&mut state.figures)
    }
}

/// Handle through which a running unit opens figures.
#[derive(Debug, Clone)]
pub struct Plotter {
    state: Arc<Mutex<RegistryState>>,
    epoch: u64,
}

impl Plotter {
    /// Register a figure; returns its creation ordinal within the run.
    pub fn add(&self, figure: impl Into<Figure>) -> Result<usize, PlotterClosed> {
        let mut state = self.state.lock();
        if state.epoch != self.epoch {
            return Err(PlotterClosed);
        }
        state.figures.push(figure.into());
        Ok(state.figures.len() - 1)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().epoch != self.epoch
    }
}
