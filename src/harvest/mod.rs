//! Turns the figures a run left open into base64 PNG artifacts.

use std::fs;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::HarvestError,
    plot::{
        canvas::{RasterError, MAX_DPI, PNG_SIGNATURE},
        Figure, FigureRegistry,
    },
};

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedArtifact {
    /// Creation index of the source figure.
    pub ordinal: usize,
    pub mime: &'static str,
    /// Base64 (standard alphabet, padded) PNG bytes.
    pub payload: String,
}

#[derive(Debug, Default)]
pub struct Harvest {
    pub artifacts: Vec<EncodedArtifact>,
    pub failures: Vec<HarvestError>,
}

#[derive(Debug, Clone, Copy)]
pub struct Harvester {
    dpi: u32,
}

impl Harvester {
    /// `dpi` is clamped to `1..=MAX_DPI`.
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.clamp(1, MAX_DPI) }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Drain `registry` and encode every figure.
    ///
    /// The registry is empty when this returns; a figure that cannot be
    /// encoded is reported in [`Harvest::failures`] and the rest still are.
    pub fn harvest(&self, registry: &FigureRegistry) -> Harvest {
        let figures = registry.drain();
        let mut harvest = Harvest::default();
        for (ordinal, figure) in figures.into_iter().enumerate() {
            match self.rasterize(ordinal, figure) {
                Ok(bytes) => harvest.artifacts.push(EncodedArtifact {
                    ordinal,
                    mime: PNG_MIME,
                    payload: STANDARD.encode(bytes),
                }),
                Err(err) => {
                    warn!(ordinal = err.ordinal(), error = %err, "figure skipped");
                    harvest.failures.push(err);
                }
            }
        }
        debug!(
            artifacts = harvest.artifacts.len(),
            failures = harvest.failures.len(),
            "harvest complete"
        );
        harvest
    }

    fn rasterize(&self, ordinal: usize, figure: Figure) -> Result<Vec<u8>, HarvestError> {
        match figure {
            Figure::Canvas(canvas) => canvas.rasterize(self.dpi).map_err(|e| match e {
                RasterError::ZeroArea => HarvestError::EmptyCanvas { ordinal },
                RasterError::Encode(e) => HarvestError::Encode { ordinal, message: e.to_string() },
            }),
            Figure::Staged(path) => {
                let bytes = fs::read(&path).map_err(|source| HarvestError::Io {
                    ordinal,
                    path: path.clone(),
                    source,
                });
                let _ = fs::remove_file(&path);
                let bytes = bytes?;
                if !bytes.starts_with(&PNG_SIGNATURE) {
                    return Err(HarvestError::NotPng { ordinal, path });
                }
                Ok(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::canvas::{png_dimensions, BLUE};
    use crate::plot::Canvas;

    #[test]
    fn resolution_is_bounded() {
        assert_eq!(Harvester::new(0).dpi(), 1);
        assert_eq!(Harvester::new(150).dpi(), 150);
        assert_eq!(Harvester::new(u32::MAX).dpi(), MAX_DPI);
    }

    #[test]
    fn bad_figure_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("figure_001.png");
        fs::write(&junk, b"not an image").unwrap();

        let registry = FigureRegistry::new();
        let plotter = registry.plotter();
        let mut good = Canvas::new(40, 40);
        good.fill_rect(10, 10, 5, 5, BLUE);
        plotter.add(good).unwrap();
        plotter.add(Figure::Staged(junk.clone())).unwrap();
        plotter.add(Canvas::new(0, 0)).unwrap();
        plotter.add(Canvas::new(8, 8)).unwrap();

        let harvest = Harvester::new(100).harvest(&registry);
        assert!(registry.is_empty());
        let ordinals: Vec<usize> = harvest.artifacts.iter().map(|a| a.ordinal).collect();
        assert_eq!(ordinals, vec![0, 3]);
        assert_eq!(harvest.failures.len(), 2);
        assert!(matches!(harvest.failures[0], HarvestError::NotPng { ordinal: 1, .. }));
        assert!(matches!(harvest.failures[1], HarvestError::EmptyCanvas { ordinal: 2 }));
        assert!(!junk.exists());

        let png = STANDARD.decode(&harvest.artifacts[0].payload).unwrap();
        assert_eq!(png_dimensions(&png), Some((13, 13)));
        assert_eq!(harvest.artifacts[0].mime, PNG_MIME);
    }

    #[test]
    fn missing_staged_file_is_reported() {
        let registry = FigureRegistry::new();
        registry.plotter().add(Figure::Staged("/nonexistent/figure_000.png".into())).unwrap();
        let harvest = Harvester::new(100).harvest(&registry);
        assert!(harvest.artifacts.is_empty());
        assert!(matches!(harvest.failures[0], HarvestError::Io { ordinal: 0, .. }));
    }
}
