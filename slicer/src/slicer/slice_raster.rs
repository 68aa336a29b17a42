use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};

use image::{GrayImage, ImageFormat};
use nalgebra::Vector2;
use rayon::{
    iter::{IntoParallelIterator, ParallelIterator},
    ThreadPoolBuilder,
};
use tracing::{debug, info, warn};

use crate::{compositor::recenter, slicer::Slicer, SliceError};

/// A layer mask before it is written out.
#[derive(Debug, Clone)]
pub struct RenderedLayer {
    pub image: GrayImage,
    /// Translation that moved the section's centroid onto the plate center.
    pub offset: Vector2<f64>,
    pub open_chains: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    Written,
    /// Nothing to expose at this height, no file was written.
    Empty,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct LayerResult {
    pub index: usize,
    pub height: f64,
    pub outcome: LayerOutcome,
    pub path: Option<PathBuf>,
    pub open_chains: usize,
}

/// Summary of a slicing run, layers are listed in index order.
#[derive(Debug, Clone)]
pub struct SliceReport {
    pub layers: usize,
    pub written: usize,
    pub empty: usize,
    pub cancelled: usize,
    /// Open contour chains dropped over all layers.
    pub degenerate_chains: usize,
    /// Layers that dropped at least one open chain.
    pub degenerate_layers: usize,
    pub elapsed: Duration,
    pub results: Vec<LayerResult>,
}

impl Slicer {
    /// Actually runs the slicing operation, it is multithreaded. Layers
    /// without a cross-section are skipped, only i/o failures abort the run.
    pub fn slice(&self) -> Result<SliceReport, SliceError> {
        let start = Instant::now();
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|source| SliceError::Io {
            path: output_dir.to_owned(),
            source,
        })?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|err| SliceError::InvalidConfig(err.to_string()))?;

        // Every layer is independent of the others, so they are all sliced in
        // parallel. Collecting keeps them in index order no matter which
        // finishes first.
        let results = pool.install(|| {
            (0..self.layers)
                .into_par_iter()
                .map(|layer| {
                    let result = self.slice_layer(layer);
                    self.progress.add_complete(1);
                    result
                })
                .collect::<Result<Vec<_>, _>>()
        })?;
        self.progress.set_finished();

        let count = |outcome| results.iter().filter(|x| x.outcome == outcome).count();
        let report = SliceReport {
            layers: self.layers,
            written: count(LayerOutcome::Written),
            empty: count(LayerOutcome::Empty),
            cancelled: count(LayerOutcome::Cancelled),
            degenerate_chains: results.iter().map(|x| x.open_chains).sum(),
            degenerate_layers: results.iter().filter(|x| x.open_chains > 0).count(),
            elapsed: start.elapsed(),
            results,
        };

        info!(
            "Sliced {} layers. {{ written: {}, empty: {}, cancelled: {}, open chains: {} }}",
            report.layers, report.written, report.empty, report.cancelled, report.degenerate_chains
        );
        Ok(report)
    }

    /// Sections, recenters and rasterizes one layer without saving it.
    pub fn render_layer(&self, index: usize) -> Result<RenderedLayer, SliceError> {
        let z = self.layer_height_at(index);
        let section = self
            .planes
            .section_at(z)
            .ok_or(SliceError::EmptySlice { z })?;

        let center = self.config.profile.center();
        let Some((polygons, offset)) = recenter(&section.polygons, center) else {
            return Err(match section.open_chains {
                0 => SliceError::EmptySlice { z },
                open_chains => SliceError::DegenerateTopology { z, open_chains },
            });
        };

        Ok(RenderedLayer {
            image: self.rasterizer.rasterize(&polygons),
            offset,
            open_chains: section.open_chains,
        })
    }

    fn slice_layer(&self, index: usize) -> Result<LayerResult, SliceError> {
        let mut result = LayerResult {
            index,
            height: self.layer_height_at(index),
            outcome: LayerOutcome::Cancelled,
            path: None,
            open_chains: 0,
        };

        if self.cancel.is_cancelled() {
            return Ok(result);
        }

        let layer = match self.render_layer(index) {
            Ok(layer) => layer,
            Err(err) if !err.is_fatal() => {
                if let SliceError::DegenerateTopology { open_chains, .. } = err {
                    warn!("Layer {}: {err}", index + 1);
                    result.open_chains = open_chains;
                } else {
                    debug!("Layer {}: {err}", index + 1);
                }

                result.outcome = LayerOutcome::Empty;
                return Ok(result);
            }
            Err(err) => return Err(err),
        };

        if layer.open_chains > 0 {
            let err = SliceError::DegenerateTopology {
                z: result.height,
                open_chains: layer.open_chains,
            };
            warn!("Layer {}: {err}", index + 1);
        }

        let path = self.layer_path(index);
        layer
            .image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| SliceError::Image {
                path: path.clone(),
                source,
            })?;

        result.outcome = LayerOutcome::Written;
        result.path = Some(path);
        result.open_chains = layer.open_chains;
        Ok(result)
    }
}
