use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{config::BuildProfile, misc::digit_count, progress::Progress};
use tracing::info;

use crate::{
    mesh::Mesh,
    raster::{Rasterizer, ResampleFilter},
    section::PlaneSlicer,
    SliceError,
};

mod slice_raster;
pub use slice_raster::{LayerOutcome, LayerResult, RenderedLayer, SliceReport};

/// Slack when dividing the mesh height into layers, so a height that is an
/// exact multiple of the layer height does not gain an extra layer.
pub const LAYER_COUNT_EPSILON: f64 = 1e-9;

/// Everything needed to turn a mesh into a stack of layer images.
#[derive(Debug, Clone)]
pub struct SliceConfig {
    pub profile: BuildProfile,
    /// Layer thickness in mm.
    pub layer_height: f64,
    /// Supersampling factor along each axis, 1 disables anti-aliasing.
    pub anti_alias: u32,
    pub filter: ResampleFilter,
    /// Worker threads, 0 lets rayon decide.
    pub threads: usize,
    pub output_dir: PathBuf,
}

/// Used to slice a mesh.
pub struct Slicer {
    config: SliceConfig,
    planes: PlaneSlicer,
    rasterizer: Rasterizer,

    start_height: f64,
    layers: usize,

    progress: Progress,
    cancel: CancelToken,
}

/// Cooperative cancellation flag, checked before every layer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl SliceConfig {
    pub fn validate(&self) -> Result<(), SliceError> {
        if !self.layer_height.is_finite() || self.layer_height <= 0.0 {
            return Err(SliceError::InvalidConfig(format!(
                "layer height must be positive and finite, got {}",
                self.layer_height
            )));
        }

        if self.anti_alias == 0 {
            return Err(SliceError::InvalidConfig(
                "anti-alias factor must be at least 1".into(),
            ));
        }

        let resolution = self.profile.platform_resolution;
        let canvas = (resolution.x.checked_mul(self.anti_alias))
            .zip(resolution.y.checked_mul(self.anti_alias));
        if canvas.map_or(true, |(x, y)| (x as u64 * y as u64) > isize::MAX as u64) {
            return Err(SliceError::InvalidConfig(format!(
                "anti-alias factor {} is too large for a {}x{} grid",
                self.anti_alias, resolution.x, resolution.y
            )));
        }

        Ok(())
    }
}

impl Slicer {
    /// Creates a new slicer given a slice config and a repaired mesh.
    pub fn new(config: SliceConfig, mesh: &Mesh) -> Result<Self, SliceError> {
        config.validate()?;
        if mesh.face_count() == 0 {
            return Err(SliceError::unreadable(None, "mesh has no faces"));
        }

        let (min, max) = mesh.bounds();
        let layers = layer_count(min.z, max.z, config.layer_height);
        let rasterizer = Rasterizer::new(&config.profile, config.anti_alias, config.filter);

        info!(
            "Slicing {layers} layers of {} mm. {{ profile: {}, grid: {}x{}, aa: {} }}",
            config.layer_height,
            config.profile.fingerprint,
            config.profile.platform_resolution.x,
            config.profile.platform_resolution.y,
            config.anti_alias,
        );

        let progress = Progress::new();
        progress.set_total(layers as u64);

        Ok(Self {
            planes: PlaneSlicer::new(mesh),
            rasterizer,
            start_height: min.z,
            layers,
            progress,
            cancel: CancelToken::default(),
            config,
        })
    }

    /// Gets an instance of the slicing [`Progress`] struct.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Height of the plane used for a layer, taken through its middle.
    pub fn layer_height_at(&self, index: usize) -> f64 {
        self.start_height + self.config.layer_height * (index as f64 + 0.5)
    }

    pub fn layer_path(&self, index: usize) -> PathBuf {
        self.config
            .output_dir
            .join(layer_file_name(index, self.layers))
    }
}

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Number of layers needed to cover `min_z..max_z`.
pub fn layer_count(min_z: f64, max_z: f64, layer_height: f64) -> usize {
    ((max_z - min_z) / layer_height - LAYER_COUNT_EPSILON)
        .ceil()
        .max(0.0) as usize
}

/// File name of a layer, numbered from one and padded to at least four
/// digits.
pub fn layer_file_name(index: usize, layers: usize) -> String {
    let width = digit_count(layers as u64).max(4);
    format!("layer_{:0width$}.png", index + 1)
}
