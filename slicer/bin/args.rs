use std::path::PathBuf;

use clap::Parser;
use slicer::raster::ResampleFilter;

#[derive(Debug, Parser)]
/// Slices a mesh into centered, anti-aliased PNG exposure masks.
pub struct Args {
    #[arg(long, required = true)]
    /// Mesh file to slice (.stl or .obj). Can be given several times, all
    /// bodies are merged into one part.
    pub mesh: Vec<PathBuf>,
    #[arg(long)]
    /// JSON printer profile with the build volume and pixel grid.
    pub profile: PathBuf,
    #[arg(long, default_value_t = 0.05)]
    /// Layer height in mm.
    pub layer_mm: f64,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    /// Supersampling factor used for anti-aliasing, 1 disables it.
    pub aa: u32,
    #[arg(long, value_enum, default_value_t)]
    /// Filter used to shrink the supersampled masks.
    pub filter: ResampleFilter,
    #[arg(long, default_value_t = 0)]
    /// Number of worker threads, 0 uses one per core.
    pub threads: usize,
    #[arg(long)]
    /// Directory the layer images are written to, created if missing.
    pub out: PathBuf,
    #[arg(short, long)]
    /// Log everything, including per-layer details.
    pub verbose: bool,
}
