use clap::ValueEnum;
use common::config::BuildProfile;
use geo::{Coord, Polygon};
use image::{imageops, GrayImage};
use nalgebra::Vector2;
use ordered_float::OrderedFloat;

use crate::planar::rings;

/// Filter used to shrink the supersampled canvas down to the printer's grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ResampleFilter {
    /// Windowed sinc, sharper edges with slight ringing.
    #[default]
    Lanczos,
    /// Plain average of every block, exactly the covered fraction.
    Box,
}

/// Scan converts millimeter space polygons into masks on a printer's pixel
/// grid. Image row 0 is the back of the build plate (largest Y).
#[derive(Debug, Clone)]
pub struct Rasterizer {
    resolution: Vector2<u32>,
    plate_depth: f64,
    scale: Vector2<f64>,
    anti_alias: u32,
    filter: ResampleFilter,
}

impl Rasterizer {
    pub fn new(profile: &BuildProfile, anti_alias: u32, filter: ResampleFilter) -> Self {
        Self {
            resolution: profile.platform_resolution,
            plate_depth: profile.platform_size.y,
            scale: profile.scale(),
            anti_alias: anti_alias.max(1),
            filter,
        }
    }

    /// Size of the supersampled working canvas.
    pub fn canvas_size(&self) -> Vector2<u32> {
        self.resolution * self.anti_alias
    }

    /// Maps a point in mm to canvas pixels, flipping Y.
    pub fn to_canvas(&self, point: Coord<f64>) -> Vector2<f64> {
        let aa = self.anti_alias as f64;
        Vector2::new(
            (point.x * self.scale.x * aa).round(),
            ((self.plate_depth - point.y) * self.scale.y * aa).round(),
        )
    }

    /// Renders the polygons into a mask at the printer's resolution. Every
    /// polygon is an independent fill region, its holes only exclude its own
    /// area, so the order of `polygons` does not matter.
    pub fn rasterize(&self, polygons: &[Polygon<f64>]) -> GrayImage {
        let size = self.canvas_size();
        let mut canvas = GrayImage::new(size.x, size.y);

        for polygon in polygons {
            self.fill_polygon(&mut canvas, polygon);
        }

        match self.anti_alias {
            1 => canvas,
            _ => downsample(&canvas, self.anti_alias, self.filter),
        }
    }

    fn fill_polygon(&self, canvas: &mut GrayImage, polygon: &Polygon<f64>) {
        let (width, height) = canvas.dimensions();
        let rings = rings(polygon)
            .map(|ring| ring.0.iter().map(|&x| self.to_canvas(x)).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let exterior = &rings[0];
        if exterior.len() < 3 {
            return;
        }

        let (min_y, max_y) = exterior
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), x| (min.min(x.y), max.max(x.y)));
        let first_row = min_y.max(0.0) as u32;
        let last_row = (max_y.max(0.0) as u32).min(height);

        let buffer: &mut [u8] = canvas;
        let mut crossings = Vec::new();

        // Each row is sampled through the pixel centers. As every vertex was
        // rounded to a whole pixel, no vertex can lie on a sample line.
        for row in first_row..last_row {
            let yc = row as f64 + 0.5;

            crossings.clear();
            crossings.extend(
                (rings.iter().flat_map(|x| x.windows(2)))
                    .filter(|x| (x[0].y > yc) ^ (x[1].y > yc))
                    .map(|x| {
                        let (a, b) = (x[0], x[1]);
                        let t = (yc - a.y) / (b.y - a.y);
                        a.x + t * (b.x - a.x)
                    }),
            );
            crossings.sort_by_key(|&x| OrderedFloat(x));

            // Pixels whose center lies between a pair of crossings are inside,
            // counting hole edges as crossings too.
            let offset = row as usize * width as usize;
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().clamp(0.0, width as f64) as usize;
                let end = (span[1] - 0.5).ceil().clamp(0.0, width as f64) as usize;
                buffer[offset + start..offset + end].fill(255);
            }
        }
    }
}

/// Shrinks a canvas by `factor` along both axes so edge pixels take on the
/// gray level of their coverage.
pub fn downsample(canvas: &GrayImage, factor: u32, filter: ResampleFilter) -> GrayImage {
    let (width, height) = (canvas.width() / factor, canvas.height() / factor);

    match filter {
        ResampleFilter::Lanczos => {
            imageops::resize(canvas, width, height, imageops::FilterType::Lanczos3)
        }
        ResampleFilter::Box => {
            let area = factor * factor;
            GrayImage::from_fn(width, height, |x, y| {
                let sum = (0..factor)
                    .flat_map(|dy| (0..factor).map(move |dx| (dx, dy)))
                    .map(|(dx, dy)| canvas.get_pixel(x * factor + dx, y * factor + dy).0[0] as u32)
                    .sum::<u32>();
                image::Luma([((sum + area / 2) / area) as u8])
            })
        }
    }
}
