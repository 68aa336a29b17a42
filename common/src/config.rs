use std::{
    fs,
    path::{Path, PathBuf},
};

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Printer profile as it is stored on disk. Only the build volume and the
/// pixel grid are interpreted, every other field is ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PrinterProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Physical build volume (width, depth, height) in mm.
    pub build_mm: [f64; 3],
    /// Size of a single projected pixel in mm. Takes precedence over `pixels`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_pitch_mm: Option<f64>,
    /// Explicit pixel grid (width, height).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels: Option<[u32; 2]>,
}

/// Validated projection plane of a printer. Immutable once built and shared
/// read-only by every slicing task.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildProfile {
    pub platform_size: Vector3<f64>,
    pub platform_resolution: Vector2<u32>,
    /// Short hash of the source profile, used to tell runs apart in logs.
    pub fingerprint: String,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed profile `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("build dimension `{axis}` must be positive and finite, got {value}")]
    BuildDimension { axis: char, value: f64 },
    #[error("pixel pitch must be positive and finite, got {0}")]
    PixelPitch(f64),
    #[error("pixel grid resolves to zero along `{axis}`")]
    EmptyGrid { axis: char },
    #[error("profile must define either `pixel_pitch_mm` or `pixels`")]
    MissingGrid,
}

impl PrinterProfile {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl BuildProfile {
    /// Reads and validates a JSON printer profile.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_owned(),
            source,
        })?;
        let profile = PrinterProfile::from_json(&raw).map_err(|source| ProfileError::Parse {
            path: path.to_owned(),
            source,
        })?;

        Self::from_profile(&profile)
    }

    pub fn from_profile(profile: &PrinterProfile) -> Result<Self, ProfileError> {
        let [width, depth, height] = profile.build_mm;
        for (axis, value) in [('x', width), ('y', depth), ('z', height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProfileError::BuildDimension { axis, value });
            }
        }

        let resolution = match (profile.pixel_pitch_mm, profile.pixels) {
            (Some(pitch), _) => {
                if !pitch.is_finite() || pitch <= 0.0 {
                    return Err(ProfileError::PixelPitch(pitch));
                }
                Vector2::new((width / pitch).round() as u32, (depth / pitch).round() as u32)
            }
            (None, Some([x, y])) => Vector2::new(x, y),
            (None, None) => return Err(ProfileError::MissingGrid),
        };

        if resolution.x == 0 {
            return Err(ProfileError::EmptyGrid { axis: 'x' });
        }
        if resolution.y == 0 {
            return Err(ProfileError::EmptyGrid { axis: 'y' });
        }

        Ok(Self {
            platform_size: Vector3::new(width, depth, height),
            platform_resolution: resolution,
            fingerprint: fingerprint(profile),
        })
    }

    /// Pixels per mm along X and Y.
    pub fn scale(&self) -> Vector2<f64> {
        Vector2::new(
            self.platform_resolution.x as f64 / self.platform_size.x,
            self.platform_resolution.y as f64 / self.platform_size.y,
        )
    }

    /// Center of the build plate in mm.
    pub fn center(&self) -> Vector2<f64> {
        self.platform_size.xy() / 2.0
    }
}

fn fingerprint(profile: &PrinterProfile) -> String {
    // Struct fields serialize in declaration order, so this is stable.
    let canonical = serde_json::to_string(profile).unwrap_or_default();
    let mut hex = format!("{:x}", md5::compute(canonical));
    hex.truncate(8);
    hex
}
