use std::{io, path::PathBuf};

use common::config::ProfileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SliceError {
    /// The mesh could not be parsed or has no faces left after repair.
    #[error("unreadable geometry{}: {reason}", origin(.path))]
    UnreadableGeometry {
        path: Option<PathBuf>,
        reason: String,
    },
    #[error("invalid printer profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("invalid slice configuration: {0}")]
    InvalidConfig(String),
    /// The plane misses the mesh or the cross-section has no area.
    #[error("no cross-section at z = {z:.4} mm")]
    EmptySlice { z: f64 },
    /// Contour chains that could not be closed were dropped from a layer.
    #[error("discarded {open_chains} unclosed contour(s) at z = {z:.4} mm")]
    DegenerateTopology { z: f64, open_chains: usize },
    #[error("i/o error on `{}`: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to write `{}`: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl SliceError {
    /// Fatal errors abort a run, the others only affect a single layer.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SliceError::EmptySlice { .. } | SliceError::DegenerateTopology { .. }
        )
    }

    pub(crate) fn unreadable(path: Option<PathBuf>, reason: impl Into<String>) -> Self {
        SliceError::UnreadableGeometry {
            path,
            reason: reason.into(),
        }
    }
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in `{}`", path.display()),
        None => String::new(),
    }
}
