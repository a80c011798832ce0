use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the viewer outside of frame decoding.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no .pcd frames found in {source_desc}")]
    EmptyCatalog { source_desc: String },

    #[error("frame index {index} is out of range for {len} frames")]
    InvalidFrameIndex { index: usize, len: usize },

    #[error("the viewer is not mounted")]
    NotMounted,

    #[error("invalid manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },
}

/// Why a single frame could not be decoded.
///
/// Every variant is local to one load request. The session reports it and
/// keeps showing the last good frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unable to open {}: {message}", .path.display())]
    Open { path: PathBuf, message: String },

    #[error("unable to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("{} has no x/y/z fields", .path.display())]
    MissingCoordinates { path: PathBuf },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Open { path, .. } | Self::Decode { path, .. } | Self::MissingCoordinates { path } => {
                path
            }
        }
    }
}
