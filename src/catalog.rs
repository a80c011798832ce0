use crate::error::ViewerError;
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The ordered, non-empty list of scan files that make up a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCatalog {
    frames: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Manifest {
    List(Vec<PathBuf>),
    Rooted {
        root: Option<PathBuf>,
        frames: Vec<PathBuf>,
    },
}

impl FrameCatalog {
    pub fn from_paths<I>(paths: I) -> Result<Self, ViewerError>
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        let frames: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if frames.is_empty() {
            return Err(ViewerError::EmptyCatalog {
                source_desc: "the given path list".to_string(),
            });
        }
        Ok(Self { frames })
    }

    /// Collects every `.pcd` file in `dir`, sorted by path.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut frames: Vec<_> = dir
            .read_dir()
            .with_context(|| format!("unable to read directory {}", dir.display()))?
            .map(|entry| -> Result<_> {
                let entry = entry?;
                let file_type = entry.file_type()?;

                if !(file_type.is_file() || file_type.is_symlink()) {
                    return Ok(None);
                }

                let path = entry.path();

                let Some(ext) = path.extension() else {
                    return Ok(None);
                };
                if ext != "pcd" {
                    return Ok(None);
                }

                Ok(Some(path))
            })
            .filter_map(|path| path.transpose())
            .try_collect()?;
        frames.sort_unstable();

        if frames.is_empty() {
            return Err(ViewerError::EmptyCatalog {
                source_desc: dir.display().to_string(),
            }
            .into());
        }
        Ok(Self { frames })
    }

    /// Reads a JSON manifest.
    ///
    /// The manifest is either an array of paths or an object with an
    /// optional `root` and a `frames` array. Relative entries are resolved
    /// against `asset_root` when given, then against the manifest's
    /// `root`, then against the directory holding the manifest.
    pub fn from_manifest(path: impl AsRef<Path>, asset_root: Option<&Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read manifest {}", path.display()))?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|err| ViewerError::Manifest {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let manifest_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let (root, frames) = match manifest {
            Manifest::List(frames) => (None, frames),
            Manifest::Rooted { root, frames } => (root, frames),
        };
        let root = match (asset_root, root) {
            (Some(asset_root), _) => asset_root.to_path_buf(),
            (None, Some(root)) => manifest_dir.join(root),
            (None, None) => manifest_dir.to_path_buf(),
        };

        let frames: Vec<_> = frames.into_iter().map(|frame| root.join(frame)).collect();
        if frames.is_empty() {
            return Err(ViewerError::EmptyCatalog {
                source_desc: path.display().to_string(),
            }
            .into());
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.frames.get(index).map(PathBuf::as_path)
    }

    /// The file stem of a frame, used in the status line.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.get(index)?.file_stem()?.to_str()
    }
}
