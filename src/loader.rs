use crate::{data::PointCloudGeometry, error::LoadError};
use flume::Sender;
use nalgebra::Point3;
use std::{
    fmt,
    path::{Path, PathBuf},
    thread,
};
use tracing::debug;

/// Stamp of one `load_frame` call. Later requests get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: RequestId,
    pub frame: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadEvent {
    pub id: RequestId,
    pub frame: usize,
    pub kind: LoadEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadEventKind {
    Progress { loaded: u64, total: u64 },
    Loaded(PointCloudGeometry),
    Failed(LoadError),
}

/// Decodes frames off the render thread.
///
/// An implementation must send at most one `Loaded` or `Failed` event per
/// request, and never both. Sends into a disconnected channel are simply
/// dropped.
pub trait FrameLoader {
    fn load(&mut self, request: LoadRequest, events: Sender<LoadEvent>);
}

/// Reads `.pcd` files with `pcd-rs`, one worker thread per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcdLoader {
    colored: bool,
}

/// Number of progress events sent per file.
const PROGRESS_STEPS: u64 = 10;

impl PcdLoader {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Decodes `path` on the calling thread.
    pub fn decode(
        path: &Path,
        colored: bool,
        mut progress: impl FnMut(u64, u64),
    ) -> Result<PointCloudGeometry, LoadError> {
        let reader = pcd_rs::DynReader::open(path).map_err(|err| LoadError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let total = reader.meta().num_points;
        let stride = (total / PROGRESS_STEPS).max(1);

        let mut positions = Vec::with_capacity(total.min(1 << 24) as usize);
        for (count, record) in (1u64..).zip(reader) {
            let record = record.map_err(|err| LoadError::Decode {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            let xyz: [f32; 3] = record.to_xyz().ok_or_else(|| LoadError::MissingCoordinates {
                path: path.to_path_buf(),
            })?;
            positions.push(Point3::from(xyz));

            if count % stride == 0 || count == total {
                progress(count, total);
            }
        }

        let geometry = if colored {
            PointCloudGeometry::height_colored(positions)
        } else {
            PointCloudGeometry::uniform(positions)
        };
        Ok(geometry)
    }
}

impl FrameLoader for PcdLoader {
    fn load(&mut self, request: LoadRequest, events: Sender<LoadEvent>) {
        let colored = self.colored;
        let LoadRequest { id, frame, path } = request;

        let spawned = thread::Builder::new()
            .name(format!("pcd-loader-{}", id.0))
            .spawn({
                let events = events.clone();
                let path = path.clone();
                move || {
                    let result = Self::decode(&path, colored, |loaded, total| {
                        let _ = events.send(LoadEvent {
                            id,
                            frame,
                            kind: LoadEventKind::Progress { loaded, total },
                        });
                    });
                    let kind = match result {
                        Ok(geometry) => LoadEventKind::Loaded(geometry),
                        Err(err) => LoadEventKind::Failed(err),
                    };
                    if events.send(LoadEvent { id, frame, kind }).is_err() {
                        debug!("request {id} finished after its receiver went away");
                    }
                }
            });

        if let Err(err) = spawned {
            let _ = events.send(LoadEvent {
                id,
                frame,
                kind: LoadEventKind::Failed(LoadError::Open {
                    path,
                    message: format!("unable to spawn loader thread: {err}"),
                }),
            });
        }
    }
}
