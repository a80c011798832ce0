use crate::{error::LoadError, loader::RequestId};
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub id: RequestId,
    pub frame: usize,
    pub error: LoadError,
}

/// Where the session reports load progress and failures.
pub trait Diagnostics {
    fn progress(&mut self, id: RequestId, frame: usize, loaded: u64, total: u64);
    fn failure(&mut self, failure: &LoadFailure);
}

/// Sends everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn progress(&mut self, id: RequestId, frame: usize, loaded: u64, total: u64) {
        let percent = if total == 0 {
            100.0
        } else {
            loaded as f64 / total as f64 * 100.0
        };
        debug!("frame {frame} ({id}): {percent:.0}% loaded");
    }

    fn failure(&mut self, failure: &LoadFailure) {
        let LoadFailure { id, frame, error } = failure;
        error!("unable to load frame {frame} ({id}): {error}");
    }
}

/// Keeps every report in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub progress: Vec<(RequestId, u64, u64)>,
    pub failures: Vec<LoadFailure>,
}

#[cfg(test)]
impl Diagnostics for RecordingDiagnostics {
    fn progress(&mut self, id: RequestId, _frame: usize, loaded: u64, total: u64) {
        self.progress.push((id, loaded, total));
    }

    fn failure(&mut self, failure: &LoadFailure) {
        self.failures.push(failure.clone());
    }
}
