use crate::error::ViewerError;

/// A requested frame transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCommand {
    Set(usize),
    Step(isize),
}

/// Tracks which frame of a catalog of `len` frames is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSequencer {
    index: usize,
    len: usize,
}

impl FrameSequencer {
    /// Starts at frame 0. `len` must be non-zero, which every
    /// [FrameCatalog](crate::catalog::FrameCatalog) guarantees.
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0);
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Jumps to `index`. Out of range indices are rejected and the current
    /// frame is kept.
    pub fn set_frame(&mut self, index: usize) -> Result<usize, ViewerError> {
        if index >= self.len {
            return Err(ViewerError::InvalidFrameIndex {
                index,
                len: self.len,
            });
        }
        self.index = index;
        Ok(index)
    }

    /// Moves by `delta` frames, wrapping around both ends.
    pub fn step(&mut self, delta: isize) -> usize {
        // Reduce first so huge deltas cannot overflow.
        let shift = delta.rem_euclid(self.len as isize) as usize;
        self.index = (self.index + shift) % self.len;
        self.index
    }

    /// Applies `command` and returns the resulting index.
    pub fn apply(&mut self, command: FrameCommand) -> Result<usize, ViewerError> {
        match command {
            FrameCommand::Set(index) => self.set_frame(index),
            FrameCommand::Step(delta) => Ok(self.step(delta)),
        }
    }
}
