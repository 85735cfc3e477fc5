//! Frame start offsets for frame-by-frame rewind.
//!
//! Each slot holds the byte offset in the movie stream at which one frame's
//! samples begin. Slots are indexed by frame number modulo the capacity, so
//! once more than `capacity` frames have been recorded the oldest offsets are
//! silently overwritten.
//!
//! # Invariants
//! - `offsets[write_pointer]` is the start offset of the frame currently in
//!   flight. Slot 0 is seeded with the first sample offset at construction, so
//!   this holds before the first frame has been marked.
//! - `depth` counts the frames reachable behind `write_pointer` and never
//!   exceeds the capacity. Within the first lap it equals `write_pointer`.

use crate::error::{MovieError, Result};

/// Default capacity: about five hours of history at 60 frames per second.
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

pub struct FrameOffsetRing {
    offsets: Box<[u64]>,
    mask: usize,
    write_pointer: usize,
    depth: usize,
}

impl FrameOffsetRing {
    /// Creates a ring whose slot 0 points at `origin`.
    ///
    /// `capacity` must be a power of two and at least 2.
    pub fn new(capacity: usize, origin: u64) -> Result<Self> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(MovieError::InvalidRingCapacity(capacity));
        }
        let mut offsets = vec![0u64; capacity].into_boxed_slice();
        offsets[0] = origin;
        Ok(Self {
            offsets,
            mask: capacity - 1,
            write_pointer: 0,
            depth: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn write_pointer(&self) -> usize {
        self.write_pointer
    }

    /// Frames that can currently be stepped back over.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn slot(&self, index: usize) -> u64 {
        self.offsets[index & self.mask]
    }

    /// Start offset of the frame in flight.
    #[inline]
    pub fn current(&self) -> u64 {
        self.offsets[self.write_pointer]
    }

    pub fn mark(&mut self, position: u64) {
        self.offsets[self.write_pointer] = position;
    }

    pub fn advance(&mut self) {
        self.write_pointer = (self.write_pointer + 1) & self.mask;
        self.depth = (self.depth + 1).min(self.capacity());
    }

    /// Steps the write pointer back by up to `frames`, limited by `depth`.
    ///
    /// Returns the number of frames actually stepped.
    pub fn step_back(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.depth);
        self.write_pointer = self.write_pointer.wrapping_sub(frames) & self.mask;
        self.depth -= frames;
        frames
    }

    /// Moves the write pointer to slot 0 and forgets all history behind it.
    pub fn snap_to_origin(&mut self) {
        self.write_pointer = 0;
        self.depth = 0;
    }
}
