use std::path::PathBuf;

use thiserror::Error;

use crate::port::SerializeError;
use crate::session::MovieMode;

#[derive(Error, Debug)]
pub enum MovieError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not open movie file for playback: {path}: {source}")]
    StreamOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open movie file for recording: {path}: {source}")]
    RecordStartFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("movie file is not a valid BSV1 file (magic {magic:#010x})")]
    InvalidContainerFormat { magic: u32 },

    #[error("end of movie stream")]
    EndOfStream,

    #[error("short read of {what}: expected {expected} bytes, got {actual}")]
    ShortRead {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("short write of {what}: expected {expected} bytes")]
    ShortWrite { what: &'static str, expected: usize },

    #[error("state snapshot failed: {0}")]
    Snapshot(#[from] SerializeError),

    #[error("ring capacity must be a power of two >= 2 (got {0})")]
    InvalidRingCapacity(usize),

    #[error("a movie session is already active")]
    SessionActive,

    #[error("operation requires a {expected:?} session")]
    WrongMode { expected: MovieMode },

    #[error("frame already started")]
    FrameAlreadyStarted,

    #[error("frame not started")]
    FrameNotStarted,
}

impl MovieError {
    /// `true` for the expected terminal condition of a playback stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// `false` for misuse that is rejected before touching the stream, so
    /// the session it was raised on is still consistent.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EndOfStream
                | Self::SessionActive
                | Self::WrongMode { .. }
                | Self::FrameAlreadyStarted
                | Self::FrameNotStarted
        )
    }
}

/// Non-fatal conditions raised while opening a movie for playback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MovieWarning {
    #[error("CRC32 checksum mismatch between content file and saved content checksum in movie file header: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },

    #[error("movie snapshot is {declared} bytes but the core expects {expected}; snapshot not applied")]
    SnapshotVersionMismatch { declared: usize, expected: usize },

    #[error("core rejected the movie snapshot: {0}")]
    SnapshotRejected(SerializeError),
}

pub type Result<T, E = MovieError> = std::result::Result<T, E>;
