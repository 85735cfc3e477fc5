//! Seams between the movie subsystem and the frontend that hosts it.
//!
//! The movie core never talks to the emulated machine, the settings store or
//! the on-screen message queue directly. Everything it needs is expressed as
//! a small trait here, so a frontend can wire its own pieces in and tests can
//! substitute fakes.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use thiserror::Error;

/// Byte stream a movie session reads from and writes to.
pub trait MovieStream: Read + Write + Seek {}

impl<T: Read + Write + Seek> MovieStream for T {}

/// Opens movie streams by path.
pub trait StreamOpener {
    type Stream: MovieStream;

    /// Opens an existing movie for playback.
    fn open_read(&mut self, path: &Path) -> io::Result<Self::Stream>;

    /// Creates (or truncates) a movie for recording.
    ///
    /// Recording seeks backwards while rewinding and rewrites the snapshot in
    /// place, so the returned stream must be seekable and writable.
    fn open_write(&mut self, path: &Path) -> io::Result<Self::Stream>;
}

/// [`StreamOpener`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl StreamOpener for FsOpener {
    type Stream = File;

    fn open_read(&mut self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn open_write(&mut self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }
}

/// Full machine state serialization, as exposed by the emulated core.
pub trait SnapshotPort {
    /// Reports the amount of memory (in bytes) needed to serialize state.
    ///
    /// Returning zero indicates that serialization is not supported; movies
    /// recorded against such a core carry no baseline snapshot.
    fn serialize_size(&self) -> usize;

    /// Serializes the core state into the provided buffer.
    ///
    /// Returns the number of bytes written.
    fn serialize(&mut self, dst: &mut [u8]) -> Result<usize, SerializeError>;

    /// Restores previously serialized state.
    fn unserialize(&mut self, src: &[u8]) -> Result<(), SerializeError>;
}

/// Error returned by serialization routines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// Provided buffer was too small to store the serialized state.
    #[error("buffer too small (requires {required} bytes)")]
    BufferTooSmall { required: usize },
    /// The core does not support serialization.
    #[error("serialization is not supported")]
    Unsupported,
    /// A catch-all error for situations the other variants do not cover.
    #[error("{0}")]
    Message(String),
}

/// Identity of the content currently loaded into the core.
pub trait ContentIdentity {
    /// CRC32 of the loaded content.
    fn content_crc(&self) -> u32;
}

/// A user-visible message for the frontend's on-screen queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    /// Higher priorities replace lower ones already on screen.
    pub priority: u32,
    /// How long the message stays visible, in frames.
    pub duration_frames: u32,
    /// Drop any queued messages before showing this one.
    pub flush: bool,
}

/// Fire-and-forget sink for [`Notification`]s.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// The handful of frontend settings the movie subsystem reads or writes.
pub trait SettingsStore {
    /// Save-state slot; positive slots suffix the movie path.
    fn state_slot(&self) -> i32;

    /// Frames between rewind snapshots. Movies force this to 1.
    fn set_rewind_granularity(&mut self, granularity: u32);
}

/// Everything the lifecycle controller needs from the frontend.
pub trait MovieHost: SnapshotPort + ContentIdentity + NotificationSink + SettingsStore {}

impl<T: SnapshotPort + ContentIdentity + NotificationSink + SettingsStore> MovieHost for T {}
