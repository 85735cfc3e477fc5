use std::fmt;
use std::path::PathBuf;

use crate::port::Notification;

const MESSAGE_FRAMES: u32 = 180;
const MESSAGE_PRIORITY: u32 = 2;

/// Messages the lifecycle controller pushes to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieMessage {
    StartingPlayback,
    PlaybackEnded,
    StartingRecordTo(PathBuf),
    RecordStopped,
    FailedToStartRecord,
    FailedToLoadMovie(PathBuf),
    /// An established session hit a fatal error and was closed.
    Aborted(String),
}

impl MovieMessage {
    pub fn notification(&self) -> Notification {
        self.notification_at(MESSAGE_PRIORITY)
    }

    pub fn notification_at(&self, priority: u32) -> Notification {
        let flush = !matches!(self, Self::StartingPlayback | Self::PlaybackEnded);
        Notification {
            message: self.to_string(),
            priority,
            duration_frames: MESSAGE_FRAMES,
            flush,
        }
    }
}

impl fmt::Display for MovieMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartingPlayback => write!(f, "Starting movie playback."),
            Self::PlaybackEnded => write!(f, "Movie playback ended."),
            Self::StartingRecordTo(path) => {
                write!(f, "Starting movie record to \"{}\".", path.display())
            }
            Self::RecordStopped => write!(f, "Movie record stopped."),
            Self::FailedToStartRecord => write!(f, "Failed to start movie record."),
            Self::FailedToLoadMovie(path) => {
                write!(f, "Failed to load movie file: \"{}\".", path.display())
            }
            Self::Aborted(reason) => write!(f, "Movie stopped: {reason}."),
        }
    }
}
