//! BSV input movies: record the per-frame input of an emulated machine, play
//! it back sample-exact and step backwards through it one frame at a time.
//!
//! [`MovieSession`] drives one open container. [`MovieController`] owns at
//! most one session on behalf of a frontend and handles starting, stopping
//! and end of playback. The frontend plugs in through the traits in
//! [`port`].

pub mod codec;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod port;
pub mod ring;
pub mod session;
pub mod settings;

pub use codec::{BSV_MAGIC, HeaderConvention, MovieHeader, SampleReader};
pub use error::{MovieError as Error, MovieWarning, Result};
pub use lifecycle::{LifecycleFlags, LifecycleState, MovieController, MovieEvent};
pub use message::MovieMessage;
pub use port::{
    ContentIdentity, FsOpener, MovieHost, MovieStream, Notification, NotificationSink,
    SerializeError, SettingsStore, SnapshotPort, StreamOpener,
};
pub use ring::{DEFAULT_RING_CAPACITY, FrameOffsetRing};
pub use session::{MovieMode, MovieSession, RewindFlags, SessionOptions};
pub use settings::{MovieSettings, slot_movie_path};

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::DEBUG)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
