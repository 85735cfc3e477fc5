//! Owns the (at most one) live movie session and decides when it starts and
//! stops.
//!
//! The frontend keeps a [`MovieController`] next to its frame loop and calls,
//! per frame:
//!
//! ```text
//! session_check -> [rewind] -> frame_start -> filter_input * n -> frame_end
//! ```
//!
//! Start requests may arrive before any content is loaded. They are kept in
//! [`LifecycleState`] and honoured by [`MovieController::on_content_loaded`]
//! or the next [`MovieController::session_check`].

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use tracing::{debug, error, info, warn};

use crate::error::{MovieError, Result};
use crate::message::MovieMessage;
use crate::port::{FsOpener, MovieHost, NotificationSink, StreamOpener};
use crate::session::{MovieSession, SessionOptions};
use crate::settings::slot_movie_path;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct LifecycleFlags: u8 {
        /// Record to `start_path` once content is running.
        const START_RECORDING = 1 << 0;
        /// Play back `start_path` once content is running.
        const START_PLAYBACK = 1 << 1;
        /// Playback ran out of samples.
        const MOVIE_END = 1 << 2;
        /// Quit the frontend once playback ends.
        const EOF_EXIT = 1 << 3;
        /// Start recording to the slot path, or stop the current recording.
        const RECORD_TOGGLE = 1 << 4;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleState {
    pub flags: LifecycleFlags,
    /// Base path for slot-suffixed recordings started by the record toggle.
    pub movie_path: PathBuf,
    /// Path used by deferred start requests.
    pub start_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieEvent {
    RecordingStarted { path: PathBuf },
    PlaybackStarted { path: PathBuf },
    RecordingStopped,
    PlaybackEnded { exit_requested: bool },
}

/// Record messages of a user-triggered start.
const PRIORITY_EXPLICIT: u32 = 2;
/// Record messages of a start deferred until content load.
const PRIORITY_DEFERRED: u32 = 1;

pub struct MovieController<O: StreamOpener = FsOpener> {
    opener: O,
    options: SessionOptions,
    state: LifecycleState,
    session: Option<MovieSession<O::Stream>>,
}

impl MovieController<FsOpener> {
    pub fn new() -> Self {
        Self::with_opener(FsOpener, SessionOptions::default())
    }
}

impl Default for MovieController<FsOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: StreamOpener> MovieController<O> {
    pub fn with_opener(opener: O, options: SessionOptions) -> Self {
        Self {
            opener,
            options,
            state: LifecycleState::default(),
            session: None,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn session(&self) -> Option<&MovieSession<O::Stream>> {
        self.session.as_ref()
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.state.movie_path = path.into();
    }

    pub fn set_start_path(&mut self, path: impl Into<PathBuf>) {
        self.state.start_path = path.into();
    }

    pub fn request_start_recording(&mut self, requested: bool) {
        self.state
            .flags
            .set(LifecycleFlags::START_RECORDING, requested);
    }

    pub fn request_start_playback(&mut self, requested: bool) {
        self.state.flags.set(LifecycleFlags::START_PLAYBACK, requested);
    }

    pub fn set_eof_exit(&mut self, exit: bool) {
        self.state.flags.set(LifecycleFlags::EOF_EXIT, exit);
    }

    /// Asks the next [`session_check`](Self::session_check) to start a
    /// recording when idle, or to stop the current one.
    pub fn toggle_recording(&mut self) {
        self.state.flags.insert(LifecycleFlags::RECORD_TOGGLE);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// A session is live and playing back.
    #[inline]
    pub fn is_playback_on(&self) -> bool {
        self.session.as_ref().is_some_and(MovieSession::is_playback)
    }

    /// A session is live and recording.
    #[inline]
    pub fn is_playback_off(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_playback())
    }

    /// Playback has ended and the frontend was asked to quit when it did.
    pub fn end_of_file_exit(&self) -> bool {
        self.state
            .flags
            .contains(LifecycleFlags::MOVIE_END | LifecycleFlags::EOF_EXIT)
    }

    pub fn start_recording<H>(&mut self, path: &Path, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        self.begin_recording(path, host, PRIORITY_EXPLICIT)
    }

    fn begin_recording<H>(&mut self, path: &Path, host: &mut H, priority: u32) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        if self.session.is_some() {
            return Err(MovieError::SessionActive);
        }

        let stream = match self.opener.open_write(path) {
            Ok(stream) => stream,
            Err(source) => {
                error!(path = %path.display(), %source, "could not open movie file for recording");
                notify_at(host, MovieMessage::FailedToStartRecord, priority);
                return Err(MovieError::RecordStartFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let content_crc = host.content_crc();
        let session = match MovieSession::record(stream, &mut *host, content_crc, self.options) {
            Ok(session) => session,
            Err(err) => {
                error!(path = %path.display(), %err, "failed to start movie record");
                notify_at(host, MovieMessage::FailedToStartRecord, priority);
                return Err(err);
            }
        };

        self.session = Some(session);
        info!(path = %path.display(), "starting movie record");
        notify_at(host, MovieMessage::StartingRecordTo(path.to_path_buf()), priority);
        host.set_rewind_granularity(1);
        Ok(())
    }

    pub fn start_playback<H>(&mut self, path: &Path, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        if self.session.is_some() {
            return Err(MovieError::SessionActive);
        }

        let stream = match self.opener.open_read(path) {
            Ok(stream) => stream,
            Err(source) => {
                error!(path = %path.display(), %source, "could not open movie file for playback");
                notify(host, MovieMessage::FailedToLoadMovie(path.to_path_buf()));
                return Err(MovieError::StreamOpenFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let content_crc = host.content_crc();
        let session = match MovieSession::playback(stream, &mut *host, content_crc, self.options) {
            Ok(session) => session,
            Err(err) => {
                error!(path = %path.display(), %err, "failed to load movie file");
                notify(host, MovieMessage::FailedToLoadMovie(path.to_path_buf()));
                return Err(err);
            }
        };

        self.session = Some(session);
        self.state.flags.remove(LifecycleFlags::MOVIE_END);
        info!(path = %path.display(), "starting movie playback");
        notify(host, MovieMessage::StartingPlayback);
        // Coarser rewind granularity would skip over movie frames.
        host.set_rewind_granularity(1);
        Ok(())
    }

    /// Honours deferred start requests. Playback wins when both are pending.
    ///
    /// The request is consumed whether or not the start succeeds. A record
    /// toggle pending at the same time is dropped.
    pub fn on_content_loaded<H>(&mut self, host: &mut H) -> Result<Option<MovieEvent>>
    where
        H: MovieHost + ?Sized,
    {
        let deferred = LifecycleFlags::START_PLAYBACK | LifecycleFlags::START_RECORDING;
        if self.session.is_some() || !self.state.flags.intersects(deferred) {
            return Ok(None);
        }
        self.state.flags.remove(LifecycleFlags::RECORD_TOGGLE);
        let path = self.state.start_path.clone();

        if self.state.flags.contains(LifecycleFlags::START_PLAYBACK) {
            self.state.flags.remove(LifecycleFlags::START_PLAYBACK);
            self.start_playback(&path, host)?;
            return Ok(Some(MovieEvent::PlaybackStarted { path }));
        }
        if self.state.flags.contains(LifecycleFlags::START_RECORDING) {
            self.state.flags.remove(LifecycleFlags::START_RECORDING);
            self.begin_recording(&path, host, PRIORITY_DEFERRED)?;
            return Ok(Some(MovieEvent::RecordingStarted { path }));
        }
        Ok(None)
    }

    /// Once-per-frame lifecycle step, run before the frame starts.
    pub fn session_check<H>(&mut self, host: &mut H) -> Result<Option<MovieEvent>>
    where
        H: MovieHost + ?Sized,
    {
        match self.session.as_ref().map(MovieSession::is_playback) {
            Some(true) => {
                // The toggle has no effect on a playback.
                self.state.flags.remove(LifecycleFlags::RECORD_TOGGLE);
                if !self.state.flags.contains(LifecycleFlags::MOVIE_END) {
                    return Ok(None);
                }
                let exit_requested = self.end_of_file_exit();
                info!("movie playback ended");
                notify(host, MovieMessage::PlaybackEnded);
                self.deinit();
                self.state.flags.remove(LifecycleFlags::MOVIE_END);
                Ok(Some(MovieEvent::PlaybackEnded { exit_requested }))
            }
            Some(false) => {
                if !self.state.flags.contains(LifecycleFlags::RECORD_TOGGLE) {
                    return Ok(None);
                }
                self.state.flags.remove(LifecycleFlags::RECORD_TOGGLE);
                info!("movie record stopped");
                notify(host, MovieMessage::RecordStopped);
                self.deinit();
                Ok(Some(MovieEvent::RecordingStopped))
            }
            None => {
                if self
                    .state
                    .flags
                    .intersects(LifecycleFlags::START_PLAYBACK | LifecycleFlags::START_RECORDING)
                {
                    return self.on_content_loaded(host);
                }
                if !self.state.flags.contains(LifecycleFlags::RECORD_TOGGLE) {
                    return Ok(None);
                }
                self.state.flags.remove(LifecycleFlags::RECORD_TOGGLE);
                let path = slot_movie_path(&self.state.movie_path, host.state_slot());
                self.start_recording(&path, host)?;
                Ok(Some(MovieEvent::RecordingStarted { path }))
            }
        }
    }

    /// Closes the session, if any. Safe to call repeatedly.
    pub fn deinit(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.flush() {
                warn!(%err, "failed to flush movie stream");
            }
            debug!("movie deinitialized");
        }
    }

    pub fn frame_start<H>(&mut self, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let result = session.mark_frame_start();
        self.settle(result, host)
    }

    pub fn frame_end<H>(&mut self, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let result = session.advance_frame();
        self.settle(result, host)
    }

    pub fn rewind<H>(&mut self, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let result = session.rewind(&mut *host);
        self.settle(result, host)
    }

    /// Next recorded sample, or `None` when not playing back.
    ///
    /// Running out of samples flags the end of the movie; the session is
    /// closed by the following [`session_check`](Self::session_check).
    pub fn read_sample<H>(&mut self, host: &mut H) -> Result<Option<i16>>
    where
        H: MovieHost + ?Sized,
    {
        let Some(session) = self.session.as_mut().filter(|s| s.is_playback()) else {
            return Ok(None);
        };
        match session.read_sample() {
            Ok(sample) => Ok(Some(sample)),
            Err(MovieError::EndOfStream) => {
                if !self.state.flags.contains(LifecycleFlags::MOVIE_END) {
                    debug!("movie reached end of stream");
                }
                self.state.flags.insert(LifecycleFlags::MOVIE_END);
                Ok(None)
            }
            Err(err) => self.settle(Err(err), host),
        }
    }

    /// Appends `value` to the recording. No-op when not recording.
    pub fn write_sample<H>(&mut self, value: i16, host: &mut H) -> Result<()>
    where
        H: MovieHost + ?Sized,
    {
        let Some(session) = self.session.as_mut().filter(|s| !s.is_playback()) else {
            return Ok(());
        };
        let result = session.write_sample(value);
        self.settle(result, host)
    }

    /// Routes one live input sample through the movie.
    ///
    /// Playback substitutes the recorded sample (or `live` once the movie has
    /// ended); recording stores `live`. Failures have already been logged and
    /// reported by the time this returns.
    pub fn filter_input<H>(&mut self, live: i16, host: &mut H) -> i16
    where
        H: MovieHost + ?Sized,
    {
        if self.is_playback_on() {
            return match self.read_sample(host) {
                Ok(Some(sample)) => sample,
                _ => live,
            };
        }
        if self.is_playback_off() && self.write_sample(live, host).is_err() {
            debug!("recording aborted, live input passed through");
        }
        live
    }

    /// Fatal errors close the session and are reported before being handed
    /// back to the caller.
    fn settle<T, H>(&mut self, result: Result<T>, host: &mut H) -> Result<T>
    where
        H: NotificationSink + ?Sized,
    {
        match result {
            Err(err) if err.is_fatal() => {
                error!(%err, "movie session aborted");
                notify(host, MovieMessage::Aborted(err.to_string()));
                self.deinit();
                Err(err)
            }
            other => other,
        }
    }
}

fn notify<H: NotificationSink + ?Sized>(host: &mut H, message: MovieMessage) {
    host.notify(message.notification());
}

fn notify_at<H: NotificationSink + ?Sized>(host: &mut H, message: MovieMessage, priority: u32) {
    host.notify(message.notification_at(priority));
}
