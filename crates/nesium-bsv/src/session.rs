//! One open movie: a stream, its frame offset ring and a record/playback mode.
//!
//! A frontend drives a session once per emulated frame:
//!
//! ```text
//! [rewind?] -> mark_frame_start -> read_sample/write_sample * n -> advance_frame
//! ```
//!
//! Rewinding is only legal between frames. It moves the stream cursor back so
//! the next frame re-reads (playback) or overwrites (recording) the samples of
//! an earlier frame.

use std::io::{Read, SeekFrom};

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::codec::{self, HEADER_LEN, HeaderConvention, MovieHeader};
use crate::error::{MovieError, MovieWarning, Result};
use crate::port::{MovieStream, SerializeError, SnapshotPort};
use crate::ring::{DEFAULT_RING_CAPACITY, FrameOffsetRing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieMode {
    Recording,
    Playback,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct RewindFlags: u8 {
        /// A rewind happened since the last `advance_frame`.
        const DID_REWIND = 1 << 0;
        /// The next rewind is the first of a streak and only undoes one frame.
        const FIRST_REWIND = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Number of frame start offsets kept for rewinding. Power of two.
    pub ring_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
        }
    }
}

pub struct MovieSession<S> {
    stream: S,
    ring: FrameOffsetRing,
    header: MovieHeader,
    convention: HeaderConvention,
    /// Baseline snapshot as read from or written to the container.
    snapshot: Vec<u8>,
    min_file_position: u64,
    mode: MovieMode,
    flags: RewindFlags,
    frame_open: bool,
    warnings: Vec<MovieWarning>,
}

impl<S: MovieStream> MovieSession<S> {
    /// Starts a recording at the beginning of `stream`.
    ///
    /// Writes the header and, if the core supports serialization, a baseline
    /// snapshot of its current state.
    pub fn record<P>(
        mut stream: S,
        core: &mut P,
        content_crc: u32,
        options: SessionOptions,
    ) -> Result<Self>
    where
        P: SnapshotPort + ?Sized,
    {
        let state_len = core.serialize_size();
        let state_size = u32::try_from(state_len).map_err(|_| {
            SerializeError::Message(format!("snapshot of {state_len} bytes does not fit a BSV header"))
        })?;
        let header = MovieHeader::new(content_crc, state_size);
        let ring = FrameOffsetRing::new(options.ring_capacity, header.min_file_position())?;

        stream.seek(SeekFrom::Start(0))?;
        header.write_to(&mut stream, HeaderConvention::Canonical)?;

        let mut snapshot = vec![0u8; state_len];
        if state_len > 0 {
            core.serialize(&mut snapshot)?;
            stream
                .write_all(&snapshot)
                .map_err(|err| codec::write_error(err, "snapshot", state_len))?;
        }

        debug!(content_crc, state_size, "movie recording initialized");

        Ok(Self {
            stream,
            ring,
            header,
            convention: HeaderConvention::Canonical,
            snapshot,
            min_file_position: header.min_file_position(),
            mode: MovieMode::Recording,
            flags: RewindFlags::empty(),
            frame_open: false,
            warnings: Vec::new(),
        })
    }

    /// Opens `stream` for playback.
    ///
    /// A checksum mismatch or an incompatible snapshot is recorded in
    /// [`warnings`](Self::warnings) and playback proceeds anyway.
    pub fn playback<P>(
        mut stream: S,
        core: &mut P,
        content_crc: u32,
        options: SessionOptions,
    ) -> Result<Self>
    where
        P: SnapshotPort + ?Sized,
    {
        stream.seek(SeekFrom::Start(0))?;
        let (header, convention) = codec::read_header(&mut stream)?;
        let ring = FrameOffsetRing::new(options.ring_capacity, header.min_file_position())?;
        let mut warnings = Vec::new();

        if header.content_crc != content_crc {
            let warning = MovieWarning::ChecksumMismatch {
                expected: content_crc,
                found: header.content_crc,
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        let mut snapshot = Vec::new();
        if header.state_size > 0 {
            let declared = header.state_len();
            let actual = (&mut stream)
                .take(u64::from(header.state_size))
                .read_to_end(&mut snapshot)?;
            if actual != declared {
                return Err(MovieError::ShortRead {
                    what: "snapshot",
                    expected: declared,
                    actual,
                });
            }

            let expected = core.serialize_size();
            if expected == declared {
                if let Err(err) = core.unserialize(&snapshot) {
                    let warning = MovieWarning::SnapshotRejected(err);
                    warn!("{warning}");
                    warnings.push(warning);
                }
            } else {
                let warning = MovieWarning::SnapshotVersionMismatch { declared, expected };
                warn!("{warning}");
                warnings.push(warning);
            }
        }

        debug!(
            ?convention,
            state_size = header.state_size,
            "movie playback initialized"
        );

        Ok(Self {
            stream,
            ring,
            header,
            convention,
            snapshot,
            min_file_position: header.min_file_position(),
            mode: MovieMode::Playback,
            flags: RewindFlags::empty(),
            frame_open: false,
            warnings,
        })
    }

    #[inline]
    pub fn mode(&self) -> MovieMode {
        self.mode
    }

    #[inline]
    pub fn is_playback(&self) -> bool {
        self.mode == MovieMode::Playback
    }

    #[inline]
    pub fn header(&self) -> &MovieHeader {
        &self.header
    }

    #[inline]
    pub fn convention(&self) -> HeaderConvention {
        self.convention
    }

    /// First byte after header and snapshot. No seek ever goes below it.
    #[inline]
    pub fn min_file_position(&self) -> u64 {
        self.min_file_position
    }

    #[inline]
    pub fn ring(&self) -> &FrameOffsetRing {
        &self.ring
    }

    #[inline]
    pub fn rewind_flags(&self) -> RewindFlags {
        self.flags
    }

    #[inline]
    pub fn snapshot(&self) -> &[u8] {
        &self.snapshot
    }

    #[inline]
    pub fn warnings(&self) -> &[MovieWarning] {
        &self.warnings
    }

    #[inline]
    pub fn is_frame_open(&self) -> bool {
        self.frame_open
    }

    /// Current stream cursor.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Records where the frame about to run begins.
    pub fn mark_frame_start(&mut self) -> Result<()> {
        if self.frame_open {
            return Err(MovieError::FrameAlreadyStarted);
        }
        let position = self.stream.stream_position()?;
        self.ring.mark(position);
        self.frame_open = true;
        Ok(())
    }

    /// Closes the frame opened by [`mark_frame_start`](Self::mark_frame_start).
    pub fn advance_frame(&mut self) -> Result<()> {
        if !self.frame_open {
            return Err(MovieError::FrameNotStarted);
        }
        self.ring.advance();
        let did_rewind = self.flags.contains(RewindFlags::DID_REWIND);
        self.flags.set(RewindFlags::FIRST_REWIND, !did_rewind);
        self.flags.remove(RewindFlags::DID_REWIND);
        self.frame_open = false;
        Ok(())
    }

    pub fn read_sample(&mut self) -> Result<i16> {
        self.require_mode(MovieMode::Playback)?;
        codec::read_sample(&mut self.stream)
    }

    pub fn write_sample(&mut self, value: i16) -> Result<()> {
        self.require_mode(MovieMode::Recording)?;
        codec::write_sample(&mut self.stream, value)
    }

    /// Steps the stream cursor back by one frame.
    ///
    /// The first rewind of a streak only undoes the frame that just ran. Each
    /// further rewind undoes two: the frame replayed by the previous rewind
    /// step and the one before it.
    pub fn rewind<P>(&mut self, core: &mut P) -> Result<()>
    where
        P: SnapshotPort + ?Sized,
    {
        if self.frame_open {
            return Err(MovieError::FrameAlreadyStarted);
        }
        self.flags.insert(RewindFlags::DID_REWIND);

        // Depth only differs from the write pointer once the ring has wrapped;
        // slot 0 then belongs to a later lap and says nothing about the origin.
        let near_origin = self.ring.write_pointer() <= 1 && self.ring.depth() <= 1;
        let target = if near_origin && self.ring.slot(0) == self.min_file_position {
            self.ring.snap_to_origin();
            self.min_file_position
        } else {
            let back = if self.flags.contains(RewindFlags::FIRST_REWIND) {
                1
            } else {
                2
            };
            self.ring.step_back(back);
            self.ring.current()
        };

        let position = self.stream.seek(SeekFrom::Start(target))?;
        if position <= self.min_file_position {
            match self.mode {
                MovieMode::Playback => {
                    self.stream.seek(SeekFrom::Start(self.min_file_position))?;
                }
                MovieMode::Recording => self.restart_recording(core)?,
            }
        }

        trace!(
            write_pointer = self.ring.write_pointer(),
            position, "movie rewound one frame"
        );
        Ok(())
    }

    /// Flushes buffered writes to the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.stream.flush()?)
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Rewound past the first frame while recording: the current machine
    /// state becomes the new baseline snapshot and recording continues from
    /// the first sample offset.
    fn restart_recording<P>(&mut self, core: &mut P) -> Result<()>
    where
        P: SnapshotPort + ?Sized,
    {
        self.stream.seek(SeekFrom::Start(HEADER_LEN))?;
        if !self.snapshot.is_empty() {
            core.serialize(&mut self.snapshot)?;
            self.stream
                .write_all(&self.snapshot)
                .map_err(|err| codec::write_error(err, "snapshot", self.snapshot.len()))?;
        }
        debug!("movie recording restarted from current state");
        Ok(())
    }

    fn require_mode(&self, expected: MovieMode) -> Result<()> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(MovieError::WrongMode { expected })
        }
    }
}
