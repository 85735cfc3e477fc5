//! BSV container codec.
//!
//! # Layout
//! ```text
//! [magic: u32][content_crc: u32][state_size: u32][reserved: u32]
//! [snapshot: state_size bytes]
//! [sample: i16 BE]*
//! ```
//!
//! The four header words share one byte order, chosen by
//! [`HeaderConvention`]. New recordings are written `Canonical` (big-endian,
//! so the magic reads `BSV1` in a hex editor). Older writers produced the
//! byte-swapped form; the reader detects which one it is looking at from the
//! magic word alone and decodes the remaining words the same way.
//!
//! Samples are always big-endian, independent of the header convention.

use std::io::{self, ErrorKind, Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{MovieError, Result};

/// `BSV1` as a big-endian word.
pub const BSV_MAGIC: u32 = 0x4253_5631;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: u64 = 16;

/// Size of one encoded input sample in bytes.
pub const SAMPLE_LEN: usize = 2;

/// Byte order of the four header words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderConvention {
    /// Big-endian words.
    #[default]
    Canonical,
    /// Little-endian words, as written by the historical implementation.
    LegacySwapped,
}

impl HeaderConvention {
    /// Identifies the convention from the first four bytes of a container.
    pub fn detect(magic: [u8; 4]) -> Option<Self> {
        if BigEndian::read_u32(&magic) == BSV_MAGIC {
            Some(Self::Canonical)
        } else if LittleEndian::read_u32(&magic) == BSV_MAGIC {
            Some(Self::LegacySwapped)
        } else {
            None
        }
    }

    fn read_word(self, src: &[u8]) -> u32 {
        match self {
            Self::Canonical => BigEndian::read_u32(src),
            Self::LegacySwapped => LittleEndian::read_u32(src),
        }
    }

    fn write_word(self, dst: &mut [u8], value: u32) {
        match self {
            Self::Canonical => BigEndian::write_u32(dst, value),
            Self::LegacySwapped => LittleEndian::write_u32(dst, value),
        }
    }
}

/// The fixed 16-byte container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieHeader {
    pub magic: u32,
    pub content_crc: u32,
    /// Length of the baseline snapshot that follows the header.
    pub state_size: u32,
    /// Unused, preserved verbatim.
    pub reserved: u32,
}

impl MovieHeader {
    pub fn new(content_crc: u32, state_size: u32) -> Self {
        Self {
            magic: BSV_MAGIC,
            content_crc,
            state_size,
            reserved: 0,
        }
    }

    #[inline]
    pub fn state_len(&self) -> usize {
        self.state_size as usize
    }

    /// Offset of the first sample: nothing before it may be rewound into.
    #[inline]
    pub fn min_file_position(&self) -> u64 {
        HEADER_LEN + u64::from(self.state_size)
    }

    pub fn encode(&self, convention: HeaderConvention) -> [u8; HEADER_LEN as usize] {
        let mut out = [0u8; HEADER_LEN as usize];
        let words = [self.magic, self.content_crc, self.state_size, self.reserved];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            convention.write_word(chunk, word);
        }
        out
    }

    pub fn decode(bytes: &[u8; HEADER_LEN as usize]) -> Result<(Self, HeaderConvention)> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let Some(convention) = HeaderConvention::detect(magic) else {
            return Err(MovieError::InvalidContainerFormat {
                magic: BigEndian::read_u32(&magic),
            });
        };

        let header = Self {
            magic: convention.read_word(&bytes[0..4]),
            content_crc: convention.read_word(&bytes[4..8]),
            state_size: convention.read_word(&bytes[8..12]),
            reserved: convention.read_word(&bytes[12..16]),
        };
        Ok((header, convention))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, convention: HeaderConvention) -> Result<()> {
        writer
            .write_all(&self.encode(convention))
            .map_err(|err| write_error(err, "header", HEADER_LEN as usize))
    }
}

/// Reads and validates the header at the current position of `reader`.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(MovieHeader, HeaderConvention)> {
    let mut bytes = [0u8; HEADER_LEN as usize];
    let actual = read_full(reader, &mut bytes)?;
    if actual != bytes.len() {
        return Err(MovieError::ShortRead {
            what: "header",
            expected: bytes.len(),
            actual,
        });
    }
    MovieHeader::decode(&bytes)
}

/// Reads one sample. A stream with no bytes left yields
/// [`MovieError::EndOfStream`]; a stream with a single trailing byte is torn.
pub fn read_sample<R: Read>(reader: &mut R) -> Result<i16> {
    let mut buf = [0u8; SAMPLE_LEN];
    match read_full(reader, &mut buf)? {
        0 => Err(MovieError::EndOfStream),
        SAMPLE_LEN => Ok(BigEndian::read_i16(&buf)),
        actual => Err(MovieError::ShortRead {
            what: "sample",
            expected: SAMPLE_LEN,
            actual,
        }),
    }
}

pub fn write_sample<W: Write>(writer: &mut W, value: i16) -> Result<()> {
    writer
        .write_i16::<BigEndian>(value)
        .map_err(|err| write_error(err, "sample", SAMPLE_LEN))
}

/// Streams samples until the end of the container.
///
/// The iterator ends after the first error.
pub struct SampleReader<R> {
    inner: R,
    done: bool,
}

impl<R: Read> SampleReader<R> {
    /// `inner` must already be positioned at the first sample.
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for SampleReader<R> {
    type Item = Result<i16>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match read_sample(&mut self.inner) {
            Ok(sample) => Some(Ok(sample)),
            Err(MovieError::EndOfStream) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Like `read_exact`, but reports how many bytes were available instead of
/// failing on a short stream.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

pub(crate) fn write_error(err: io::Error, what: &'static str, expected: usize) -> MovieError {
    if err.kind() == ErrorKind::WriteZero {
        MovieError::ShortWrite { what, expected }
    } else {
        MovieError::Io(err)
    }
}
