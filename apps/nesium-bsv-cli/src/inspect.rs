use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::{Context, Result, bail};
use nesium_bsv::codec::{self, HEADER_LEN, SAMPLE_LEN};
use nesium_bsv::{HeaderConvention, MovieHeader, SampleReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieSummary {
    pub header: MovieHeader,
    pub convention: HeaderConvention,
    pub samples: u64,
    /// A torn final sample.
    pub trailing_byte: bool,
}

pub fn summarize<R: Read + Seek>(reader: &mut R) -> Result<MovieSummary> {
    reader.seek(SeekFrom::Start(0))?;
    let (header, convention) = codec::read_header(reader).context("reading movie header")?;
    let len = reader.seek(SeekFrom::End(0))?;
    let Some(stream_len) = len.checked_sub(header.min_file_position()) else {
        bail!(
            "snapshot truncated: header declares {} bytes, file holds {}",
            header.state_size,
            len.saturating_sub(HEADER_LEN)
        );
    };

    Ok(MovieSummary {
        header,
        convention,
        samples: stream_len / SAMPLE_LEN as u64,
        trailing_byte: stream_len % SAMPLE_LEN as u64 != 0,
    })
}

/// Writes up to `limit` samples, `per_frame` to a line.
pub fn dump<R: Read + Seek, W: Write>(
    reader: &mut R,
    out: &mut W,
    limit: Option<usize>,
    per_frame: usize,
) -> Result<usize> {
    reader.seek(SeekFrom::Start(0))?;
    let (header, _) = codec::read_header(reader)?;
    reader.seek(SeekFrom::Start(header.min_file_position()))?;

    let per_frame = per_frame.max(1);
    let mut written = 0;
    let samples = SampleReader::new(reader).take(limit.unwrap_or(usize::MAX));
    for (i, sample) in samples.enumerate() {
        let sample = sample.with_context(|| format!("reading sample {i}"))?;
        if i % per_frame == 0 {
            if i > 0 {
                writeln!(out)?;
            }
            write!(out, "{:>8}:", i / per_frame)?;
        }
        write!(out, " {sample:>6}")?;
        written += 1;
    }
    if written > 0 {
        writeln!(out)?;
    }
    Ok(written)
}

/// Re-encodes the header of `movie` in `convention`. Snapshot and samples are
/// copied verbatim.
pub fn convert(movie: &[u8], convention: HeaderConvention) -> Result<Vec<u8>> {
    let Some(head) = movie.first_chunk::<{ HEADER_LEN as usize }>() else {
        bail!("file is shorter than a movie header");
    };
    let (header, _) = MovieHeader::decode(head)?;

    let mut out = Vec::with_capacity(movie.len());
    out.extend_from_slice(&header.encode(convention));
    out.extend_from_slice(&movie[HEADER_LEN as usize..]);
    Ok(out)
}
