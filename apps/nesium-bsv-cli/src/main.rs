mod args;
mod inspect;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use nesium_bsv::HeaderConvention;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

use args::{Args, Command};

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Info { movie } => info_cmd(&movie),
        Command::Dump {
            movie,
            limit,
            per_frame,
        } => dump_cmd(&movie, limit, per_frame),
        Command::Verify { movie, content } => verify_cmd(&movie, &content),
        Command::Convert { input, output, to } => convert_cmd(&input, &output, to.into()),
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn info_cmd(movie: &Path) -> Result<()> {
    let summary = inspect::summarize(&mut open(movie)?)?;
    let header = summary.header;

    println!("file:        {}", movie.display());
    println!("convention:  {:?}", summary.convention);
    println!("magic:       {:#010x}", header.magic);
    println!("content crc: {:#010x}", header.content_crc);
    println!("state size:  {} bytes", header.state_size);
    println!("reserved:    {:#010x}", header.reserved);
    println!("samples:     {}", summary.samples);
    if summary.trailing_byte {
        warn!("movie ends with a torn sample");
        println!("trailing:    1 byte");
    }
    Ok(())
}

fn dump_cmd(movie: &Path, limit: Option<usize>, per_frame: usize) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let written = inspect::dump(&mut open(movie)?, &mut out, limit, per_frame)?;
    out.flush()?;
    debug!(written, "dumped samples");
    Ok(())
}

fn verify_cmd(movie: &Path, content: &Path) -> Result<()> {
    let summary = inspect::summarize(&mut open(movie)?)?;
    let bytes = fs::read(content).with_context(|| format!("reading {}", content.display()))?;
    let crc = crc32fast::hash(&bytes);
    let recorded = summary.header.content_crc;

    if crc != recorded {
        bail!(
            "checksum mismatch: {} has {crc:#010x}, movie was recorded against {recorded:#010x}",
            content.display()
        );
    }
    info!(crc, "content checksum matches");
    println!("ok");
    Ok(())
}

fn convert_cmd(input: &Path, output: &Path, to: HeaderConvention) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let converted = inspect::convert(&bytes, to)
        .with_context(|| format!("converting {}", input.display()))?;
    fs::write(output, converted).with_context(|| format!("writing {}", output.display()))?;
    info!(input = %input.display(), output = %output.display(), ?to, "converted movie header");
    Ok(())
}
