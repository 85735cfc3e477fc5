use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use nesium_bsv::HeaderConvention;
use tracing::Level;

/// BSV input movie tool
#[derive(Parser, Debug)]
#[command(name = "nesium-bsv")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the header and sample stream summary
    Info {
        movie: PathBuf,
    },

    /// Print the recorded input samples
    Dump {
        movie: PathBuf,

        /// Stop after this many samples
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Samples per output line (e.g. the number of inputs polled per frame)
        #[arg(short = 'k', long, default_value_t = 1)]
        per_frame: usize,
    },

    /// Check the header checksum against a content file
    Verify {
        movie: PathBuf,

        /// Content (ROM) file the movie was recorded against
        #[arg(long)]
        content: PathBuf,
    },

    /// Rewrite the header in another byte order
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = Convention::Canonical)]
        to: Convention,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convention {
    /// Big-endian header words
    Canonical,
    /// Byte-swapped header words
    Legacy,
}

impl From<Convention> for HeaderConvention {
    fn from(value: Convention) -> Self {
        match value {
            Convention::Canonical => HeaderConvention::Canonical,
            Convention::Legacy => HeaderConvention::LegacySwapped,
        }
    }
}
