//! # GLF Store
//!
//! Recording and playback of GLF sonar/navigation log sessions.
//!
//! A session is an ordered list of `.glf` files, each a plain concatenation
//! of encoded records (see [`glf_core`]). This crate provides:
//! - A rotating [`LogWriter`] that splits a session into size-limited files
//! - An [`IndexHandle`] that locates every record, either blocking or on a
//!   background thread
//! - A random-access [`LogReader`] on top of the index
//! - A forward-only [`SequentialReader`] that needs no index
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      glf-store                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐ │
//! │  │ LogWriter   │  │ LogReader   │  │ SequentialReader │ │
//! │  │ (rotation,  │  │ (random     │  │ (forward only,   │ │
//! │  │  stats)     │  │  access)    │  │  no index)       │ │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────────────┘ │
//! │         │                │                              │
//! │         │                ▼                              │
//! │         │  ┌─────────────────────────────────────────┐  │
//! │         │  │ IndexHandle (sync or background thread) │  │
//! │         │  └─────────────────────────────────────────┘  │
//! │         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ Notifier (crossbeam channels, one per instance)     ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Record and Play Back
//!
//! ```rust,no_run
//! use glf_core::Record;
//! use glf_core::records::StatusRecord;
//! use glf_store::{BuildMode, LogReader, LogWriter};
//!
//! # fn main() -> glf_store::Result<()> {
//! let mut writer = LogWriter::open("/tmp/session", 500 * 1024 * 1024)?;
//! writer.append(&Record::status(1_700_000_000.0, 1, StatusRecord::default()))?;
//! writer.close()?;
//!
//! let files = writer.written_files().to_vec();
//! let mut reader = LogReader::open(files, BuildMode::Synchronous)?;
//! let first = reader.get_record(0)?;
//! println!("frame {} after {} ms", first.frame, first.interval_ms);
//! # Ok(())
//! # }
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for the `glf-tool` binary:
//!
//! - `dump` - Print one line per record
//! - `index` - Build the index and print per-file start positions
//! - `relog` - Copy a session into a new rotated session

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod config;
pub mod disk;
pub mod error;
pub mod index;
pub mod notify;
pub mod reader;
pub mod sequential;
pub mod writer;

pub use config::WriterConfig;
pub use error::{GlfError, Result};
pub use index::{BuildMode, IndexEntry, IndexHandle};
pub use notify::{Notification, Notifier, OutputFileInfo};
pub use reader::{LogReader, PlaybackRecord};
pub use sequential::SequentialReader;
pub use writer::LogWriter;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Print a one-line summary of every record
    Dump {
        /// How to read the files
        #[arg(short, long, default_value_t, value_enum)]
        mode: ReadMode,

        /// Session files, in recording order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Build the index and print record counts and file start positions
    Index {
        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Copy every record into a new, rotated session
    Relog {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum size of each output file in MiB
        #[arg(long)]
        max_size_mb: Option<u64>,

        /// JSON writer configuration; flags take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Sequential read, one file at a time, no index
    #[default]
    Fast,
    /// Index the whole session first, then read by position
    Sync,
    /// Read by position while the index is built in the background
    Async,
}
