//! Command-line configuration
//!
//! Options can be given as arguments or through environment variables
//! (`BPM_LOG`, `BPM_MAX_PAYLOAD_SIZE`).

use buildpatch_manifest::{DEFAULT_MAX_PAYLOAD_SIZE, DecodeOptions};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Inspect BuildPatch build manifests
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bpm",
    about = "Inspect BuildPatch build manifests",
    version,
    long_about = "Decodes binary and JSON build manifests and prints their metadata, files, chunk catalog and custom fields."
)]
pub struct Cli {
    /// Log filter directive, e.g. `debug` or `buildpatch_manifest=trace`
    #[arg(long, env = "BPM_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Largest manifest payload to accept, in bytes
    #[arg(
        long,
        env = "BPM_MAX_PAYLOAD_SIZE",
        default_value_t = DEFAULT_MAX_PAYLOAD_SIZE,
        global = true
    )]
    pub max_payload_size: u64,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show build metadata and totals
    Info {
        /// Manifest file
        path: PathBuf,
    },

    /// List files in the build
    Files {
        /// Manifest file
        path: PathBuf,

        /// Only list untagged files and files with one of these tags
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List the chunk catalog with chunk file paths
    Chunks {
        /// Manifest file
        path: PathBuf,
    },

    /// Show custom fields
    Fields {
        /// Manifest file
        path: PathBuf,
    },
}

impl Cli {
    /// Decoder options derived from the command line
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default().with_max_payload_size(self.max_payload_size)
    }
}

impl Command {
    /// Manifest the command operates on
    pub fn path(&self) -> &Path {
        match self {
            Self::Info { path }
            | Self::Files { path, .. }
            | Self::Chunks { path }
            | Self::Fields { path } => path,
        }
    }
}
