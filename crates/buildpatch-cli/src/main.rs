//! `bpm` binary entry point
//!
//! A thin wrapper around the buildpatch-manifest library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Decodes the manifest named on the command line
//! 4. Prints the requested view

mod config;
mod output;

use anyhow::{Context, Result};
use buildpatch_manifest::{DecodeOptions, Manifest, ManifestDecoder};
use clap::Parser;
use config::{Cli, Command};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}

fn load_manifest(path: &Path, options: DecodeOptions) -> Result<Manifest> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    debug!(path = %path.display(), "decoding manifest");

    let manifest = ManifestDecoder::new(options)
        .decode(BufReader::new(file))
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    info!(
        app = %manifest.meta.app_name,
        version = %manifest.meta.build_version,
        files = manifest.files.len(),
        chunks = manifest.chunks.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let manifest = load_manifest(cli.command.path(), cli.decode_options())?;

    match &cli.command {
        Command::Info { .. } => output::write_info(out, &manifest, cli.json),
        Command::Files { tags, .. } => output::write_files(out, &manifest, tags, cli.json),
        Command::Chunks { .. } => output::write_chunks(out, &manifest, cli.json),
        Command::Fields { .. } => output::write_fields(out, &manifest, cli.json),
    }
}
