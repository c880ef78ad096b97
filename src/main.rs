//! # Planpatch
//!
//! Rebuilds lesson plan documents from a base text and a stored edit log.
//!
//! ## Quick Start
//!
//! ```bash
//! # Replay edits.json on top of plan.txt and print the result
//! cargo run -- apply plan.txt edits.json
//!
//! # Validate an edit log without applying it
//! cargo run -- check edits.json --strict
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planpatch_core::{Config, EditRecord, IngestMode, PatchApplier, PatchOutcome, ingest};

/// Planpatch - replay recorded lesson plan edits
#[derive(Parser, Debug)]
#[command(name = "planpatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply an edit log to a base document
    Apply {
        /// Base document, or `-` for stdin
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// JSON array of edit records
        #[arg(value_name = "EDITS")]
        edits: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Reject the whole log if any record cannot be decoded
        #[arg(long)]
        strict: bool,
    },

    /// Decode an edit log and report records that would be skipped
    Check {
        /// JSON array of edit records
        #[arg(value_name = "EDITS")]
        edits: PathBuf,

        /// Reject the whole log if any record cannot be decoded
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting planpatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    match args.command {
        Commands::Apply {
            base,
            edits,
            output,
            strict,
        } => {
            let base = read_base(&base, std::io::stdin().lock())?;
            let records = read_records(&edits)?;
            let outcome = run_apply(&config, &base, &records, strict)?;

            if config.output.report_diagnostics {
                for diagnostic in &outcome.diagnostics {
                    eprintln!("skipped {}", diagnostic);
                }
            }

            match output {
                Some(path) => std::fs::write(&path, &outcome.document)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout().write_all(outcome.document.as_bytes())?,
            }
        }
        Commands::Check { edits, strict } => {
            let records = read_records(&edits)?;
            let ingested = ingest(&records, ingest_mode(&config, strict))?;
            for diagnostic in &ingested.diagnostics {
                println!("{}", diagnostic);
            }
            println!(
                "{} of {} records decoded",
                ingested.edits.len(),
                records.len()
            );
        }
    }

    Ok(())
}

fn ingest_mode(config: &Config, strict: bool) -> IngestMode {
    if strict {
        IngestMode::Strict
    } else {
        config.patch.ingest
    }
}

/// Replays `records` on `base` under the configured ingestion policy.
fn run_apply(
    config: &Config,
    base: &str,
    records: &[EditRecord],
    strict: bool,
) -> anyhow::Result<PatchOutcome> {
    let applier = PatchApplier::with_config(config.patch.clone());
    match ingest_mode(config, strict) {
        IngestMode::Lenient => Ok(applier.apply_records(base, records)),
        IngestMode::Strict => {
            let ingested = ingest(records, IngestMode::Strict)?;
            Ok(applier.apply(base, &ingested.edits))
        }
    }
}

/// Reads the base document from `path`, or from `stdin` when it is `-`.
fn read_base(path: &Path, mut stdin: impl Read) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        stdin
            .read_to_string(&mut content)
            .context("Failed to read base document from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_records(path: &Path) -> anyhow::Result<Vec<EditRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of edit records", path.display()))
}
