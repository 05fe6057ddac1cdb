/// Classify Binary - Runs the classify pipeline on one text block
///
/// Usage:
///   classify [FILE] [--corpus <snapshot.json>] [--suggest] [--config <config.json>]
///
/// Reads stdin when FILE is omitted. The corpus is a JSON `CorpusSnapshot`
/// with `files` and `snippets` arrays.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use code_organizer::{CodeOrganizer, OrganizerConfig};
use code_organizer_schemas::CorpusSnapshot;
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "classify")]
#[command(about = "Classify a code snippet against a saved corpus")]
struct Args {
    /// Text file to classify (stdin when omitted)
    file: Option<PathBuf>,

    /// JSON corpus snapshot to compare against
    #[arg(long, short)]
    corpus: Option<PathBuf>,

    /// Include merge, grouping and naming suggestions
    #[arg(long, short)]
    suggest: bool,

    /// JSON config file (overrides ORGANIZER_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
            buffer
        }
    };

    let corpus = match &args.corpus {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<CorpusSnapshot>(&raw).map_err(|e| {
                error!("Invalid corpus snapshot {}: {}", path.display(), e);
                anyhow::anyhow!("Invalid corpus snapshot {}: {}", path.display(), e)
            })?
        }
        None => CorpusSnapshot::default(),
    };
    info!("Classifying {} chars against {} corpus items", text.len(), corpus.len());

    let config = OrganizerConfig::load(args.config.as_deref())?;
    let organizer = CodeOrganizer::new(config)?;
    let outcome = organizer.process_and_classify(&text, Utc::now(), &corpus, args.suggest);

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
