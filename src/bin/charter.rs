//! Charter CLI Binary
//!
//! Runs one resolution batch over a directory of raw character documents
//! and prints the assembled runtime specs and diagnostics.

use anyhow::{Context, Result};
use charter::config::PipelineConfig;
use charter::document::RawCharacterDocument;
use charter::logging::init_logging;
use charter::orchestrator::Orchestrator;
use charter::store::InMemoryContentStore;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "charter", about = "Agent configuration resolution pipeline")]
struct Cli {
    /// Directory of raw character documents (*.json)
    #[arg(long)]
    documents: PathBuf,

    /// Pipeline config file (falls back to CHARTER_CONFIG, then defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

fn load_store(dir: &Path) -> Result<InMemoryContentStore> {
    let mut store = InMemoryContentStore::default();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading document directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let document: RawCharacterDocument = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        let storage_key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        store.push(format!("agents/{}", storage_key), document);
    }
    Ok(store)
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::load_default()?,
    };
    init_logging(Some(&config.logging))?;

    let store = load_store(&cli.documents)?;
    let orchestrator = Orchestrator::new(Arc::new(config.build_registry()))
        .with_requirements(config.secret_requirements());
    let outcome = orchestrator.resolve_batch(&store).await?;

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome.specs)?);
    } else {
        for spec in &outcome.specs {
            println!(
                "{} ({}) plugins=[{}] knowledge={} secrets={}",
                spec.name,
                spec.id,
                spec.plugins
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                spec.knowledge.len(),
                spec.secrets.len(),
            );
        }
        for discarded in &outcome.discarded {
            println!("discarded {} ({:?})", discarded.storage_key, discarded.reason);
        }
        println!(
            "{} assembled, {} discarded, {} diagnostics",
            outcome.specs.len(),
            outcome.discarded.len(),
            outcome.diagnostics.len()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
