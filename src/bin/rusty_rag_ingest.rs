use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rustyrag::{
    config, logging,
    loader::{DocumentLoader, PdfDirectoryLoader},
    metrics::RagMetrics,
    processing::{Indexer, PreprocessPipeline, preview_documents},
};

#[derive(Parser)]
#[command(
    name = "rusty-rag-ingest",
    about = "Index a directory of PDF guides into Qdrant"
)]
struct Cli {
    /// Directory holding the PDF files (defaults to PDFS_DIR).
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Drop and rebuild the collection even when it already holds vectors.
    #[arg(long)]
    force: bool,
    /// Load and chunk only, then print a JSON summary. Nothing is embedded or stored.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config = config::load_config().context("Invalid configuration")?;
    if let Some(dir) = cli.dir {
        config.pdfs_dir = dir;
    }

    if cli.dry_run {
        let pipeline =
            PreprocessPipeline::new(&config.pipeline).context("Invalid pipeline settings")?;
        let loader: Arc<dyn DocumentLoader> = Arc::new(PdfDirectoryLoader::new(&config.pdfs_dir));
        let preview = preview_documents(loader, Arc::new(pipeline))
            .await
            .with_context(|| format!("Dry run over {} failed", config.pdfs_dir.display()))?;
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let indexer = Indexer::from_config(&config, Arc::new(RagMetrics::new()))
        .context("Failed to initialize the indexer")?;
    let outcome = indexer
        .ingest(cli.force)
        .await
        .with_context(|| format!("Ingest of {} failed", config.pdfs_dir.display()))?;

    println!("{}", outcome.message);
    if outcome.skipped_duplicates > 0 {
        println!("Skipped {} duplicate chunks", outcome.skipped_duplicates);
    }
    for file in &outcome.failed_files {
        eprintln!("Skipped unreadable file: {file}");
    }
    Ok(())
}
