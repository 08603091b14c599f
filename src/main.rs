//! sn2n CLI - dry-run conversion of a saved ServiceNow page.
//!
//! Converts the file, publishes the result to an in-memory document store,
//! validates the created tree against the source and prints a JSON summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sn2n::{
    ConversionConfig, DocumentMetadata, MemoryDocumentStore, OrchestratorConfig, PublishConfig,
    convert, publish, validate,
};

/// Convert ServiceNow documentation HTML into a Notion block tree.
#[derive(Parser)]
#[command(name = "sn2n", version, about)]
struct Cli {
    /// Saved HTML page
    file: PathBuf,

    /// Base URL for resolving relative links and image sources
    #[arg(long)]
    base_url: Option<String>,

    /// Document title (default: file stem)
    #[arg(long)]
    title: Option<String>,

    /// Debug-level traces from conversion and orchestration
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("sn2n=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sn2n=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let html = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let mut config = ConversionConfig::default().with_verbose(cli.verbose);
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }

    let result = convert(&html, &config)?;
    let total_blocks = result.total_blocks();
    let markers = result.marker_map.len();
    let conversion_warnings = result.warnings.len();

    let title = cli.title.clone().unwrap_or_else(|| {
        cli.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });
    let publish_config = PublishConfig {
        orchestrator: OrchestratorConfig::default().with_verbose(cli.verbose),
        ..PublishConfig::default()
    };

    let store = MemoryDocumentStore::new();
    let report = publish(&store, result, &DocumentMetadata::titled(title), &publish_config).await?;
    let tree = store
        .fetch_tree(&report.document_id)
        .context("Failed to read back the created document")?;
    let validation = validate(&html, &tree, None);

    let summary = json!({
        "document_id": report.document_id,
        "blocks": total_blocks,
        "markers": markers,
        "conversion_warnings": conversion_warnings,
        "uploads": report.uploads,
        "upload_failures": report.upload_failures,
        "dedupe": report.dedupe,
        "orchestration": report.orchestration,
        "validation": validation,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if validation.has_errors() {
        std::process::exit(2);
    }
    Ok(())
}
