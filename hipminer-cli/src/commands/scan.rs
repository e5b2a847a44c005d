use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use hipminer_core::cache::scan::scan_local_install;
use hipminer_core::cache::CacheManager;
use hipminer_core::pipeline::{IngestPipeline, IngestSource};
use hipminer_core::progress::IndicatifReporter;
use hipminer_core::types::SourceKind;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Parse the discovered files into the knowledge base as well
    #[arg(long)]
    pub ingest: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Database path (default: next to the cache directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub async fn run(args: ScanArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    let entries = scan_local_install(&config.scan);
    if entries.is_empty() {
        println!("No scene files found under the scan roots.");
        println!("Set HOUDINI_INSTALL_PATH to point at a Houdini installation.");
        return Ok(());
    }

    println!("Found {} scene file{}:", entries.len(), plural(entries.len()));
    for entry in &entries {
        let systems = if entry.systems.is_empty() {
            String::new()
        } else {
            format!("  [{}]", entry.systems.join(", "))
        };
        println!(
            "  {}  {}{}",
            super::format_bytes(entry.size_bytes),
            entry.local_path.display(),
            systems
        );
    }

    // Register everything in the manifest so later runs see them as hits.
    let mut cache = CacheManager::open(&config).context("Cannot open cache")?;
    for entry in &entries {
        cache.register(entry.clone()).context("Cannot update manifest")?;
    }

    if args.ingest {
        let db_path = super::resolve_db_path(&config, args.db.as_deref());
        let store = super::open_store(&db_path)?;

        let sources: Vec<IngestSource> = entries
            .iter()
            .map(|e| IngestSource::new(e.source.clone(), SourceKind::LocalInstall))
            .collect();

        let mut pipeline = IngestPipeline::new(&config).context("Cannot open cache")?;
        let reporter = IndicatifReporter::new();
        let summary = pipeline
            .run_with_progress(&store, &sources, &reporter)
            .await
            .context("Ingestion failed")?;

        println!(
            "Parsed {} of {} ({} failed, {} skipped, {} snapshots)",
            summary.parsed,
            sources.len(),
            summary.failed,
            summary.skipped,
            summary.snapshots,
        );
    }

    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
