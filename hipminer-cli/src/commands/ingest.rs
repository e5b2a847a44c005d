use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use hipminer_core::pipeline::{IngestPipeline, IngestSource};
use hipminer_core::progress::IndicatifReporter;
use hipminer_core::types::SourceKind;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Archive URLs or local paths
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Source class recorded for these archives
    #[arg(long, default_value = "community")]
    pub source_kind: String,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Database path (default: next to the cache directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let kind = parse_source_kind(&args.source_kind)?;
    let config = super::load_config(args.config.as_deref())?;
    let db_path = super::resolve_db_path(&config, args.db.as_deref());
    let store = super::open_store(&db_path)?;

    let sources: Vec<IngestSource> = args
        .sources
        .iter()
        .map(|s| IngestSource::new(s.clone(), kind))
        .collect();

    let mut pipeline = IngestPipeline::new(&config).context("Cannot open cache")?;
    let reporter = IndicatifReporter::new();
    let summary = pipeline
        .run_with_progress(&store, &sources, &reporter)
        .await
        .context("Ingestion failed")?;

    println!(
        "Ingested {} archive{}: {} parsed, {} failed, {} skipped, {} snapshots",
        sources.len(),
        if sources.len() == 1 { "" } else { "s" },
        summary.parsed,
        summary.failed,
        summary.skipped,
        summary.snapshots,
    );
    for error in &summary.errors {
        println!("  {error}");
    }

    Ok(())
}

fn parse_source_kind(s: &str) -> anyhow::Result<SourceKind> {
    SourceKind::parse(s).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown source kind {s:?} (expected content_library, examples, local_install, or community)"
        )
    })
}
