use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use hipminer_core::cache::CacheManager;
use hipminer_core::store::HipStore;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Database path (default: next to the cache directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let db_path = super::resolve_db_path(&config, args.db.as_deref());

    println!("hipminer status");
    println!();
    println!("  Database: {}", db_path.display());

    if !db_path.exists() {
        println!("  (not created yet — run `hipminer ingest` first)");
        return Ok(());
    }

    let store = super::open_store(&db_path)?;
    let stats = store.stats().await.context("Failed to read store stats")?;

    if stats.db_size_bytes > 0 {
        println!("  Size:     {}", super::format_bytes(stats.db_size_bytes));
    }
    println!();

    println!("  Archives: {} total", stats.total_files);
    println!("    parsed   {:>6}", stats.parsed_ok);
    println!("    failed   {:>6}", stats.parse_failed);
    if !stats.files_by_source.is_empty() {
        let mut sources: Vec<_> = stats.files_by_source.iter().collect();
        sources.sort_by(|a, b| b.1.cmp(a.1));
        println!();
        println!("  By source:");
        for (source, count) in sources {
            println!("    {source:<16} {count:>6}");
        }
    }
    println!();
    println!("  Snapshots: {}", stats.total_snapshots);

    let cache = CacheManager::open(&config).context("Cannot open cache")?;
    println!();
    println!("  Cache: {}", cache.dir().display());
    println!(
        "    {} entr{}, {}",
        cache.entries().count(),
        if cache.entries().count() == 1 { "y" } else { "ies" },
        super::format_bytes(cache.total_size())
    );

    Ok(())
}
