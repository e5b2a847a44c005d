pub mod ingest;
pub mod scan;
pub mod stats;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use hipminer_core::config::HipConfig;
use hipminer_core::store::sqlite::SqliteStore;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest archives from URLs or local paths
    Ingest(ingest::IngestArgs),
    /// Scan a local Houdini installation for scene files
    Scan(scan::ScanArgs),
    /// Show per-parameter aggregates for a node type
    Stats(stats::StatsArgs),
    /// Show current state of the knowledge base
    Status(status::StatusArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Ingest(args) => ingest::run(args).await,
        Command::Scan(args) => scan::run(args).await,
        Command::Stats(args) => stats::run(args).await,
        Command::Status(args) => status::run(args).await,
    }
}

/// Load config from an optional file, always applying env overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HipConfig> {
    match path {
        Some(path) => HipConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display())),
        None => Ok(HipConfig::default().with_env_overrides()),
    }
}

/// Default database location: next to the cache directory.
pub fn resolve_db_path(config: &HipConfig, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match config.cache.resolve_dir().parent() {
        Some(parent) => parent.join("hipminer.db"),
        None => PathBuf::from("hipminer.db"),
    }
}

pub fn open_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory: {}", parent.display()))?;
    }
    SqliteStore::open(db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
