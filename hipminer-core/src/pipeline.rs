//! Batch ingestion — acquire, parse, and extract one archive at a time.
//!
//! Each archive runs to completion before the next begins, which keeps the
//! rate limit simple and bounds peak memory to one decompressed archive plus
//! one scene. Failures are isolated per archive: a bad download or a corrupt
//! container is recorded and the batch moves on.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::cache::CacheManager;
use crate::config::HipConfig;
use crate::error::HipError;
use crate::extract::{already_ingested, extract_scene, record_failure};
use crate::parse::parse_scene;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::store::HipStore;
use crate::types::SourceKind;

/// One archive to ingest: a URL or local path plus its source class.
#[derive(Debug, Clone)]
pub struct IngestSource {
    pub source: String,
    pub kind: SourceKind,
}

impl IngestSource {
    pub fn new(source: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub parsed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub snapshots: u64,
    pub errors: Vec<IngestError>,
    pub duration: Duration,
}

/// A non-fatal error from one archive.
#[derive(Debug)]
pub struct IngestError {
    pub stage: &'static str,
    pub source: String,
    pub message: String,
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.source, self.message)
    }
}

/// Orchestrates acquire → parse → extract over a batch of sources.
#[derive(Debug)]
pub struct IngestPipeline {
    cache: CacheManager,
    request_spacing: Duration,
}

impl IngestPipeline {
    pub fn new(config: &HipConfig) -> crate::error::Result<Self> {
        Ok(Self {
            cache: CacheManager::open(config)?,
            request_spacing: Duration::from_millis(config.ingest.request_spacing_ms),
        })
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Run the batch without progress output.
    pub async fn run(
        &mut self,
        store: &dyn HipStore,
        sources: &[IngestSource],
    ) -> crate::error::Result<IngestSummary> {
        self.run_with_progress(store, sources, &NoopReporter).await
    }

    /// Run the batch, reporting `(done, total, identifier)` per archive.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub async fn run_with_progress(
        &mut self,
        store: &dyn HipStore,
        sources: &[IngestSource],
        progress: &dyn ProgressReporter,
    ) -> crate::error::Result<IngestSummary> {
        let start = Instant::now();
        let mut summary = IngestSummary::default();
        let total = sources.len() as u64;

        progress.start("Ingesting archives", Some(total));

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.request_spacing.is_zero() {
                tokio::time::sleep(self.request_spacing).await;
            }

            if let Err(e) = self.ingest_one(store, source, &mut summary).await {
                // Store-level failures are still per-archive: record and move on.
                warn!(source = %source.source, error = %e, "Ingestion failed");
                summary.failed += 1;
                summary.errors.push(IngestError {
                    stage: "extract",
                    source: source.source.clone(),
                    message: e.to_string(),
                });
            }

            progress.archive_done(index as u64 + 1, total, &source.source);
        }

        progress.finish();
        summary.duration = start.elapsed();

        info!(
            parsed = summary.parsed,
            failed = summary.failed,
            skipped = summary.skipped,
            snapshots = summary.snapshots,
            duration = ?summary.duration,
            "Batch complete"
        );
        Ok(summary)
    }

    async fn ingest_one(
        &mut self,
        store: &dyn HipStore,
        source: &IngestSource,
        summary: &mut IngestSummary,
    ) -> crate::error::Result<()> {
        let Some(entry) = self.cache.acquire(&source.source, source.kind).await? else {
            summary.failed += 1;
            summary.errors.push(IngestError {
                stage: "acquire",
                source: source.source.clone(),
                message: "source unavailable".to_string(),
            });
            return Ok(());
        };

        if already_ingested(store, &entry.sha256).await? {
            summary.skipped += 1;
            return Ok(());
        }

        let bytes = match std::fs::read(&entry.local_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                summary.failed += 1;
                summary.errors.push(IngestError {
                    stage: "read",
                    source: source.source.clone(),
                    message: e.to_string(),
                });
                return Ok(());
            }
        };

        match parse_scene(&bytes) {
            Ok(scene) => {
                let result = extract_scene(store, &scene, &entry).await?;
                summary.parsed += 1;
                summary.snapshots += result.parameters;
            }
            Err(format_error) => {
                record_failure(store, &entry, &format_error).await?;
                summary.failed += 1;
                summary.errors.push(IngestError {
                    stage: "parse",
                    source: source.source.clone(),
                    message: HipError::Archive(format_error).to_string(),
                });
            }
        }
        Ok(())
    }
}
