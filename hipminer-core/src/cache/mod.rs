//! Content-addressed archive cache.
//!
//! Archives are identified by the SHA-256 of their bytes regardless of where
//! they came from. Downloads land in the cache directory as
//! `<hash[..12]>-<sanitized name>` blobs; a JSON manifest maps source
//! identifiers to entries and is rewritten atomically after every change, so
//! a reader never observes a manifest row without its blob (except across
//! crashes, which the load step tolerates).

mod manifest;
pub mod scan;

pub use manifest::{MANIFEST_NAME, Manifest};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::HipConfig;
use crate::error::CacheError;
use crate::types::{CacheEntry, SourceKind};

/// Maximum length of a sanitized blob filename component, in bytes.
const MAX_NAME_LEN: usize = 100;

/// Local archive cache with SHA-256 identity and byte-budget eviction.
#[derive(Debug)]
pub struct CacheManager {
    dir: PathBuf,
    max_bytes: u64,
    client: reqwest::Client,
    manifest: Manifest,
}

impl CacheManager {
    /// Open the cache described by the configuration, creating the directory
    /// and loading (or initializing) the manifest.
    pub fn open(config: &HipConfig) -> crate::error::Result<Self> {
        let dir = config.cache.resolve_dir();
        fs::create_dir_all(&dir).map_err(CacheError::Io)?;

        let client = reqwest::Client::builder()
            .user_agent(config.ingest.user_agent.clone())
            .build()
            .map_err(|e| CacheError::Http(e.to_string()))?;

        let manifest = Manifest::load(&dir);

        Ok(Self {
            dir,
            max_bytes: config.cache.max_bytes,
            client,
            manifest,
        })
    }

    /// Acquire an archive by source URL or local path.
    ///
    /// Returns `Ok(None)` on a miss (failed download or unreadable file) —
    /// transient failures never abort a batch. On success the returned
    /// entry's blob exists on disk and its SHA-256 matches the recorded hash.
    pub async fn acquire(
        &mut self,
        source: &str,
        kind: SourceKind,
    ) -> crate::error::Result<Option<CacheEntry>> {
        if let Some(entry) = self.manifest.entries.get(source) {
            if entry.local_path.exists() {
                debug!(source, "cache hit");
                return Ok(Some(entry.clone()));
            }
        }

        let entry = if is_url(source) {
            self.fetch(source, kind).await?
        } else {
            self.register_local(Path::new(source), kind)?
        };
        let Some(entry) = entry else {
            return Ok(None);
        };

        self.manifest
            .entries
            .insert(source.to_string(), entry.clone());
        self.evict(Some(source));
        self.manifest.save(&self.dir)?;

        Ok(Some(entry))
    }

    /// Insert a pre-built entry (from the local-install scan) and persist the
    /// manifest.
    pub fn register(&mut self, entry: CacheEntry) -> crate::error::Result<()> {
        self.manifest
            .entries
            .insert(entry.source.clone(), entry);
        self.manifest.save(&self.dir)?;
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.manifest.entries.values()
    }

    pub fn total_size(&self) -> u64 {
        self.manifest.total_size()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn fetch(
        &self,
        url: &str,
        kind: SourceKind,
    ) -> crate::error::Result<Option<CacheEntry>> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Download failed");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            warn!(url, status = %response.status(), "Download rejected");
            return Ok(None);
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "Download body failed");
                return Ok(None);
            }
        };

        let hash = hex::encode(Sha256::digest(&body));
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("download")
            .to_string();
        let blob_name = format!("{}-{}", &hash[..12], sanitize_file_name(&file_name));
        let blob_path = self.dir.join(&blob_name);

        // Write the blob fully, fsync, close, then let the caller persist the
        // manifest — readers never see a manifest row without its blob.
        let tmp_path = self.dir.join(format!("{blob_name}.partial"));
        {
            let mut file = fs::File::create(&tmp_path).map_err(CacheError::Io)?;
            file.write_all(&body).map_err(CacheError::Io)?;
            file.sync_all().map_err(CacheError::Io)?;
        }
        fs::rename(&tmp_path, &blob_path).map_err(CacheError::Io)?;

        info!(url, size = body.len(), hash = %&hash[..12], "Cached archive");

        Ok(Some(CacheEntry {
            source: url.to_string(),
            kind,
            local_path: blob_path,
            file_name,
            sha256: hash,
            size_bytes: body.len() as u64,
            downloaded_at: Utc::now(),
            systems: scan::infer_systems(url),
            description: None,
        }))
    }

    /// Hash an existing local file in place — no copy into the cache dir.
    fn register_local(
        &self,
        path: &Path,
        kind: SourceKind,
    ) -> crate::error::Result<Option<CacheEntry>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local source unreadable");
                return Ok(None);
            }
        };
        let hash = hex::encode(Sha256::digest(&bytes));
        let file_name = path
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().to_string());
        let source = path.to_string_lossy().to_string();

        Ok(Some(CacheEntry {
            kind,
            local_path: path.to_path_buf(),
            file_name,
            sha256: hash,
            size_bytes: bytes.len() as u64,
            downloaded_at: Utc::now(),
            systems: scan::infer_systems(&source),
            description: None,
            source,
        }))
    }

    /// Evict oldest-first until the total size fits the budget.
    ///
    /// The entry named by `keep` (the one just created) and entries whose
    /// blob lives outside the cache directory (local installs) are never
    /// touched.
    fn evict(&mut self, keep: Option<&str>) {
        let mut total = self.manifest.total_size();
        while total > self.max_bytes {
            let oldest = self
                .manifest
                .entries
                .iter()
                .filter(|(id, entry)| {
                    Some(id.as_str()) != keep && entry.local_path.starts_with(&self.dir)
                })
                .min_by_key(|(_, entry)| entry.downloaded_at)
                .map(|(id, _)| id.clone());

            let Some(id) = oldest else { break };
            let Some(entry) = self.manifest.entries.remove(&id) else {
                break;
            };
            if entry.local_path.exists() {
                let _ = fs::remove_file(&entry.local_path);
            }
            total = total.saturating_sub(entry.size_bytes);
            info!(
                source = %entry.source,
                size = entry.size_bytes,
                "Evicted cache entry"
            );
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Replace everything outside `[A-Za-z0-9._-]` and cap the length.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    out.truncate(MAX_NAME_LEN);
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn manager_with_budget(dir: &Path, max_bytes: u64) -> CacheManager {
        let mut config = HipConfig::default();
        config.cache.dir = Some(dir.to_path_buf());
        config.cache.max_bytes = max_bytes;
        CacheManager::open(&config).unwrap()
    }

    /// Write a blob into the cache dir and register a matching entry with a
    /// controlled timestamp.
    fn add_blob(manager: &mut CacheManager, id: &str, size: usize, age_secs: i64) {
        let path = manager.dir.join(id);
        fs::write(&path, vec![b'x'; size]).unwrap();
        manager.manifest.entries.insert(
            id.to_string(),
            CacheEntry {
                source: id.to_string(),
                kind: SourceKind::Community,
                local_path: path,
                file_name: id.to_string(),
                sha256: "00".repeat(32),
                size_bytes: size as u64,
                downloaded_at: Utc::now() - Duration::seconds(age_secs),
                systems: Vec::new(),
                description: None,
            },
        );
    }

    #[test]
    fn sanitize_replaces_and_truncates() {
        assert_eq!(sanitize_file_name("pyro scene!.hip"), "pyro_scene_.hip");
        assert_eq!(sanitize_file_name("ok-name_1.hip"), "ok-name_1.hip");
        let long = "a".repeat(200);
        assert_eq!(sanitize_file_name(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/a.hip"));
        assert!(is_url("http://example.com/a.hip"));
        assert!(!is_url("/home/u/a.hip"));
        assert!(!is_url("relative/a.hip"));
    }

    #[test]
    fn eviction_removes_oldest_until_within_budget() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = manager_with_budget(tmp.path(), 1000);

        // t1 < t2 < t3, 400 bytes each; total 1200 exceeds the 1000 budget.
        add_blob(&mut manager, "t1", 400, 30);
        add_blob(&mut manager, "t2", 400, 20);
        add_blob(&mut manager, "t3", 400, 10);
        assert_eq!(manager.total_size(), 1200);

        manager.evict(Some("t3"));

        assert_eq!(manager.total_size(), 800);
        assert!(!manager.manifest.entries.contains_key("t1"));
        assert!(manager.manifest.entries.contains_key("t2"));
        assert!(manager.manifest.entries.contains_key("t3"));
        assert!(!tmp.path().join("t1").exists());
        assert!(tmp.path().join("t2").exists());
    }

    #[test]
    fn eviction_never_removes_the_new_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = manager_with_budget(tmp.path(), 100);

        // The kept entry alone exceeds the budget; nothing else to evict.
        add_blob(&mut manager, "huge", 500, 0);
        manager.evict(Some("huge"));
        assert!(manager.manifest.entries.contains_key("huge"));
    }

    #[test]
    fn eviction_skips_blobs_outside_the_cache_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let mut manager = manager_with_budget(tmp.path(), 100);

        let external = outside.path().join("install.hip");
        fs::write(&external, vec![b'x'; 500]).unwrap();
        manager.manifest.entries.insert(
            "install".to_string(),
            CacheEntry {
                source: "install".to_string(),
                kind: SourceKind::LocalInstall,
                local_path: external.clone(),
                file_name: "install.hip".to_string(),
                sha256: "00".repeat(32),
                size_bytes: 500,
                downloaded_at: Utc::now() - Duration::seconds(100),
                systems: Vec::new(),
                description: None,
            },
        );

        manager.evict(None);

        // Over budget, but a user's install file must never be deleted.
        assert!(external.exists());
        assert!(manager.manifest.entries.contains_key("install"));
    }

    #[tokio::test]
    async fn acquire_local_file_hashes_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tempfile::tempdir().unwrap();
        let mut manager = manager_with_budget(tmp.path(), 1_000_000);

        let file = source_dir.path().join("pyro_test.hip");
        fs::write(&file, b"hip bytes").unwrap();

        let entry = manager
            .acquire(&file.to_string_lossy(), SourceKind::Community)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.local_path, file);
        assert_eq!(entry.sha256, hex::encode(Sha256::digest(b"hip bytes")));
        assert_eq!(entry.systems, vec!["pyro".to_string()]);

        // Second acquire is a manifest hit returning the same entry.
        let again = manager
            .acquire(&file.to_string_lossy(), SourceKind::Community)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.sha256, entry.sha256);
    }

    #[tokio::test]
    async fn acquire_missing_local_file_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = manager_with_budget(tmp.path(), 1000);
        let result = manager
            .acquire("/does/not/exist.hip", SourceKind::Community)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn acquired_entry_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tempfile::tempdir().unwrap();
        let file = source_dir.path().join("scene.hip");
        fs::write(&file, b"payload").unwrap();

        {
            let mut manager = manager_with_budget(tmp.path(), 1000);
            manager
                .acquire(&file.to_string_lossy(), SourceKind::Examples)
                .await
                .unwrap()
                .unwrap();
        }

        let manager = manager_with_budget(tmp.path(), 1000);
        assert_eq!(manager.entries().count(), 1);
    }
}
