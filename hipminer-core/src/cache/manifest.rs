use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::types::CacheEntry;

/// Manifest filename within the cache directory.
pub const MANIFEST_NAME: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// The cache manifest: one JSON document mapping source identifiers to their
/// cached entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    pub last_updated: DateTime<Utc>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl Manifest {
    /// Load the manifest from a cache directory.
    ///
    /// A missing or unreadable manifest yields an empty one. Rows whose blob
    /// vanished (a crash between blob write and manifest rewrite, or manual
    /// deletion) are dropped on load.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_NAME);
        let mut manifest = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Self>(&text) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Manifest unreadable, starting fresh");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        let before = manifest.entries.len();
        manifest
            .entries
            .retain(|_, entry| entry.local_path.exists());
        let dropped = before - manifest.entries.len();
        if dropped > 0 {
            debug!(dropped, "Dropped dangling manifest rows");
        }

        manifest
    }

    /// Atomically rewrite the manifest: write a temp file, then rename over
    /// the old one.
    pub fn save(&mut self, dir: &Path) -> Result<(), CacheError> {
        self.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CacheError::Manifest(e.to_string()))?;

        let path = dir.join(MANIFEST_NAME);
        let tmp = dir.join(format!("{MANIFEST_NAME}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Sum of entry sizes, the quantity the eviction budget applies to.
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}
