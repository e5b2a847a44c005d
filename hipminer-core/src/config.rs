use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default cache budget: 2 GiB.
pub const DEFAULT_CACHE_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// User agent sent with every archive download.
pub const USER_AGENT: &str = "hipminer/0.1 (houdini-kb-builder)";

/// Top-level hipminer configuration, matching `hipminer.toml`.
///
/// Environment variables take precedence over file values — call
/// [`HipConfig::with_env_overrides`] after loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HipConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub ingest: IngestSection,
}

impl HipConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        let config: Self =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config.with_env_overrides())
    }

    /// Apply `CACHE_DIR`, `CACHE_MAX_BYTES`, `HOUDINI_INSTALL_PATH`, and
    /// `HOUDINI_VERSION_DIRS` on top of the file values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("CACHE_DIR") {
            if !dir.is_empty() {
                self.cache.dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(max) = std::env::var("CACHE_MAX_BYTES") {
            if let Ok(bytes) = max.trim().parse::<u64>() {
                self.cache.max_bytes = bytes;
            }
        }
        if let Ok(install) = std::env::var("HOUDINI_INSTALL_PATH") {
            if !install.is_empty() {
                self.scan.install_path = Some(PathBuf::from(install));
            }
        }
        if let Ok(dirs) = std::env::var("HOUDINI_VERSION_DIRS") {
            self.scan.version_dirs = dirs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        self
    }
}

/// Cache directory and eviction budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Explicit cache directory; `None` uses the user-scoped default.
    pub dir: Option<PathBuf>,
    /// Byte budget before eviction kicks in.
    pub max_bytes: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: None,
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

impl CacheSection {
    /// Resolve the effective cache directory: explicit setting, otherwise
    /// `~/.hipminer/cache`.
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hipminer")
            .join("cache")
    }
}

/// Local Houdini installation scan roots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Houdini installation root, usually from `HOUDINI_INSTALL_PATH`.
    pub install_path: Option<PathBuf>,
    /// Extra directory names appended to the scan roots.
    pub version_dirs: Vec<String>,
}

/// Batch ingestion behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Delay between successive acquisitions in a batch, in milliseconds.
    pub request_spacing_ms: u64,
    /// User agent for archive downloads.
    pub user_agent: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            request_spacing_ms: 2000,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HipConfig::default();
        assert_eq!(config.cache.max_bytes, DEFAULT_CACHE_MAX_BYTES);
        assert!(config.cache.dir.is_none());
        assert_eq!(config.ingest.request_spacing_ms, 2000);
        assert!(config.ingest.user_agent.starts_with("hipminer/"));
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[cache]
dir = "/tmp/hip-cache"
max_bytes = 1048576

[scan]
install_path = "/opt/hfs20.5"
version_dirs = ["houdini20.5", "houdini20.0"]

[ingest]
request_spacing_ms = 500
"#;
        let config: HipConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.dir.as_deref(), Some(Path::new("/tmp/hip-cache")));
        assert_eq!(config.cache.max_bytes, 1_048_576);
        assert_eq!(
            config.scan.install_path.as_deref(),
            Some(Path::new("/opt/hfs20.5"))
        );
        assert_eq!(config.scan.version_dirs.len(), 2);
        assert_eq!(config.ingest.request_spacing_ms, 500);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
[cache]
max_bytes = 42
"#;
        let config: HipConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.max_bytes, 42);
        assert_eq!(config.ingest.request_spacing_ms, 2000);
        assert!(config.scan.install_path.is_none());
    }

    #[test]
    fn resolve_dir_prefers_explicit() {
        let section = CacheSection {
            dir: Some(PathBuf::from("/explicit")),
            max_bytes: 1,
        };
        assert_eq!(section.resolve_dir(), PathBuf::from("/explicit"));
    }
}
