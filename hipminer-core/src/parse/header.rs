use regex::Regex;

use crate::types::Scene;

/// Compiled patterns for the scene-level header entries.
///
/// Header content is freeform `key = value` text whose exact spelling drifted
/// across Houdini releases; the patterns accept the variants seen in the wild.
pub(crate) struct HeaderScanner {
    version: Regex,
    save_time: Regex,
    key_value: Regex,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self {
            version: Regex::new(
                r#"(?:houdini_version|_HIP_SAVEVERSION)\s*=?\s*["']?(\d+\.\d+(?:\.\d+)?)"#,
            )
            .unwrap(),
            save_time: Regex::new(r#"(?:_HIP_SAVETIME|hip_savetime)\s*=?\s*["']?([^"'\n]+)"#)
                .unwrap(),
            key_value: Regex::new(
                r#"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:"([^"]*)"|([^\n]+))"#,
            )
            .unwrap(),
        }
    }

    /// Extract version, save time, and freeform metadata from header text.
    /// Metadata keys repeat across concatenated entries; last write wins.
    pub fn scan(&self, text: &str, scene: &mut Scene) {
        if let Some(version) = self.find_version(text) {
            scene.hip_version = version;
        }
        if let Some(caps) = self.save_time.captures(text) {
            scene.save_time = caps[1].trim().to_string();
        }
        for caps in self.key_value.captures_iter(text) {
            let key = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            scene.metadata.insert(key, value);
        }
    }

    /// First version match in arbitrary text, used as a fallback over node
    /// entries when the header entries carry no version.
    pub fn find_version(&self, text: &str) -> Option<String> {
        self.version.captures(text).map(|caps| caps[1].to_string())
    }
}
