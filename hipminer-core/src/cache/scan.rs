//! Local Houdini installation scan.
//!
//! Enumerates `.hip`/`.hipnc` files under installation candidates and turns
//! each into a [`CacheEntry`] pointing at the on-disk file — no copy is made.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanSection;
use crate::types::{CacheEntry, SourceKind};

/// Conventional installation locations, tried when no explicit path is set.
const CONVENTIONAL_ROOTS: [&str; 4] = [
    "/opt/hfs",
    "/opt/houdini",
    "/Applications/Houdini",
    "C:\\Program Files\\Side Effects Software",
];

/// Simulation-system keywords matched against path segments.
const SYSTEM_KEYWORDS: [(&str, &[&str]); 4] = [
    ("pyro", &["pyro", "fire", "smoke"]),
    ("rbd", &["rbd", "fracture", "bullet"]),
    ("flip", &["flip", "fluid", "ocean"]),
    ("vellum", &["vellum", "cloth", "hair"]),
];

/// Candidate scan roots: the configured install path, the conventional
/// locations, and any extra version directories appended to each.
pub fn scan_roots(config: &ScanSection) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(install) = &config.install_path {
        roots.push(install.clone());
    }
    for root in CONVENTIONAL_ROOTS {
        roots.push(PathBuf::from(root));
    }
    let bases = roots.clone();
    for version_dir in &config.version_dirs {
        for base in &bases {
            roots.push(base.join(version_dir));
        }
    }
    roots
}

/// Walk the scan roots and build one entry per scene file found.
pub fn scan_local_install(config: &ScanSection) -> Vec<CacheEntry> {
    let mut entries = Vec::new();
    for root in scan_roots(config) {
        if !root.is_dir() {
            continue;
        }
        debug!(root = %root.display(), "Scanning install root");
        for item in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if !item.file_type().is_file() {
                continue;
            }
            if !is_scene_file(item.path()) {
                continue;
            }
            match entry_for_file(item.path()) {
                Some(entry) => entries.push(entry),
                None => warn!(path = %item.path().display(), "Unreadable scene file"),
            }
        }
    }
    info!(found = entries.len(), "Local install scan complete");
    entries
}

fn is_scene_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".hip") || name.ends_with(".hipnc")
}

fn entry_for_file(path: &Path) -> Option<CacheEntry> {
    let bytes = std::fs::read(path).ok()?;
    let source = path.to_string_lossy().to_string();
    Some(CacheEntry {
        kind: SourceKind::LocalInstall,
        local_path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().to_string()),
        sha256: hex::encode(Sha256::digest(&bytes)),
        size_bytes: bytes.len() as u64,
        downloaded_at: Utc::now(),
        systems: infer_systems(&source),
        description: None,
        source,
    })
}

/// Infer which simulation systems a path or URL touches, by substring match.
pub fn infer_systems(path_or_url: &str) -> Vec<String> {
    let lower = path_or_url.to_lowercase();
    let mut systems = Vec::new();
    for (system, keywords) in SYSTEM_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            systems.push(system.to_string());
        }
    }
    systems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systems_from_path_segments() {
        assert_eq!(infer_systems("/hfs/examples/pyro/campfire.hip"), vec!["pyro"]);
        assert_eq!(infer_systems("/x/FractureDemo.hip"), vec!["rbd"]);
        assert_eq!(infer_systems("/x/ocean_waves.hipnc"), vec!["flip"]);
        assert_eq!(infer_systems("/x/cloth_drape.hip"), vec!["vellum"]);
        assert!(infer_systems("/x/modeling_basics.hip").is_empty());
    }

    #[test]
    fn multiple_systems_are_all_reported() {
        let systems = infer_systems("/demos/pyro_and_flip_mix.hip");
        assert_eq!(systems, vec!["pyro", "flip"]);
    }

    #[test]
    fn scene_file_extensions() {
        assert!(is_scene_file(Path::new("/a/b.hip")));
        assert!(is_scene_file(Path::new("/a/b.hipnc")));
        assert!(!is_scene_file(Path::new("/a/b.bgeo")));
        assert!(!is_scene_file(Path::new("/a/hip")));
    }

    #[test]
    fn scan_finds_scene_files_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("houdini20.5").join("help").join("files");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("smoke_test.hip"), b"hip one").unwrap();
        std::fs::write(nested.join("readme.txt"), b"not a scene").unwrap();
        std::fs::write(tmp.path().join("top_level.hipnc"), b"hip two").unwrap();

        let config = ScanSection {
            install_path: Some(tmp.path().to_path_buf()),
            version_dirs: Vec::new(),
        };
        let entries = scan_local_install(&config);

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == SourceKind::LocalInstall));
        let smoke = entries
            .iter()
            .find(|e| e.file_name == "smoke_test.hip")
            .unwrap();
        assert_eq!(smoke.systems, vec!["pyro"]);
        assert_eq!(
            smoke.sha256,
            hex::encode(Sha256::digest(b"hip one")),
            "hash covers the file bytes"
        );
    }

    #[test]
    fn roots_include_version_dirs() {
        let config = ScanSection {
            install_path: Some(PathBuf::from("/opt/custom")),
            version_dirs: vec!["houdini20.5".to_string()],
        };
        let roots = scan_roots(&config);
        assert!(roots.contains(&PathBuf::from("/opt/custom")));
        assert!(roots.contains(&PathBuf::from("/opt/custom/houdini20.5")));
        assert!(roots.contains(&PathBuf::from("/opt/hfs/houdini20.5")));
    }
}
