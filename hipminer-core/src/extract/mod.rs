//! Extraction — persisting parse results into the knowledge-base store.
//!
//! One archive maps to one `hip_files` row plus its parameter snapshots,
//! written inside a single transaction so a crash never leaves a half-updated
//! archive. Failed parses are recorded too, without touching snapshots.

pub mod stats;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::error::ArchiveFormatError;
use crate::parse::value::canonical_text;
use crate::store::HipStore;
use crate::types::{
    CacheEntry, ExtractionResult, HipFileId, HipFileRecord, ParamSnapshot, ParseStatus, Scene,
};

/// Persist a successfully parsed scene.
///
/// Upserts the file record keyed by the entry's SHA-256 and replaces its
/// snapshots wholesale, in document order.
#[instrument(skip_all, fields(file = %entry.file_name))]
pub async fn extract_scene(
    store: &dyn HipStore,
    scene: &Scene,
    entry: &CacheEntry,
) -> crate::error::Result<ExtractionResult> {
    let record = HipFileRecord {
        id: HipFileId(0),
        file_name: entry.file_name.clone(),
        file_hash: entry.sha256.clone(),
        source: entry.kind,
        source_url: entry.source.clone(),
        houdini_version: scene.hip_version.clone(),
        description: entry.description.clone(),
        systems: entry.systems.clone(),
        node_count: scene.nodes.len() as u32,
        parsed_at: Utc::now(),
        parse_status: ParseStatus::Success,
        parse_error: None,
    };

    let mut result = ExtractionResult {
        nodes: scene.nodes.len() as u64,
        ..ExtractionResult::default()
    };

    let mut snapshots = Vec::new();
    for node in &scene.nodes {
        for parameter in &node.parameters {
            result.parameters += 1;
            if !parameter.is_default {
                result.non_default += 1;
            }
            if parameter.expression.is_some() {
                result.expressions += 1;
            }
            snapshots.push(ParamSnapshot {
                node_type: node.node_type.clone(),
                node_path: node.path.clone(),
                param_name: parameter.name.clone(),
                param_value: canonical_text(&parameter.value),
                is_default: parameter.is_default,
                expression: parameter.expression.clone(),
            });
        }
    }

    store.record_scene(&record, &snapshots).await?;

    info!(
        nodes = result.nodes,
        parameters = result.parameters,
        non_default = result.non_default,
        "Extracted scene"
    );
    Ok(result)
}

/// Record a format failure for an archive. Snapshots are left untouched.
pub async fn record_failure(
    store: &dyn HipStore,
    entry: &CacheEntry,
    error: &ArchiveFormatError,
) -> crate::error::Result<()> {
    let record = HipFileRecord {
        id: HipFileId(0),
        file_name: entry.file_name.clone(),
        file_hash: entry.sha256.clone(),
        source: entry.kind,
        source_url: entry.source.clone(),
        houdini_version: String::new(),
        description: entry.description.clone(),
        systems: entry.systems.clone(),
        node_count: 0,
        parsed_at: Utc::now(),
        parse_status: ParseStatus::Error,
        parse_error: Some(error.to_string()),
    };
    store.record_parse_error(&record).await?;
    Ok(())
}

/// True when this archive was already ingested successfully — re-extraction
/// of an unchanged archive is a no-op, detected before any parsing happens.
pub async fn already_ingested(
    store: &dyn HipStore,
    file_hash: &str,
) -> crate::error::Result<bool> {
    let existing = store.get_hip_file_by_hash(file_hash).await?;
    let done = matches!(
        existing,
        Some(record) if record.parse_status == ParseStatus::Success
    );
    if done {
        debug!(hash = %&file_hash[..file_hash.len().min(12)], "Archive already ingested");
    }
    Ok(done)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::store::sqlite::SqliteStore;
    use crate::types::{NodeCategory, Parameter, ParamValue, SceneNode, SourceKind};

    use super::*;

    fn test_entry(hash: &str) -> CacheEntry {
        CacheEntry {
            source: "https://example.com/fire.hip".to_string(),
            kind: SourceKind::ContentLibrary,
            local_path: "/tmp/cache/fire.hip".into(),
            file_name: "fire.hip".to_string(),
            sha256: hash.to_string(),
            size_bytes: 100,
            downloaded_at: Utc::now(),
            systems: vec!["pyro".to_string()],
            description: None,
        }
    }

    fn test_scene() -> Scene {
        let mut node = SceneNode {
            path: "/obj/geo1/pyro1".to_string(),
            node_type: "pyrosolver::2.0".to_string(),
            category: NodeCategory::Dop,
            name: "pyro1".to_string(),
            parameters: Vec::new(),
            flags: Default::default(),
        };
        node.parameters.push(Parameter::new(
            "dissipation",
            ParamValue::Float(0.05),
        ));
        let mut cooling = Parameter::new("cooling_rate", ParamValue::Float(0.3));
        cooling.is_default = false;
        node.parameters.push(cooling);
        let mut animated = Parameter::new("temp_scale", ParamValue::Float(1.0));
        animated.is_default = false;
        animated.expression = Some("$F / 24".to_string());
        node.parameters.push(animated);

        Scene {
            hip_version: "20.5.332".to_string(),
            nodes: vec![node],
            ..Scene::default()
        }
    }

    #[tokio::test]
    async fn extract_persists_record_and_snapshots() {
        let store = SqliteStore::in_memory().unwrap();
        let result = extract_scene(&store, &test_scene(), &test_entry("hash1"))
            .await
            .unwrap();

        assert_eq!(result.nodes, 1);
        assert_eq!(result.parameters, 3);
        assert_eq!(result.non_default, 2);
        assert_eq!(result.expressions, 1);

        let record = store.get_hip_file_by_hash("hash1").await.unwrap().unwrap();
        assert_eq!(record.parse_status, ParseStatus::Success);
        assert_eq!(record.node_count, 1);
        assert_eq!(record.houdini_version, "20.5.332");

        let snapshots = store.snapshots_for_file(record.id).await.unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].param_name, "dissipation");
        assert_eq!(snapshots[0].param_value, "0.05");
        assert!(snapshots[0].is_default);
        assert_eq!(snapshots[2].expression.as_deref(), Some("$F / 24"));
    }

    #[tokio::test]
    async fn re_extraction_yields_identical_snapshots() {
        let store = SqliteStore::in_memory().unwrap();
        let scene = test_scene();
        let entry = test_entry("hash2");

        extract_scene(&store, &scene, &entry).await.unwrap();
        let record = store.get_hip_file_by_hash("hash2").await.unwrap().unwrap();
        let first = store.snapshots_for_file(record.id).await.unwrap();

        extract_scene(&store, &scene, &entry).await.unwrap();
        let second = store.snapshots_for_file(record.id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failure_is_recorded_with_message() {
        let store = SqliteStore::in_memory().unwrap();
        let error = ArchiveFormatError::NoMagic;
        record_failure(&store, &test_entry("hash3"), &error)
            .await
            .unwrap();

        let record = store.get_hip_file_by_hash("hash3").await.unwrap().unwrap();
        assert_eq!(record.parse_status, ParseStatus::Error);
        assert!(record.parse_error.unwrap().contains("CPIO magic"));
        assert_eq!(record.node_count, 0);
    }

    #[tokio::test]
    async fn idempotence_check_detects_success_only() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!already_ingested(&store, "hash4").await.unwrap());

        record_failure(&store, &test_entry("hash4"), &ArchiveFormatError::NoMagic)
            .await
            .unwrap();
        assert!(
            !already_ingested(&store, "hash4").await.unwrap(),
            "failed archives are retried"
        );

        extract_scene(&store, &test_scene(), &test_entry("hash4"))
            .await
            .unwrap();
        assert!(already_ingested(&store, "hash4").await.unwrap());
    }
}
