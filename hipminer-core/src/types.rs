use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Typed ID wrappers ──────────────────────────────────────────────

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(HipFileId);

// ── Archive types ──────────────────────────────────────────────────

/// One member of a CPIO archive, immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File path as stored in the archive (UTF-8, lossy-decoded).
    pub path: String,
    /// Raw mode bits from the header.
    pub mode: u32,
    /// Declared payload size in bytes.
    pub size: u64,
    /// Payload bytes.
    pub data: Vec<u8>,
}

// ── Scene types ────────────────────────────────────────────────────

/// Houdini node context. `SOP` is the default when nothing else matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeCategory {
    Obj,
    #[default]
    Sop,
    Dop,
    Vop,
    Chop,
    Cop,
    Rop,
    Lop,
    Top,
}

impl NodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Obj => "OBJ",
            Self::Sop => "SOP",
            Self::Dop => "DOP",
            Self::Vop => "VOP",
            Self::Chop => "CHOP",
            Self::Cop => "COP",
            Self::Rop => "ROP",
            Self::Lop => "LOP",
            Self::Top => "TOP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OBJ" => Some(Self::Obj),
            "SOP" => Some(Self::Sop),
            "DOP" => Some(Self::Dop),
            "VOP" => Some(Self::Vop),
            "CHOP" => Some(Self::Chop),
            "COP" => Some(Self::Cop),
            "ROP" => Some(Self::Rop),
            "LOP" => Some(Self::Lop),
            "TOP" => Some(Self::Top),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value as observed in a scene file: scalar, vector, or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f64),
    FloatSeq(Vec<f64>),
    Text(String),
}

/// One parameter of a scene node.
///
/// Invariant: a parameter with an expression always has `is_default == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
    pub is_default: bool,
    pub expression: Option<String>,
    pub channel_ref: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
            is_default: true,
            expression: None,
            channel_ref: None,
        }
    }
}

/// A node reconstructed from a scene archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// Absolute path of the form `/seg1/seg2/...`.
    pub path: String,
    /// Type identifier, possibly with a `::version` suffix.
    pub node_type: String,
    pub category: NodeCategory,
    /// Local name — the last path segment.
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub flags: HashMap<String, bool>,
}

/// A directed edge between two node connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from_path: String,
    pub from_output: u32,
    pub to_path: String,
    pub to_input: u32,
}

/// The result of parsing one archive. Always returned, possibly empty —
/// malformed stanzas are skipped, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Houdini version string, empty when the archive doesn't declare one.
    pub hip_version: String,
    /// Save timestamp as written in the file, empty when absent.
    pub save_time: String,
    /// Freeform header metadata, last write wins.
    pub metadata: HashMap<String, String>,
    pub nodes: Vec<SceneNode>,
    pub connections: Vec<Connection>,
}

// ── Cache types ────────────────────────────────────────────────────

/// Where an archive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ContentLibrary,
    Examples,
    LocalInstall,
    Community,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentLibrary => "content_library",
            Self::Examples => "examples",
            Self::LocalInstall => "local_install",
            Self::Community => "community",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "content_library" => Some(Self::ContentLibrary),
            "examples" => Some(Self::Examples),
            "local_install" => Some(Self::LocalInstall),
            "community" => Some(Self::Community),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cached archive: the pairing of a source identifier and a local blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source URL or local path this entry was acquired from.
    pub source: String,
    pub kind: SourceKind,
    /// Path of the blob on disk. For `local_install` entries this is the
    /// original file — no copy is made.
    pub local_path: PathBuf,
    /// Original filename before sanitization.
    pub file_name: String,
    /// SHA-256 over the full file bytes, lowercase hex.
    pub sha256: String,
    pub size_bytes: u64,
    pub downloaded_at: DateTime<Utc>,
    /// Simulation systems inferred from the path or description
    /// (`pyro`, `rbd`, `flip`, `vellum`, ...).
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ── Store types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Pending,
    Success,
    Error,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted identity of a parsed (or failed) archive, keyed by SHA-256.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HipFileRecord {
    pub id: HipFileId,
    pub file_name: String,
    /// SHA-256 over the archive bytes — the stable identity across runs.
    pub file_hash: String,
    pub source: SourceKind,
    pub source_url: String,
    pub houdini_version: String,
    pub description: Option<String>,
    pub systems: Vec<String>,
    pub node_count: u32,
    pub parsed_at: DateTime<Utc>,
    pub parse_status: ParseStatus,
    pub parse_error: Option<String>,
}

/// One observed (node, parameter) pair from a specific archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub node_type: String,
    pub node_path: String,
    pub param_name: String,
    /// Canonical text encoding of the observed value.
    pub param_value: String,
    pub is_default: bool,
    pub expression: Option<String>,
}

/// Raw snapshot row used by the aggregator — value still in text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotValue {
    pub param_name: String,
    pub param_value: String,
    pub is_default: bool,
}

/// Aggregate over the numerically parseable snapshots of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamStats {
    pub node_type: String,
    pub param_name: String,
    pub sample_count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Rows where the author moved the parameter off its default.
    pub modified_count: u64,
    /// The central 80% of the observed interval, clamped to `[min, max]`.
    pub usage_range: (f64, f64),
}

/// Counters returned by a single scene extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub nodes: u64,
    pub parameters: u64,
    pub non_default: u64,
    pub expressions: u64,
    pub errors: Vec<String>,
}

/// Summary statistics for the store, consumed by the status command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_files: u64,
    pub parsed_ok: u64,
    pub parse_failed: u64,
    pub total_snapshots: u64,
    pub files_by_source: HashMap<String, u64>,
    pub db_size_bytes: u64,
}

// ── Tests ──────────────────────────────────────────────────────────
