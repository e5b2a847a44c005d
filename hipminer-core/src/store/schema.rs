/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for the hipminer `SQLite` database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS hip_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per ingested archive, keyed by content hash
CREATE TABLE IF NOT EXISTS hip_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    file_hash TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    source_url TEXT NOT NULL DEFAULT '',
    houdini_version TEXT NOT NULL DEFAULT '',
    description TEXT,
    systems TEXT NOT NULL DEFAULT '[]',
    node_count INTEGER NOT NULL DEFAULT 0,
    parsed_at TEXT NOT NULL,
    parse_status TEXT NOT NULL DEFAULT 'pending',
    parse_error TEXT
);
CREATE INDEX IF NOT EXISTS idx_hip_files_status ON hip_files(parse_status);
CREATE INDEX IF NOT EXISTS idx_hip_files_source ON hip_files(source);

-- One row per observed (node, parameter) pair
CREATE TABLE IF NOT EXISTS param_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hip_file_id INTEGER NOT NULL REFERENCES hip_files(id) ON DELETE CASCADE,
    node_type TEXT NOT NULL,
    node_path TEXT NOT NULL,
    param_name TEXT NOT NULL,
    param_value TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 1,
    expression TEXT
);
CREATE INDEX IF NOT EXISTS idx_snapshots_node_type ON param_snapshots(node_type);
CREATE INDEX IF NOT EXISTS idx_snapshots_param_name ON param_snapshots(param_name);
CREATE INDEX IF NOT EXISTS idx_snapshots_file ON param_snapshots(hip_file_id);
";

/// `SQLite` PRAGMAs for performance. WAL is applied separately, best-effort,
/// because in-memory databases ignore it.
pub const PRAGMAS_SQL: &str = r"
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
PRAGMA foreign_keys = ON;
";
