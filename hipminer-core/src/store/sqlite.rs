use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{HipError, StoreError};
use crate::types::{
    HipFileId, HipFileRecord, ParamSnapshot, ParseStatus, SnapshotValue, SourceKind, StoreStats,
};

use super::HipStore;
use super::schema;

/// SQLite-backed implementation of `HipStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(schema::PRAGMAS_SQL)
            .map_err(StoreError::Sqlite)?;

        // WAL is silently ignored for in-memory databases.
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO hip_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        Ok(())
    }

    /// Helper: read a full file record from a row.
    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<HipFileRecord> {
        let source_str: String = row.get("source")?;
        let status_str: String = row.get("parse_status")?;
        let systems_str: String = row.get("systems")?;
        let parsed_at_str: String = row.get("parsed_at")?;

        Ok(HipFileRecord {
            id: HipFileId(row.get("id")?),
            file_name: row.get("file_name")?,
            file_hash: row.get("file_hash")?,
            source: SourceKind::parse(&source_str).unwrap_or(SourceKind::Community),
            source_url: row.get("source_url")?,
            houdini_version: row.get("houdini_version")?,
            description: row.get("description")?,
            systems: serde_json::from_str(&systems_str).unwrap_or_default(),
            node_count: row.get("node_count")?,
            parsed_at: DateTime::parse_from_rfc3339(&parsed_at_str)
                .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
            parse_status: ParseStatus::parse(&status_str).unwrap_or(ParseStatus::Pending),
            parse_error: row.get("parse_error")?,
        })
    }

    /// Upsert a file record within an open transaction, returning its id.
    ///
    /// The actual id is re-queried because `last_insert_rowid()` is
    /// unreliable after `ON CONFLICT DO UPDATE`.
    fn upsert_record_tx(
        tx: &rusqlite::Transaction<'_>,
        record: &HipFileRecord,
    ) -> Result<i64, StoreError> {
        let systems_json =
            serde_json::to_string(&record.systems).map_err(StoreError::Serialization)?;
        tx.execute(
            "INSERT INTO hip_files
                (file_name, file_hash, source, source_url, houdini_version,
                 description, systems, node_count, parsed_at, parse_status, parse_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(file_hash) DO UPDATE SET
                file_name = excluded.file_name,
                source = excluded.source,
                source_url = excluded.source_url,
                houdini_version = excluded.houdini_version,
                description = excluded.description,
                systems = excluded.systems,
                node_count = excluded.node_count,
                parsed_at = excluded.parsed_at,
                parse_status = excluded.parse_status,
                parse_error = excluded.parse_error",
            params![
                record.file_name,
                record.file_hash,
                record.source.as_str(),
                record.source_url,
                record.houdini_version,
                record.description,
                systems_json,
                record.node_count,
                record.parsed_at.to_rfc3339(),
                record.parse_status.as_str(),
                record.parse_error,
            ],
        )
        .map_err(StoreError::Sqlite)?;

        tx.query_row(
            "SELECT id FROM hip_files WHERE file_hash = ?1",
            params![record.file_hash],
            |row| row.get(0),
        )
        .map_err(StoreError::Sqlite)
    }
}

#[async_trait::async_trait]
impl HipStore for SqliteStore {
    async fn get_hip_file_by_hash(
        &self,
        file_hash: &str,
    ) -> crate::error::Result<Option<HipFileRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM hip_files WHERE file_hash = ?1",
            params![file_hash],
            Self::row_to_record,
        )
        .optional()
        .map_err(StoreError::Sqlite)
        .map_err(HipError::Store)
    }

    async fn record_scene(
        &self,
        record: &HipFileRecord,
        snapshots: &[ParamSnapshot],
    ) -> crate::error::Result<HipFileId> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(StoreError::Sqlite)?;

        let file_id = Self::upsert_record_tx(&tx, record)?;

        tx.execute(
            "DELETE FROM param_snapshots WHERE hip_file_id = ?1",
            params![file_id],
        )
        .map_err(StoreError::Sqlite)?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO param_snapshots
                        (hip_file_id, node_type, node_path, param_name,
                         param_value, is_default, expression)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(StoreError::Sqlite)?;
            for snapshot in snapshots {
                stmt.execute(params![
                    file_id,
                    snapshot.node_type,
                    snapshot.node_path,
                    snapshot.param_name,
                    snapshot.param_value,
                    snapshot.is_default,
                    snapshot.expression,
                ])
                .map_err(StoreError::Sqlite)?;
            }
        }

        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(HipFileId(file_id))
    }

    async fn record_parse_error(&self, record: &HipFileRecord) -> crate::error::Result<HipFileId> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(StoreError::Sqlite)?;
        let file_id = Self::upsert_record_tx(&tx, record)?;
        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(HipFileId(file_id))
    }

    async fn list_hip_files(&self) -> crate::error::Result<Vec<HipFileRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM hip_files ORDER BY parsed_at DESC")
            .map_err(StoreError::Sqlite)?;
        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(records)
    }

    async fn snapshots_for_file(
        &self,
        id: HipFileId,
    ) -> crate::error::Result<Vec<ParamSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT node_type, node_path, param_name, param_value, is_default, expression
                 FROM param_snapshots WHERE hip_file_id = ?1 ORDER BY id",
            )
            .map_err(StoreError::Sqlite)?;
        let snapshots = stmt
            .query_map(params![id.0], |row| {
                Ok(ParamSnapshot {
                    node_type: row.get(0)?,
                    node_path: row.get(1)?,
                    param_name: row.get(2)?,
                    param_value: row.get(3)?,
                    is_default: row.get(4)?,
                    expression: row.get(5)?,
                })
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(snapshots)
    }

    async fn snapshot_values(
        &self,
        node_type: &str,
        param_name: Option<&str>,
    ) -> crate::error::Result<Vec<SnapshotValue>> {
        let conn = self.conn.lock().unwrap();

        let (sql, bind_param): (&str, bool) = match param_name {
            Some(_) => (
                "SELECT param_name, param_value, is_default FROM param_snapshots
                 WHERE node_type = ?1 AND param_name = ?2 ORDER BY id",
                true,
            ),
            None => (
                "SELECT param_name, param_value, is_default FROM param_snapshots
                 WHERE node_type = ?1 ORDER BY id",
                false,
            ),
        };

        let mut stmt = conn.prepare(sql).map_err(StoreError::Sqlite)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(SnapshotValue {
                param_name: row.get(0)?,
                param_value: row.get(1)?,
                is_default: row.get(2)?,
            })
        };
        let rows = if bind_param {
            stmt.query_map(params![node_type, param_name.unwrap()], map_row)
                .map_err(StoreError::Sqlite)?
                .collect::<rusqlite::Result<Vec<_>>>()
        } else {
            stmt.query_map(params![node_type], map_row)
                .map_err(StoreError::Sqlite)?
                .collect::<rusqlite::Result<Vec<_>>>()
        }
        .map_err(StoreError::Sqlite)?;

        Ok(rows)
    }

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.conn.lock().unwrap();

        let total_files: u64 = conn
            .query_row("SELECT COUNT(*) FROM hip_files", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let parsed_ok: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM hip_files WHERE parse_status = 'success'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        let parse_failed: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM hip_files WHERE parse_status = 'error'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        let total_snapshots: u64 = conn
            .query_row("SELECT COUNT(*) FROM param_snapshots", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT source, COUNT(*) FROM hip_files GROUP BY source")
            .map_err(StoreError::Sqlite)?;
        let files_by_source: HashMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let page_count: u64 = conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: u64 = conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(0);

        Ok(StoreStats {
            total_files,
            parsed_ok,
            parse_failed,
            total_snapshots,
            files_by_source,
            db_size_bytes: page_count * page_size,
        })
    }
}
