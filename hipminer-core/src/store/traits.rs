use crate::types::{
    HipFileId, HipFileRecord, ParamSnapshot, SnapshotValue, StoreStats,
};

/// The store abstraction the extractor and aggregator work through.
#[async_trait::async_trait]
pub trait HipStore: Send + Sync {
    /// Look up a previously ingested archive by its SHA-256.
    async fn get_hip_file_by_hash(
        &self,
        file_hash: &str,
    ) -> crate::error::Result<Option<HipFileRecord>>;

    /// Persist a successful parse: upsert the file record and replace all of
    /// its snapshots, atomically. Snapshots are inserted in document order.
    async fn record_scene(
        &self,
        record: &HipFileRecord,
        snapshots: &[ParamSnapshot],
    ) -> crate::error::Result<HipFileId>;

    /// Persist a parse failure: upsert the file record with status `error`.
    /// Existing snapshots for the hash are left untouched.
    async fn record_parse_error(&self, record: &HipFileRecord) -> crate::error::Result<HipFileId>;

    /// All file records, newest parse first.
    async fn list_hip_files(&self) -> crate::error::Result<Vec<HipFileRecord>>;

    /// Snapshots belonging to one file record, in insertion order.
    async fn snapshots_for_file(
        &self,
        id: HipFileId,
    ) -> crate::error::Result<Vec<ParamSnapshot>>;

    /// Raw snapshot values for a node type (optionally one parameter),
    /// consumed by the aggregator.
    async fn snapshot_values(
        &self,
        node_type: &str,
        param_name: Option<&str>,
    ) -> crate::error::Result<Vec<SnapshotValue>>;

    /// Summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}
