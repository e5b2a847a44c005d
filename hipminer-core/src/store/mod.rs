//! Persistent knowledge-base store.
//!
//! Two tables: one row per ingested archive (`hip_files`, keyed by SHA-256)
//! and one row per observed parameter (`param_snapshots`). Snapshots are
//! replaced as a unit per archive inside a single transaction.

pub mod schema;
pub mod sqlite;
mod traits;

pub use traits::HipStore;
