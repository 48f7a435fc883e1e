//! Download records and the store seam.
//!
//! The record store belongs to the host application; this crate only reads
//! snapshots through [`RecordStore`]. [`InMemoryRecordStore`] serves callers
//! without a database (the CLI) and tests.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Snapshot of a completed download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Opaque download identifier.
    pub gid: String,
    /// Where the downloaded file landed.
    pub path: PathBuf,
    /// Reported size as persisted by the download layer (`"12.50 GiB"`).
    pub size: String,
}

/// Read-only lookup into the download record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record for `gid`, or `None` when no download matches.
    async fn get(&self, gid: &str) -> Option<DownloadRecord>;
}

/// Store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, DownloadRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: DownloadRecord) {
        self.records
            .write()
            .await
            .insert(record.gid.clone(), record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, gid: &str) -> Option<DownloadRecord> {
        self.records.read().await.get(gid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_returns_inserted_snapshot() {
        let store = InMemoryRecordStore::new();
        store
            .insert(DownloadRecord {
                gid: "g1".to_string(),
                path: PathBuf::from("/dl/movie.webm"),
                size: "2 KiB".to_string(),
            })
            .await;

        let record = store.get("g1").await.unwrap();
        assert_eq!(record.path, PathBuf::from("/dl/movie.webm"));
        assert_eq!(store.get("g2").await, None);
    }
}
