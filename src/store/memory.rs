//! In-memory record store.
//!
//! Reference implementation of the [`RecordStore`] contract backing the
//! on-device deployment and the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};

/// Map of collection name -> key -> record
type Collections = HashMap<String, HashMap<String, Value>>;

pub struct MemoryStore {
    collections: RwLock<Collections>,
    puts: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            puts: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Counters and sizes, for diagnostics
    pub async fn stats(&self) -> MemoryStoreStats {
        let collections = self.collections.read().await;
        MemoryStoreStats {
            collections: collections.len(),
            records: collections.values().map(HashMap::len).sum(),
            puts: self.puts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), record);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|records| records.remove(key));
        if removed.is_some() {
            self.deletes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Store counters
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStoreStats {
    pub collections: usize,
    pub records: usize,
    pub puts: u64,
    pub deletes: u64,
}
