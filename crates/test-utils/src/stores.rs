//! In-memory asset and record stores with call counters.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use dex_common::{NormalizedRecord, PersistenceError, PersistenceResult, StoreError};
use storage::{AssetStore, RecordStore};

/// Asset store kept in a map. Optionally fails every `put`.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: Mutex<HashMap<String, Bytes>>,
    puts: AtomicUsize,
    fail_puts: bool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail with an I/O error.
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    /// Pre-populate `key`.
    pub fn with_asset(self, key: &str, data: impl Into<Bytes>) -> Self {
        self.assets
            .lock()
            .unwrap()
            .insert(key.to_string(), data.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.assets.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls, including failed ones.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.assets.lock().unwrap().contains_key(key))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only asset store",
            )));
        }
        self.assets.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let mut assets = self.assets.lock().unwrap();
        let removed = assets.len();
        assets.clear();
        Ok(removed)
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Record store kept in an ordered map. Optionally rejects chosen ids.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<i64, NormalizedRecord>>,
    upserts: AtomicUsize,
    reject_ids: HashSet<i64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts of these ids fail with a query error.
    pub fn rejecting(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            reject_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Number of successful upserts.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Every stored record ordered by id.
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn migrate(&self) -> PersistenceResult<()> {
        Ok(())
    }

    async fn upsert(&self, record: &NormalizedRecord) -> PersistenceResult<()> {
        if self.reject_ids.contains(&record.id) {
            return Err(PersistenceError::Query(format!(
                "Upsert failed: id {} rejected",
                record.id
            )));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, id: i64) -> PersistenceResult<Option<NormalizedRecord>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn count(&self) -> PersistenceResult<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn list(&self, limit: u32, offset: u32) -> PersistenceResult<Vec<NormalizedRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> PersistenceResult<u64> {
        let mut records = self.records.lock().unwrap();
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}
