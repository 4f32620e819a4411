//! Idempotent record writes.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument};

use dex_common::{NormalizedRecord, PersistenceResult};
use storage::RecordStore;

/// Writes normalized records by id through a shared [`RecordStore`].
#[derive(Clone)]
pub struct UpsertSink {
    store: Arc<dyn RecordStore>,
}

impl UpsertSink {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Insert `record`, or overwrite the stored record with the same id.
    #[instrument(skip(self, record), fields(id = record.id))]
    pub async fn upsert(&self, record: &NormalizedRecord) -> PersistenceResult<()> {
        self.store.upsert(record).await?;

        counter!("ingest_records_upserted_total").increment(1);
        debug!("Record persisted");
        Ok(())
    }
}
