//! Record sink backends
//!
//! A sink applies one batch of records as a single conditional upsert keyed
//! by SKU: new keys are inserted, existing keys have every non-key column
//! overwritten. A batch either applies completely or not at all, and applying
//! the same batch twice leaves the same state as applying it once.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use super::error::{IngestError, IngestResult};
use super::models::{ImportRecord, ProductAttributes};

/// Destination for imported records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Upsert `records` atomically, returning the number of records written
    ///
    /// Callers must not pass two records with the same SKU in one batch.
    async fn upsert_batch(&self, records: &[ImportRecord]) -> IngestResult<u64>;
}

/// Postgres-backed sink writing to the `products` table
#[derive(Clone)]
pub struct PgRecordSink {
    db: PgPool,
}

impl PgRecordSink {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    #[tracing::instrument(skip(self, records), fields(records = records.len()))]
    async fn upsert_batch(&self, records: &[ImportRecord]) -> IngestResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        // Rolled back on drop if the insert fails
        let mut tx = self.db.begin().await?;

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO products (sku, name, description, price, active)
            "#,
        );

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(&record.sku)
                .push_bind(&record.attributes.name)
                .push_bind(&record.attributes.description)
                .push_bind(record.attributes.price)
                .push_bind(record.attributes.active);
        });

        // Postgres rejects a statement that touches the same conflict key twice
        query_builder.push(
            r#"
            ON CONFLICT (sku)
            DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                active = EXCLUDED.active,
                updated_at = NOW()
            "#,
        );

        let result = query_builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        debug!(rows_affected = result.rows_affected(), "Upserted product batch");
        Ok(records.len() as u64)
    }
}

/// In-memory sink for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Mutex<BTreeMap<String, ProductAttributes>>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `n`th call to `upsert_batch` (1-based)
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn get(&self, sku: &str) -> Option<ProductAttributes> {
        self.records.lock().ok()?.get(sku).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored records, ordered by SKU
    pub fn snapshot(&self) -> BTreeMap<String, ProductAttributes> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `upsert_batch` calls, including rejected ones
    pub fn upsert_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn upsert_batch(&self, records: &[ImportRecord]) -> IngestResult<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(IngestError::Sink(format!("batch {} rejected", call)));
        }

        let mut store = self
            .records
            .lock()
            .map_err(|_| IngestError::Sink("record store lock poisoned".to_string()))?;

        // Validate before touching the store so a rejected batch changes nothing
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.sku.as_str()) {
                return Err(IngestError::Sink(format!(
                    "duplicate key '{}' in one batch",
                    record.sku
                )));
            }
        }

        for record in records {
            store.insert(record.sku.clone(), record.attributes.clone());
        }
        Ok(records.len() as u64)
    }
}
