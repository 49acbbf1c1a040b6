//! Batch accumulation, deduplication and flushing
//!
//! Records are buffered up to the batch capacity. On flush, records sharing a
//! SKU inside the buffer collapse to the last one seen, and the result goes to
//! the sink as one upsert. Duplicates in different batches are not merged;
//! the later batch simply overwrites the earlier one in the sink.

use std::collections::HashMap;
use tracing::debug;

use super::error::IngestResult;
use super::models::ImportRecord;
use super::sink::RecordSink;

/// Collapse records sharing a SKU, keeping the last value for each
///
/// Keys stay in order of first appearance.
pub fn dedup_last_write_wins(records: Vec<ImportRecord>) -> Vec<ImportRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut deduped: Vec<ImportRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.sku) {
            Some(&idx) => deduped[idx] = record,
            None => {
                positions.insert(record.sku.clone(), deduped.len());
                deduped.push(record);
            }
        }
    }

    deduped
}

/// Buffers records and flushes them to a sink in bounded batches
pub struct BatchUpserter<'a> {
    sink: &'a dyn RecordSink,
    capacity: usize,
    pending: Vec<ImportRecord>,
    processed: u64,
    duplicates_collapsed: u64,
    batches_flushed: u64,
}

impl<'a> BatchUpserter<'a> {
    pub fn new(sink: &'a dyn RecordSink, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sink,
            capacity,
            pending: Vec::with_capacity(capacity),
            processed: 0,
            duplicates_collapsed: 0,
            batches_flushed: 0,
        }
    }

    /// Add a record, flushing when the buffer reaches capacity
    ///
    /// Returns the new cumulative processed count when a flush happened.
    pub async fn push(&mut self, record: ImportRecord) -> IngestResult<Option<u64>> {
        self.pending.push(record);
        if self.pending.len() >= self.capacity {
            return self.flush().await;
        }
        Ok(None)
    }

    /// Flush whatever is buffered
    pub async fn finish(&mut self) -> IngestResult<Option<u64>> {
        self.flush().await
    }

    async fn flush(&mut self) -> IngestResult<Option<u64>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let raw = std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
        let raw_len = raw.len();
        let batch = dedup_last_write_wins(raw);
        let collapsed = (raw_len - batch.len()) as u64;

        self.sink.upsert_batch(&batch).await?;

        self.processed += batch.len() as u64;
        self.duplicates_collapsed += collapsed;
        self.batches_flushed += 1;

        debug!(
            batch = self.batches_flushed,
            distinct = batch.len(),
            collapsed,
            processed = self.processed,
            "Flushed batch"
        );

        Ok(Some(self.processed))
    }

    /// Distinct records flushed so far
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn duplicates_collapsed(&self) -> u64 {
        self.duplicates_collapsed
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed
    }

    /// Records buffered but not yet flushed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::models::ProductAttributes;
    use crate::ingest::sink::MemoryRecordSink;

    fn record(sku: &str, price: f64) -> ImportRecord {
        ImportRecord::new(
            sku,
            ProductAttributes {
                price: Some(price),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_dedup_keeps_last_value_in_first_position() {
        let deduped = dedup_last_write_wins(vec![
            record("a", 1.0),
            record("b", 2.0),
            record("a", 3.0),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].sku, "a");
        assert_eq!(deduped[0].attributes.price, Some(3.0));
        assert_eq!(deduped[1].sku, "b");
    }

    #[tokio::test]
    async fn test_case_folded_keys_collapse() {
        let sink = MemoryRecordSink::new();
        let mut upserter = BatchUpserter::new(&sink, 5000);

        upserter.push(record("A", 10.0)).await.unwrap();
        upserter.push(record("a", 20.0)).await.unwrap();
        assert_eq!(upserter.finish().await.unwrap(), Some(1));

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("a").unwrap().price, Some(20.0));
        assert_eq!(upserter.duplicates_collapsed(), 1);
    }

    #[tokio::test]
    async fn test_flushes_at_capacity() {
        let sink = MemoryRecordSink::new();
        let mut upserter = BatchUpserter::new(&sink, 2);

        assert_eq!(upserter.push(record("a", 1.0)).await.unwrap(), None);
        assert_eq!(upserter.push(record("b", 1.0)).await.unwrap(), Some(2));
        assert_eq!(upserter.push(record("c", 1.0)).await.unwrap(), None);
        assert_eq!(upserter.pending(), 1);
        assert_eq!(upserter.finish().await.unwrap(), Some(3));
        assert_eq!(upserter.batches_flushed(), 2);
        assert_eq!(sink.upsert_calls(), 2);
    }

    #[tokio::test]
    async fn test_cross_batch_duplicates_both_apply() {
        let sink = MemoryRecordSink::new();
        let mut upserter = BatchUpserter::new(&sink, 2);

        upserter.push(record("a", 1.0)).await.unwrap();
        upserter.push(record("b", 1.0)).await.unwrap();
        upserter.push(record("a", 9.0)).await.unwrap();
        upserter.finish().await.unwrap();

        // Counted once per flush
        assert_eq!(upserter.processed(), 3);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.get("a").unwrap().price, Some(9.0));
    }

    #[tokio::test]
    async fn test_finish_without_records_skips_sink() {
        let sink = MemoryRecordSink::new();
        let mut upserter = BatchUpserter::new(&sink, 10);
        assert_eq!(upserter.finish().await.unwrap(), None);
        assert_eq!(sink.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_count() {
        let sink = MemoryRecordSink::failing_on_call(2);
        let mut upserter = BatchUpserter::new(&sink, 1);

        assert_eq!(upserter.push(record("a", 1.0)).await.unwrap(), Some(1));
        assert!(upserter.push(record("b", 1.0)).await.is_err());
        assert_eq!(upserter.processed(), 1);
    }
}
