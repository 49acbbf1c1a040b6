//! Two-pass CSV reader
//!
//! The first pass counts data rows, the second yields them one at a time.
//! Neither pass holds more than one record in memory. A [`RowStream`] is
//! forward-only; traversing the file again means calling [`CsvSource::open`]
//! again.

use csv_async::{AsyncReaderBuilder, ByteRecord, StringRecord};
use futures::stream::{BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::error::IngestResult;
use super::models::RawRow;

/// A comma-delimited file with a header row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn builder() -> AsyncReaderBuilder {
        let mut builder = AsyncReaderBuilder::new();
        builder.has_headers(true).flexible(true);
        builder
    }

    /// Count data rows, excluding the header
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn count_rows(&self) -> IngestResult<u64> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut reader = Self::builder().create_reader(file);

        let mut record = ByteRecord::new();
        let mut count = 0u64;
        while reader.read_byte_record(&mut record).await? {
            count += 1;
        }

        debug!(rows = count, "Counted CSV rows");
        Ok(count)
    }

    /// Open the file for the streaming pass
    pub async fn open(&self) -> IngestResult<RowStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut reader = Self::builder().create_reader(file);

        let headers: Arc<[String]> = reader
            .headers()
            .await?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(RowStream {
            headers,
            records: reader.into_records().boxed(),
        })
    }
}

/// Forward-only sequence of rows from one open file
pub struct RowStream {
    headers: Arc<[String]>,
    records: BoxStream<'static, csv_async::Result<StringRecord>>,
}

impl RowStream {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Next row, or `None` once the file is exhausted
    pub async fn next_row(&mut self) -> Option<IngestResult<RawRow>> {
        let next = self.records.next().await?;
        Some(
            next.map(|values| RawRow::new(Arc::clone(&self.headers), values))
                .map_err(Into::into),
        )
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_count_excludes_header() {
        let file = csv_file("sku,name,price\na,Apple,1\nb,Banana,2\nc,Cherry,3\n");
        let source = CsvSource::new(file.path());
        assert_eq!(source.count_rows().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_header_only_counts_zero() {
        let file = csv_file("sku,name,price\n");
        let source = CsvSource::new(file.path());
        assert_eq!(source.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_rows_in_order() {
        let file = csv_file("sku,name\na,Apple\nb,Banana\n");
        let source = CsvSource::new(file.path());
        let mut rows = source.open().await.unwrap();
        assert_eq!(rows.headers(), &["sku".to_string(), "name".to_string()]);

        let first = rows.next_row().await.unwrap().unwrap();
        assert_eq!(first.get("sku"), Some("a"));
        let second = rows.next_row().await.unwrap().unwrap();
        assert_eq!(second.get("name"), Some("Banana"));
        assert!(rows.next_row().await.is_none());
    }

    #[tokio::test]
    async fn test_reopen_starts_from_beginning() {
        let file = csv_file("sku\nx\ny\n");
        let source = CsvSource::new(file.path());

        let mut first = source.open().await.unwrap();
        while first.next_row().await.is_some() {}

        let mut second = source.open().await.unwrap();
        let row = second.next_row().await.unwrap().unwrap();
        assert_eq!(row.get("sku"), Some("x"));
    }

    #[tokio::test]
    async fn test_quoted_fields_with_commas() {
        let file = csv_file("sku,description\na,\"red, large\"\n");
        let source = CsvSource::new(file.path());
        assert_eq!(source.count_rows().await.unwrap(), 1);

        let mut rows = source.open().await.unwrap();
        let row = rows.next_row().await.unwrap().unwrap();
        assert_eq!(row.get("description"), Some("red, large"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = CsvSource::new("/definitely/not/here.csv");
        let err = source.count_rows().await.unwrap_err();
        assert!(matches!(err, crate::ingest::IngestError::Io(_)));
    }
}
