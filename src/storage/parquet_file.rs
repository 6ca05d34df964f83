//! Parquet file writing and reading

use super::ensure_dir;
use crate::error::PlatformError;
use crate::etl::Loader;
use crate::settings::Settings;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use eyre::{Context, Result};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Write a table to a Parquet file, replacing any existing file
///
/// The parent directory is created if needed. The write is not atomic: a
/// failure part way through can leave a truncated file behind.
pub fn write_parquet(table: &RecordBatch, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create Parquet file: {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))?;
    writer
        .write(table)
        .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
    writer.close()?;

    Ok(path.to_path_buf())
}

/// Read a Parquet file back into a single table
pub fn read_parquet(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PlatformError::NotFound(path.to_path_buf()).into());
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to open Parquet file: {}", path.display()));
        }
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read Parquet metadata: {}", path.display()))?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;

    Ok(concat_batches(&schema, &batches)?)
}

/// Write `table` as `file_name` inside the processed directory
///
/// Returns the path written.
pub fn load_parquet(settings: &Settings, table: &RecordBatch, file_name: &str) -> Result<PathBuf> {
    let path = settings.processed_path(file_name);
    log::info!("Writing Parquet to {}", path.display());
    write_parquet(table, &path)
}

/// Loads a table into one Parquet file
pub struct ParquetWriter {
    path: PathBuf,
}

impl ParquetWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Writer for `file_name` inside the configured processed directory
    pub fn processed(settings: &Settings, file_name: &str) -> Self {
        Self::new(settings.processed_path(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for ParquetWriter {
    type Item = RecordBatch;
    type Output = PathBuf;

    async fn load(&self, item: Self::Item) -> Result<Self::Output> {
        log::info!("Writing Parquet to {}", self.path.display());
        write_parquet(&item, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_table() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
            (
                "email",
                Arc::new(StringArray::from(vec![Some("a@test.com"), None, Some("c@test.com")]))
                    as ArrayRef,
            ),
            ("score", Arc::new(Float64Array::from(vec![0.5, 1.5, 2.5])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.parquet");
        let table = sample_table();

        write_parquet(&table, &path).unwrap();
        let back = read_parquet(&path).unwrap();

        assert_eq!(back.num_rows(), table.num_rows());
        assert_eq!(back.schema().fields(), table.schema().fields());
        assert_eq!(back.columns(), table.columns());
    }

    #[test]
    fn test_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.parquet");
        std::fs::write(&path, "stale contents").unwrap();

        let table = sample_table();
        write_parquet(&table, &path).unwrap();

        assert_eq!(read_parquet(&path).unwrap().num_rows(), 3);
    }

    #[test]
    fn test_load_parquet_creates_processed_dir() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());
        assert!(!settings.processed_dir.exists());

        let path = load_parquet(&settings, &sample_table(), "output.parquet").unwrap();
        assert_eq!(path, settings.processed_dir.join("output.parquet"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_loader_leaves_input_untouched() {
        let temp = TempDir::new().unwrap();
        let loader = ParquetWriter::new(temp.path().join("nested/out.parquet"));
        let table = sample_table();

        let path = loader.load(table.clone()).await.unwrap();
        assert_eq!(path, loader.path());
        assert_eq!(table, sample_table());
    }

    #[test]
    fn test_read_missing_parquet() {
        let temp = TempDir::new().unwrap();
        let err = read_parquet(temp.path().join("missing.parquet")).unwrap_err();
        assert!(PlatformError::is_not_found(&err));
    }
}
