//! CSV file reading into Arrow tables

use crate::error::PlatformError;
use crate::etl::Extractor;
use crate::settings::Settings;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use eyre::{Context, Result};
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of records sampled when inferring column types
const SCHEMA_INFERENCE_ROWS: usize = 1000;

/// Read a CSV file with a header row into a single table
///
/// Column types are inferred from the first records. Empty fields become
/// nulls.
///
/// # Errors
/// [`PlatformError::NotFound`] if the file does not exist, otherwise any
/// I/O or parse failure.
pub fn read_csv(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PlatformError::NotFound(path.to_path_buf()).into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open CSV file: {}", path.display()));
        }
    };

    let format = Format::default().with_header(true);
    let (schema, sampled) = format
        .infer_schema(&mut file, Some(SCHEMA_INFERENCE_ROWS))
        .with_context(|| format!("Failed to infer schema of {}", path.display()))?;
    log::debug!(
        "Inferred {} column(s) from {} record(s) of {}",
        schema.fields().len(),
        sampled,
        path.display()
    );
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))?;

    Ok(concat_batches(&schema, &batches)?)
}

/// Reads one CSV file as a table
pub struct CsvReader {
    path: PathBuf,
}

impl CsvReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reader for `file_name` inside the configured raw directory
    pub fn local(settings: &Settings, file_name: &str) -> Self {
        Self::new(settings.raw_path(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<RecordBatch> {
        log::info!("Reading local file {}", self.path.display());
        read_csv(&self.path)
    }
}

impl Extractor for CsvReader {
    type Item = RecordBatch;

    async fn extract(&self) -> Result<Self::Item> {
        self.read()
    }
}
