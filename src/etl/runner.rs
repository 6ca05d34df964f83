//! Entry points for the adults ETL job
//!
//! Wires [`CsvReader`] (or [`RemoteCsvExtractor`]) → [`AdultFilter`] →
//! [`ParquetWriter`] into a [`Pipeline`] and runs it once.

use super::Pipeline;
use crate::client::s3::RemoteCsvExtractor;
use crate::settings::Settings;
use crate::storage::{CsvReader, ParquetWriter};
use crate::transform::AdultFilter;

use eyre::Result;
use std::path::PathBuf;

/// Raw file read by [`run`]
pub const DEFAULT_SOURCE: &str = "input.csv";
/// Processed file written by [`run`]
pub const DEFAULT_OUTPUT: &str = "output.parquet";

/// Run the job on `raw_dir/input.csv`, writing `processed_dir/output.parquet`
///
/// Errors from any stage propagate unchanged; a failure after the output
/// file was opened may leave a partial file behind.
pub async fn run(settings: &Settings) -> Result<PathBuf> {
    run_with(settings, DEFAULT_SOURCE, DEFAULT_OUTPUT).await
}

/// Run the job on `raw_dir/source`, writing `processed_dir/output`
pub async fn run_with(settings: &Settings, source: &str, output: &str) -> Result<PathBuf> {
    log::info!("Starting ETL job: {} -> {}", source, output);
    let pipeline = Pipeline::new(
        CsvReader::local(settings, source),
        AdultFilter,
        ParquetWriter::processed(settings, output),
    );
    let path = pipeline.run().await?;
    log::info!("ETL job completed: {}", path.display());
    Ok(path)
}

/// Run the job on the S3 object `key`, writing `processed_dir/output`
///
/// The object is downloaded into `raw_dir` first.
pub async fn run_from_s3(settings: &Settings, key: &str, output: &str) -> Result<PathBuf> {
    log::info!("Starting ETL job: s3 {} -> {}", key, output);
    let pipeline = Pipeline::new(
        RemoteCsvExtractor::new(settings, key),
        AdultFilter,
        ParquetWriter::processed(settings, output),
    );
    let path = pipeline.run().await?;
    log::info!("ETL job completed: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::storage::read_parquet;
    use arrow::array::{AsArray, Int64Array};
    use arrow::datatypes::Int64Type;
    use tempfile::TempDir;

    fn settings_with_input(temp: &TempDir, contents: &str) -> Settings {
        let settings = Settings::with_data_dir(temp.path());
        std::fs::create_dir_all(&settings.raw_dir).unwrap();
        std::fs::write(settings.raw_path(DEFAULT_SOURCE), contents).unwrap();
        settings
    }

    #[tokio::test]
    async fn test_run_filters_adults() {
        let temp = TempDir::new().unwrap();
        let settings = settings_with_input(&temp, "id,age\n1,25\n2,17\n3,18\n4,19\n");

        let path = run(&settings).await.unwrap();

        assert_eq!(path, settings.processed_path(DEFAULT_OUTPUT));
        let table = read_parquet(&path).unwrap();
        assert_eq!(
            table.column(0).as_primitive::<Int64Type>(),
            &Int64Array::from(vec![1, 4])
        );
        assert_eq!(
            table.column(1).as_primitive::<Int64Type>(),
            &Int64Array::from(vec![25, 19])
        );
    }

    #[tokio::test]
    async fn test_run_missing_input_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());

        let err = run(&settings).await.unwrap_err();

        assert!(PlatformError::is_not_found(&err));
        assert!(!settings.processed_path(DEFAULT_OUTPUT).exists());
    }

    #[tokio::test]
    async fn test_run_with_custom_names() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());
        std::fs::create_dir_all(&settings.raw_dir).unwrap();
        std::fs::write(settings.raw_path("people.csv"), "name,age\nann,40\nbo,12\n").unwrap();

        let path = run_with(&settings, "people.csv", "adults.parquet").await.unwrap();

        assert_eq!(path, settings.processed_path("adults.parquet"));
        assert_eq!(read_parquet(&path).unwrap().num_rows(), 1);
    }

    #[tokio::test]
    async fn test_run_without_age_column_fails() {
        let temp = TempDir::new().unwrap();
        let settings = settings_with_input(&temp, "id,name\n1,ann\n");

        let err = run(&settings).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PlatformError>(),
            Some(PlatformError::MissingColumn(name)) if name == "age"
        ));
    }

    #[tokio::test]
    async fn test_run_from_s3_requires_bucket() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());

        let err = run_from_s3(&settings, "input.csv", DEFAULT_OUTPUT)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PlatformError>(),
            Some(PlatformError::Configuration(_))
        ));
    }
}
