//! CLI helper functions
//!
//! Each command in `main` maps to one function here, so the commands can be
//! exercised without a process boundary.

use crate::{
    analytics::{format_batches, run_query},
    client::{download, load_warehouse},
    dq::{DqReport, run_checks},
    etl::{run_from_s3, run_with},
    settings::Settings,
};
use eyre::Result;
use std::path::{Path, PathBuf};

/// Options for the `etl` command
#[derive(Clone, Debug)]
pub struct EtlOptions {
    /// File name inside the raw directory
    pub source: String,
    /// File name inside the processed directory
    pub output: String,
    /// Download the source from S3 instead of reading `source`
    pub s3_key: Option<String>,
    /// Also load the output into this Snowflake table
    pub snowflake_table: Option<String>,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self {
            source: crate::etl::runner::DEFAULT_SOURCE.to_string(),
            output: crate::etl::runner::DEFAULT_OUTPUT.to_string(),
            s3_key: None,
            snowflake_table: None,
        }
    }
}

/// Run the ETL job and optionally push the result to the warehouse
///
/// Pipeline: CsvReader (or RemoteCsvExtractor) → AdultFilter → ParquetWriter
pub async fn etl(settings: &Settings, options: &EtlOptions) -> Result<PathBuf> {
    let path = match &options.s3_key {
        Some(key) => run_from_s3(settings, key, &options.output).await?,
        None => run_with(settings, &options.source, &options.output).await?,
    };

    if let Some(table) = &options.snowflake_table {
        load_warehouse(settings, &path, table).await?;
    }
    Ok(path)
}

/// Run the data quality checks on the raw input file
pub fn data_quality(settings: &Settings) -> Result<Option<DqReport>> {
    run_checks(settings)
}

/// Run `sql` and render the result as a text table
pub async fn analytics(settings: &Settings, sql: &str) -> Result<String> {
    let batches = run_query(settings, sql).await?;
    format_batches(&batches)
}

/// Download `key`, into `dest` if given, otherwise the raw directory
pub async fn s3_download(settings: &Settings, key: &str, dest: Option<&Path>) -> Result<PathBuf> {
    download(settings, key, dest).await
}

/// Load a Parquet file into a Snowflake table
///
/// Relative file names resolve against the processed directory.
pub async fn snowflake_load(settings: &Settings, file: &Path, table: &str) -> Result<PathBuf> {
    let path = resolve_processed(settings, file);
    load_warehouse(settings, &path, table).await?;
    Ok(path)
}

/// `file` as given when absolute, otherwise inside the processed directory
pub fn resolve_processed(settings: &Settings, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        settings.processed_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_processed() {
        let settings = Settings::default();

        assert_eq!(
            resolve_processed(&settings, Path::new("output.parquet")),
            PathBuf::from("data/processed/output.parquet")
        );
        let absolute = std::env::temp_dir().join("elsewhere.parquet");
        assert_eq!(resolve_processed(&settings, &absolute), absolute);
    }

    #[tokio::test]
    async fn test_etl_then_warehouse_requires_credentials() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());
        std::fs::create_dir_all(&settings.raw_dir).unwrap();
        std::fs::write(settings.raw_path("input.csv"), "id,age\n1,30\n").unwrap();

        let options = EtlOptions {
            snowflake_table: Some("EVENTS".to_string()),
            ..Default::default()
        };
        let err = etl(&settings, &options).await.unwrap_err();

        // The Parquet file is written before the warehouse step fails
        assert!(settings.processed_path("output.parquet").exists());
        assert!(matches!(
            err.downcast_ref::<PlatformError>(),
            Some(PlatformError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_analytics_renders_table() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(temp.path());
        std::fs::create_dir_all(&settings.raw_dir).unwrap();
        std::fs::write(settings.raw_path("input.csv"), "id,age\n1,30\n").unwrap();

        let text = analytics(&settings, "SELECT age FROM input").await.unwrap();

        assert!(text.contains("| age |"));
        assert!(text.contains("| 30  |"));
    }
}
