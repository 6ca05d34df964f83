//! Data Platform
//!
//! A small data platform toolkit: a CSV → Parquet ETL pipeline, row level
//! data quality checks, ad-hoc SQL, an upload validation API and S3 and
//! Snowflake connectors.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod client;
pub mod dq;
pub mod error;
pub mod etl;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod transform;

// Re-exports for convenience
pub use client::{RemoteCsvExtractor, S3Client, SnowflakeSession, Warehouse};
pub use error::PlatformError;
pub use etl::{Extractor, Loader, Pipeline, Transformer};
pub use settings::Settings;
pub use storage::{CsvReader, ParquetWriter};
pub use transform::{AdultFilter, filter_adults};
