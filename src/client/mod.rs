//! Remote system clients
//!
//! [`s3`] fetches and stores objects in the configured bucket;
//! [`snowflake`] loads Parquet files into warehouse tables.

pub mod s3;
pub mod snowflake;

pub use s3::{RemoteCsvExtractor, S3Client, download};
pub use snowflake::{SnowflakeSession, Warehouse, load_warehouse};
