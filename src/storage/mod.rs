//! File system storage operations
//!
//! This module handles all local file I/O:
//! - CSV reading into in-memory tables
//! - Parquet writing and reading
//! - Directory creation for the raw / processed layout

mod csv_file;
mod parquet_file;

pub use csv_file::{CsvReader, read_csv};
pub use parquet_file::{ParquetWriter, load_parquet, read_parquet, write_parquet};

use eyre::{Context, Result};
use std::path::{Path, PathBuf};

/// Ensure that a directory exists, creating it and any parents if needed
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.is_dir() {
        log::debug!("Creating directory {}", path.display());
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(path.to_path_buf())
}
