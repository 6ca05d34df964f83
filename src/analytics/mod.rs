//! Ad-hoc SQL over the local data directories
//!
//! Every call builds a fresh DataFusion session, registers the files it
//! finds and runs one statement:
//!
//! - `raw_dir/*.csv` as CSV tables
//! - `processed_dir/*.parquet` as Parquet tables
//!
//! Tables are named after the file stem (`input.csv` → `input`). Files
//! can also be queried by path, e.g. `SELECT * FROM 'data/raw/input.csv'`.

use crate::settings::Settings;

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use eyre::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Run `sql` and collect the result
pub async fn run_query(settings: &Settings, sql: &str) -> Result<Vec<RecordBatch>> {
    let ctx = session(settings).await?;

    log::info!("Running query: {}", sql);
    let frame = ctx
        .sql(sql)
        .await
        .with_context(|| format!("Failed to plan query: {}", sql))?;
    let batches = frame.collect().await.context("Failed to execute query")?;

    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    log::info!("Query returned {} row(s)", rows);
    Ok(batches)
}

/// Render query results as an ASCII table
pub fn format_batches(batches: &[RecordBatch]) -> Result<String> {
    Ok(pretty_format_batches(batches)?.to_string())
}

/// A session with every readable raw CSV and processed Parquet file registered
///
/// A file that fails to register (ragged rows, empty, corrupt) is skipped
/// with a warning; the other tables stay queryable.
pub async fn session(settings: &Settings) -> Result<SessionContext> {
    let ctx = SessionContext::new().enable_url_table();
    let mut registered = HashSet::new();

    for (name, path) in data_files(&settings.raw_dir, "csv")? {
        log::debug!("Registering table {} -> {}", name, path.display());
        match ctx
            .register_csv(name.as_str(), &path_str(&path)?, CsvReadOptions::new())
            .await
        {
            Ok(()) => {
                registered.insert(name);
            }
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    for (name, path) in data_files(&settings.processed_dir, "parquet")? {
        if registered.contains(&name) {
            log::warn!(
                "Table name {} is already taken, query {} by path instead",
                name,
                path.display()
            );
            continue;
        }
        log::debug!("Registering table {} -> {}", name, path.display());
        match ctx
            .register_parquet(name.as_str(), &path_str(&path)?, ParquetReadOptions::default())
            .await
        {
            Ok(()) => {
                registered.insert(name);
            }
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(ctx)
}

/// `(stem, path)` for files in `dir` with `extension`, sorted by name
///
/// A missing directory yields no files.
fn data_files(dir: &Path, extension: &str) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn path_str(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| eyre::eyre!("Path is not valid UTF-8: {}", path.display()))
}
