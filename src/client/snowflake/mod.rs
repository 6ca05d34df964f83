//! Snowflake warehouse loading
//!
//! Loads a local Parquet file into an existing table with the two-step
//! stage-then-copy sequence:
//!
//! 1. `PUT` the file into the table's internal stage (`@%TABLE`)
//! 2. `COPY INTO` the table from that stage
//!
//! The sequencing is written against the [`Warehouse`] trait;
//! [`SnowflakeSession`] is the live implementation. There is no rollback:
//! if the copy fails after a successful stage, the staged file stays behind.

mod session;
mod stage;

pub use session::SnowflakeSession;

use crate::error::PlatformError;
use crate::settings::Settings;

use eyre::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A SQL endpoint that runs one statement at a time
pub trait Warehouse: Send {
    /// Execute `statement`, including any client-side work it requires
    /// (e.g. the file upload behind a `PUT`)
    fn execute(&mut self, statement: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

// One to three dot-separated unquoted identifiers: TABLE, SCHEMA.TABLE, DB.SCHEMA.TABLE
static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*){0,2}$")
        .expect("table name pattern is valid")
});

/// Check that `table` is a plain (optionally qualified) identifier
pub fn validate_table_name(table: &str) -> Result<(), PlatformError> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(PlatformError::configuration(format!(
            "Invalid Snowflake table name '{}', expected TABLE, SCHEMA.TABLE or DATABASE.SCHEMA.TABLE",
            table
        )))
    }
}

/// Internal stage that belongs to `table`
pub fn table_stage(table: &str) -> String {
    format!("@%{}", table)
}

pub fn put_statement(path: &Path, stage: &str) -> String {
    let path = path.display().to_string().replace('\\', "/").replace('\'', "\\'");
    format!(
        "PUT 'file://{}' {} AUTO_COMPRESS=FALSE OVERWRITE=TRUE",
        path, stage
    )
}

pub fn copy_statement(table: &str, stage: &str) -> String {
    format!(
        "COPY INTO {} FROM {} FILE_FORMAT = (TYPE = 'PARQUET') MATCH_BY_COLUMN_NAME = CASE_INSENSITIVE",
        table, stage
    )
}

/// Stage `path` into the table stage of `table`, then copy it into `table`
///
/// The two statements run in order on the same warehouse session. A copy
/// failure leaves the staged file in place.
pub async fn stage_and_copy<W: Warehouse>(warehouse: &mut W, path: &Path, table: &str) -> Result<()> {
    validate_table_name(table)?;
    let stage = table_stage(table);

    log::info!("Uploading {} to stage {}", path.display(), stage);
    warehouse
        .execute(&put_statement(path, &stage))
        .await
        .with_context(|| format!("Failed to stage {} into {}", path.display(), stage))?;

    log::info!("Copying into {}", table);
    warehouse
        .execute(&copy_statement(table, &stage))
        .await
        .with_context(|| format!("Failed to copy {} into {}", stage, table))?;

    log::info!("Snowflake load completed");
    Ok(())
}

/// Load a local Parquet file into the Snowflake table `table`
///
/// Credentials and the table name are validated before any connection is
/// made. The session is closed on every exit path.
///
/// # Errors
/// - [`PlatformError::Configuration`] for incomplete credentials or a bad
///   table name
/// - [`PlatformError::NotFound`] if the file does not exist
/// - [`PlatformError::Warehouse`] for login, stage or copy failures
pub async fn load_warehouse(settings: &Settings, path: impl AsRef<Path>, table: &str) -> Result<()> {
    let config = settings.snowflake()?;
    validate_table_name(table)?;
    let path = absolute_file(path.as_ref())?;

    log::info!("Loading {} into Snowflake table {}", path.display(), table);
    let mut session = SnowflakeSession::connect(&config).await?;
    let result = stage_and_copy(&mut session, &path, table).await;

    if let Err(e) = session.close().await {
        log::warn!("Failed to close Snowflake session: {:#}", e);
    }
    result
}

fn absolute_file(path: &Path) -> Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PlatformError::NotFound(path.to_path_buf()).into())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to resolve {}", path.display())),
    }
}
