//! Error taxonomy for the data platform
//!
//! Components return `eyre::Result` like the rest of the crate. When a failure
//! belongs to one of the categories below it is raised as a [`PlatformError`]
//! so callers can recover it with `Report::downcast_ref`.

use arrow::datatypes::DataType;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// Missing or incomplete settings / credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A local input file does not exist
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Remote object storage failure
    #[error("S3 transfer of {key} failed: {source}")]
    Transfer {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Warehouse login, staging or copy failure
    #[error("Warehouse {step} failed: {message}")]
    Warehouse { step: String, message: String },

    #[error("Column '{0}' not found in table")]
    MissingColumn(String),

    #[error("Column '{column}' must be numeric, found {data_type}")]
    NonNumericColumn { column: String, data_type: DataType },
}

impl PlatformError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn warehouse(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warehouse {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether `report` carries a [`PlatformError::NotFound`]
    pub fn is_not_found(report: &eyre::Report) -> bool {
        matches!(
            report.downcast_ref::<PlatformError>(),
            Some(PlatformError::NotFound(_))
        )
    }
}
