//! Upload validation API
//!
//! An axum service that checks uploaded CSV files row by row against the
//! [`Record`] model. See [`server`] for the routes.

mod record;
pub mod server;

pub use record::{Record, Row, ValidationError, field_value, validate_record};
pub use server::{RowError, ValidationReport, router, serve, validate_csv};
