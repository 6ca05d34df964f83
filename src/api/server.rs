//! HTTP server for upload validation
//!
//! | Method | Path         | Description                        |
//! |--------|--------------|------------------------------------|
//! | GET    | `/health`    | Health check                       |
//! | POST   | `/validate/` | Validate an uploaded CSV (`file`)  |

use super::record::{Row, describe, field_value, validate_record};
use crate::settings::Settings;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use eyre::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};

/// One rejected row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowError {
    /// The row's values, or `null` if the record could not be parsed
    pub row: Option<Row>,
    pub error: String,
}

/// Validation summary returned by `/validate/`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub rows: usize,
    pub errors: Vec<RowError>,
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": message.to_string() })),
    )
}

/// The service routes
///
/// Uploads to `/validate/` are not size limited.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/validate/",
            post(validate).layer(DefaultBodyLimit::disable()),
        )
}

/// Serve the API on `settings.api_host:settings.api_port` until the process stops
pub async fn serve(settings: &Settings) -> Result<()> {
    let addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!("{} API listening on http://{}", settings.app_name, listener.local_addr()?);
    axum::serve(listener, router())
        .await
        .context("API server stopped")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn validate(mut multipart: Multipart) -> Result<Json<ValidationReport>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided"))?;
    log::info!(
        "Validating upload {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    );

    let report = validate_csv(&bytes).map_err(bad_request)?;
    log::info!(
        "Validated {} row(s), {} rejected",
        report.rows,
        report.errors.len()
    );
    Ok(Json(report))
}

/// Validate every data row of a CSV document
///
/// Fails only if the header row cannot be read; a malformed data record is
/// reported as a row error with no values.
pub fn validate_csv(bytes: &[u8]) -> Result<ValidationReport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut report = ValidationReport::default();
    for record in reader.records() {
        report.rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(RowError {
                    row: None,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, raw)| (name.clone(), field_value(raw)))
            .collect();
        if let Err(errors) = validate_record(&row) {
            report.errors.push(RowError {
                row: Some(row),
                error: describe(&errors),
            });
        }
    }

    Ok(report)
}
