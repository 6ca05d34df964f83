//! Upload record model and per-field validation

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// One CSV row as JSON values keyed by column name
pub type Row = Map<String, Value>;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// A validated upload row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    pub email: String,
    pub age: i64,
}

/// One failing field of a row
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate every field of `row`, collecting all failures
///
/// Columns other than `id`, `email` and `age` are ignored.
pub fn validate_record(row: &Row) -> Result<Record, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let id = integer(row, "id")
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(ValidationError::new("id", "must be greater than 0"))
            }
        })
        .map_err(|e| errors.push(e))
        .ok();

    let email = match row.get("email") {
        None | Some(Value::Null) => Err(ValidationError::new("email", "field required")),
        Some(Value::String(email)) if EMAIL.is_match(email) => Ok(email.clone()),
        Some(_) => Err(ValidationError::new("email", "value is not a valid email address")),
    }
    .map_err(|e| errors.push(e))
    .ok();

    let age = integer(row, "age")
        .and_then(|age| {
            if age > 0 && age < 120 {
                Ok(age)
            } else {
                Err(ValidationError::new(
                    "age",
                    "must be greater than 0 and less than 120",
                ))
            }
        })
        .map_err(|e| errors.push(e))
        .ok();

    match (id, email, age) {
        (Some(id), Some(email), Some(age)) => Ok(Record { id, email, age }),
        _ => Err(errors),
    }
}

fn integer(row: &Row, field: &'static str) -> Result<i64, ValidationError> {
    match row.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(field, "field required")),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_number))
            .ok_or_else(|| ValidationError::new(field, "value is not a valid integer")),
        Some(_) => Err(ValidationError::new(field, "value is not a valid integer")),
    }
}

/// `value` as an integer when it has no fractional part (`25.0` → 25)
fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// JSON value for a raw CSV field
///
/// Integers and floats are recognised, empty fields are null and anything
/// else stays a string.
pub fn field_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

/// Join field failures into the single message reported for a row
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
