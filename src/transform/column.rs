//! Column lookup helpers

use crate::error::PlatformError;
use arrow::array::{ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use eyre::Result;

/// Look up a column by name
pub fn column<'a>(table: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    table
        .column_by_name(name)
        .ok_or_else(|| PlatformError::MissingColumn(name.to_string()).into())
}

/// Look up a numeric column and widen it to `Float64`
///
/// Integer and float columns compare the same way after widening. Nulls
/// are preserved. A column with no values at all (header-only or all empty
/// CSV input, which infers as text) is read as all nulls.
pub fn numeric_column(table: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = column(table, name)?;
    if array.null_count() == array.len() {
        return Ok(Float64Array::new_null(array.len()));
    }
    if !array.data_type().is_numeric() {
        return Err(PlatformError::NonNumericColumn {
            column: name.to_string(),
            data_type: array.data_type().clone(),
        }
        .into());
    }

    let widened = cast(array, &DataType::Float64)?;
    Ok(widened.as_primitive::<Float64Type>().clone())
}
