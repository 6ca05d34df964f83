//! Adult filter transformer
//!
//! Keeps the rows of a table whose `age` is strictly greater than
//! [`ADULT_AGE`].

use super::numeric_column;
use crate::etl::Transformer;

use arrow::array::Float64Array;
use arrow::compute::filter_record_batch;
use arrow::compute::kernels::cmp::gt;
use arrow::record_batch::RecordBatch;
use eyre::Result;

/// Rows must be strictly older than this to be kept
pub const ADULT_AGE: f64 = 18.0;

/// Filter `table` down to the rows with `age > 18`
///
/// Every column is kept in its original order; only the row count changes.
/// Rows with a null age are dropped.
///
/// # Errors
/// Fails if the table has no numeric `age` column.
pub fn filter_adults(table: &RecordBatch) -> Result<RecordBatch> {
    let ages = numeric_column(table, "age")?;
    let mask = gt(&ages, &Float64Array::new_scalar(ADULT_AGE))?;
    Ok(filter_record_batch(table, &mask)?)
}

/// [`Transformer`] wrapper around [`filter_adults`]
///
/// # Example
/// ```
/// use arrow::array::{ArrayRef, Int64Array};
/// use arrow::record_batch::RecordBatch;
/// use data_platform::etl::Transformer;
/// use data_platform::transform::AdultFilter;
/// use std::sync::Arc;
///
/// let table = RecordBatch::try_from_iter(vec![
///     ("age", Arc::new(Int64Array::from(vec![17, 18, 19])) as ArrayRef),
/// ]).unwrap();
///
/// let adults = AdultFilter.transform(table).unwrap();
/// assert_eq!(adults.num_rows(), 1);
/// ```
pub struct AdultFilter;

impl Transformer for AdultFilter {
    type Input = RecordBatch;
    type Output = RecordBatch;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        filter_adults(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, AsArray, Int64Array, StringArray};
    use arrow::datatypes::{Float64Type, Int64Type};
    use std::sync::Arc;

    fn people(ids: Vec<i64>, ages: Vec<Option<i64>>) -> RecordBatch {
        let names: Vec<String> = ids.iter().map(|id| format!("person-{}", id)).collect();
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(ids)) as ArrayRef),
            ("name", Arc::new(StringArray::from(names)) as ArrayRef),
            ("age", Arc::new(Int64Array::from(ages)) as ArrayRef),
        ])
        .unwrap()
    }

    fn ids(table: &RecordBatch) -> Vec<i64> {
        table
            .column_by_name("id")
            .unwrap()
            .as_primitive::<Int64Type>()
            .values()
            .to_vec()
    }

    fn ages(table: &RecordBatch) -> Vec<i64> {
        table
            .column_by_name("age")
            .unwrap()
            .as_primitive::<Int64Type>()
            .values()
            .to_vec()
    }

    #[test]
    fn test_filter_adults_basic() {
        let table = people(vec![1, 2, 3, 4], vec![Some(25), Some(17), Some(18), Some(19)]);

        let result = filter_adults(&table).unwrap();

        assert_eq!(result.num_rows(), 2);
        assert_eq!(ids(&result), vec![1, 4]);
        assert_eq!(ages(&result), vec![25, 19]);
    }

    #[test]
    fn test_boundary_18_excluded_19_included() {
        let table = people(vec![1, 2], vec![Some(18), Some(19)]);

        let result = filter_adults(&table).unwrap();

        assert_eq!(ages(&result), vec![19]);
    }

    #[test]
    fn test_all_and_no_adults() {
        let all = people(vec![1, 2, 3], vec![Some(20), Some(25), Some(30)]);
        assert_eq!(filter_adults(&all).unwrap().num_rows(), 3);

        let none = people(vec![1, 2, 3], vec![Some(10), Some(15), Some(18)]);
        let result = filter_adults(&none).unwrap();
        assert_eq!(result.num_rows(), 0);
        assert_eq!(result.num_columns(), 3);
    }

    #[test]
    fn test_preserves_schema_and_column_order() {
        let table = people(vec![1, 2, 3], vec![Some(25), Some(17), Some(30)]);

        let result = filter_adults(&table).unwrap();

        assert_eq!(result.schema(), table.schema());
        assert!(result.num_rows() <= table.num_rows());
    }

    #[test]
    fn test_null_age_dropped() {
        let table = people(vec![1, 2], vec![None, Some(40)]);

        let result = filter_adults(&table).unwrap();

        assert_eq!(ids(&result), vec![2]);
    }

    #[test]
    fn test_float_ages() {
        let table = RecordBatch::try_from_iter(vec![(
            "age",
            Arc::new(Float64Array::from(vec![18.0, 18.5])) as ArrayRef,
        )])
        .unwrap();

        let result = AdultFilter.transform(table).unwrap();

        let kept = result.column(0).as_primitive::<Float64Type>();
        assert_eq!(kept.values().to_vec(), vec![18.5]);
    }

    #[test]
    fn test_missing_age_column() {
        let table = RecordBatch::try_from_iter(vec![(
            "id",
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
        )])
        .unwrap();

        assert!(filter_adults(&table).is_err());
    }
}
