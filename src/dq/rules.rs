//! Row-level data quality rules

use crate::transform::{column, numeric_column};

use arrow::array::{BooleanArray, Float64Array};
use arrow::compute::kernels::cmp::{gt, lt};
use arrow::compute::{and, is_not_null, prep_null_mask_filter};
use arrow::record_batch::RecordBatch;
use eyre::Result;

/// A named predicate over a table
///
/// Evaluating a rule yields one boolean per row with no nulls: `true` means
/// the row passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// `email` is present
    EmailNotNull,
    /// `age` is strictly between 0 and 120
    AgeValid,
}

impl Rule {
    /// Every rule, in reporting order
    pub const ALL: [Rule; 2] = [Rule::EmailNotNull, Rule::AgeValid];

    pub fn name(&self) -> &'static str {
        match self {
            Self::EmailNotNull => "email_not_null",
            Self::AgeValid => "age_valid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }

    /// Compute the pass mask for every row of `table`
    ///
    /// # Errors
    /// Fails if a column the rule reads is missing or has the wrong type.
    pub fn evaluate(&self, table: &RecordBatch) -> Result<BooleanArray> {
        let mask = match self {
            Self::EmailNotNull => is_not_null(column(table, "email")?.as_ref())?,
            Self::AgeValid => {
                let ages = numeric_column(table, "age")?;
                let above = gt(&ages, &Float64Array::new_scalar(0.0))?;
                let below = lt(&ages, &Float64Array::new_scalar(120.0))?;
                // A null age fails the rule
                prep_null_mask_filter(&and(&above, &below)?)
            }
        };
        debug_assert_eq!(mask.len(), table.num_rows());
        Ok(mask)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn mask_values(mask: &BooleanArray) -> Vec<bool> {
        mask.iter().map(|v| v.unwrap()).collect()
    }

    fn table(emails: Vec<Option<&str>>, ages: Vec<Option<i64>>) -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("email", Arc::new(StringArray::from(emails)) as ArrayRef),
            ("age", Arc::new(Int64Array::from(ages)) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_email_not_null() {
        let table = table(
            vec![Some("test@example.com"), None, Some("another@example.com")],
            vec![Some(25), Some(30), Some(35)],
        );

        let mask = Rule::EmailNotNull.evaluate(&table).unwrap();

        assert_eq!(mask_values(&mask), vec![true, false, true]);
    }

    #[test]
    fn test_age_valid() {
        let table = table(
            vec![Some("a@test.com"); 5],
            vec![Some(0), Some(25), Some(119), Some(120), Some(-5)],
        );

        let mask = Rule::AgeValid.evaluate(&table).unwrap();

        assert_eq!(mask_values(&mask), vec![false, true, true, false, false]);
    }

    #[test]
    fn test_age_valid_null_is_false() {
        let table = table(vec![Some("a@test.com"); 2], vec![None, Some(1)]);

        let mask = Rule::AgeValid.evaluate(&table).unwrap();

        assert_eq!(mask.null_count(), 0);
        assert_eq!(mask_values(&mask), vec![false, true]);
    }

    #[test]
    fn test_registry() {
        let names: Vec<&str> = Rule::ALL.iter().map(Rule::name).collect();
        assert_eq!(names, vec!["email_not_null", "age_valid"]);
        assert_eq!(Rule::from_name("age_valid"), Some(Rule::AgeValid));
        assert_eq!(Rule::from_name("age_positive"), None);
    }

    #[test]
    fn test_missing_column_errors() {
        let table = RecordBatch::try_from_iter(vec![(
            "age",
            Arc::new(Int64Array::from(vec![30])) as ArrayRef,
        )])
        .unwrap();

        assert!(Rule::EmailNotNull.evaluate(&table).is_err());
        assert!(Rule::AgeValid.evaluate(&table).is_ok());
    }
}
