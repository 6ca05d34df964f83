//! Transform implementations for tables
//!
//! Concrete [`Transformer`](crate::etl::Transformer) implementations and the
//! column helpers they share with the data-quality rules.

mod adult_filter;
mod column;

pub use adult_filter::{ADULT_AGE, AdultFilter, filter_adults};
pub use column::{column, numeric_column};
