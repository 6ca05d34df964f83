//! Data quality checks
//!
//! A fixed set of named row-level [`Rule`]s and the check run that tallies
//! failing rows per rule. The tallies are descriptive only; no rule failure
//! is fatal.

mod checks;
mod rules;

pub use checks::{DQ_INPUT_FILE, DqReport, RuleResult, check_table, run_checks};
pub use rules::Rule;
