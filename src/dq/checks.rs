//! Data quality check execution

use super::Rule;
use crate::error::PlatformError;
use crate::settings::Settings;
use crate::storage::read_csv;

use arrow::record_batch::RecordBatch;
use eyre::Result;
use serde::Serialize;

/// File in the raw directory the check run reads
pub const DQ_INPUT_FILE: &str = "input.csv";

/// Failing row count for one rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    pub rule: &'static str,
    pub failing_rows: usize,
}

/// Per-rule failure tallies, in [`Rule::ALL`] order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DqReport {
    pub rows: usize,
    pub results: Vec<RuleResult>,
}

impl DqReport {
    /// Failing rows recorded for `rule_name`
    pub fn get(&self, rule_name: &str) -> Option<usize> {
        self.results
            .iter()
            .find(|result| result.rule == rule_name)
            .map(|result| result.failing_rows)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.results.iter().map(|r| (r.rule, r.failing_rows))
    }
}

impl std::fmt::Display for DqReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .iter()
            .map(|(rule, failing)| format!("{}: {}", rule, failing))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// Apply every rule to `table` and count the rows each one rejects
pub fn check_table(table: &RecordBatch) -> Result<DqReport> {
    let mut results = Vec::with_capacity(Rule::ALL.len());
    for rule in Rule::ALL {
        let mask = rule.evaluate(table)?;
        let failing_rows = mask.false_count();
        log::info!("Rule {}: {} failing rows", rule, failing_rows);
        results.push(RuleResult {
            rule: rule.name(),
            failing_rows,
        });
    }

    Ok(DqReport {
        rows: table.num_rows(),
        results,
    })
}

/// Run the data quality checks on the raw input file
///
/// A missing input file is logged and reported as `Ok(None)`; every other
/// failure propagates.
pub fn run_checks(settings: &Settings) -> Result<Option<DqReport>> {
    let path = settings.raw_path(DQ_INPUT_FILE);
    let table = match read_csv(&path) {
        Ok(table) => table,
        Err(e) if PlatformError::is_not_found(&e) => {
            log::error!("Input file {} not found.", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    check_table(&table).map(Some)
}
