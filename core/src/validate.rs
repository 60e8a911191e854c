//! Schema validator.
//!
//! RULE: validation never mutates or filters a table. The first
//! violation is a hard stop; nothing downstream runs on a bad table.
//!
//! Two layers:
//!   1. Column presence, checked once against the CSV header.
//!   2. Row invariants: identifiers, then the record's value rules.

use crate::{
    error::{ReportError, ReportResult},
    record::{Customer, Record, Table, Transaction},
    types::RowIndex,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::ops::Deref;

// ── Rules ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// value >= 0
    NonNegative,
    /// value > 0
    Positive,
    /// min <= value <= max
    Within { min: f64, max: f64 },
}

impl Constraint {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Self::NonNegative => value >= 0.0,
            Self::Positive => value > 0.0,
            Self::Within { min, max } => value >= min && value <= max,
        }
    }

    pub fn describe(&self, value: f64) -> String {
        match *self {
            Self::NonNegative => format!("must be >= 0, got {value}"),
            Self::Positive => format!("must be > 0, got {value}"),
            Self::Within { min, max } => format!("must be within [{min}, {max}], got {value}"),
        }
    }
}

/// One value rule on one numeric column of a record type.
pub struct Rule<R> {
    pub column: &'static str,
    pub constraint: Constraint,
    pub value: fn(&R) -> f64,
}

// ── Validated tables ─────────────────────────────────────────────────────────

/// A table that passed schema and data-quality checks.
/// Only this module can construct one.
#[derive(Debug, Clone)]
pub struct Validated<R>(Table<R>);

impl<R> Validated<R> {
    pub fn rows(&self) -> &[R] {
        &self.0.rows
    }
}

impl<R> Deref for Validated<R> {
    type Target = Table<R>;

    fn deref(&self) -> &Table<R> {
        &self.0
    }
}

/// Row counts of a passing validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub transactions: usize,
    pub customers: usize,
}

// ── Checks ───────────────────────────────────────────────────────────────────

/// Fails with every missing column, not just the first.
pub fn require_columns<'a>(
    table: &str,
    present: impl IntoIterator<Item = &'a str>,
    required: &[&str],
) -> ReportResult<()> {
    let present: HashSet<&str> = present.into_iter().collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !present.contains(**col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReportError::Schema {
            table: table.to_string(),
            missing,
        })
    }
}

/// Identifiers must be non-blank and unique.
pub fn check_identifiers<R: Record>(table: &Table<R>) -> ReportResult<()> {
    let mut seen: HashMap<&str, RowIndex> = HashMap::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ReportError::data_quality(
                table.name,
                R::ID_COLUMN,
                "identifier must be non-null",
                Some(index),
            ));
        }
        if let Some(first) = seen.insert(id, index) {
            return Err(ReportError::data_quality(
                table.name,
                R::ID_COLUMN,
                format!("identifier '{id}' duplicates row {first}"),
                Some(index),
            ));
        }
    }
    Ok(())
}

/// Reports the first row (in row order) that breaks any rule.
pub fn check_rules<R: Record>(table: &Table<R>) -> ReportResult<()> {
    for (index, row) in table.rows.iter().enumerate() {
        for rule in R::rules() {
            let value = (rule.value)(row);
            if !rule.constraint.holds(value) {
                return Err(ReportError::data_quality(
                    table.name,
                    rule.column,
                    rule.constraint.describe(value),
                    Some(index),
                ));
            }
        }
    }
    Ok(())
}

/// Run every row-level check. An empty table passes.
pub fn validate<R: Record>(table: Table<R>) -> ReportResult<Validated<R>> {
    check_identifiers(&table)?;
    check_rules(&table)?;
    log::debug!("table '{}' passed validation ({} rows)", table.name, table.len());
    Ok(Validated(table))
}

/// Validate both input tables, transactions first.
pub fn validate_inputs(
    transactions: Table<Transaction>,
    customers: Table<Customer>,
) -> ReportResult<(Validated<Transaction>, Validated<Customer>, ValidationReport)> {
    let transactions = validate(transactions)?;
    let customers = validate(customers)?;
    let report = ValidationReport {
        transactions: transactions.len(),
        customers: customers.len(),
    };
    log::info!(
        "validation passed: {} transactions, {} customers",
        report.transactions,
        report.customers
    );
    Ok((transactions, customers, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_is_a_closed_interval() {
        let c = Constraint::Within { min: 1.0, max: 5.0 };
        assert!(c.holds(1.0));
        assert!(c.holds(5.0));
        assert!(!c.holds(0.999));
        assert!(!c.holds(5.001));
    }

    #[test]
    fn positive_rejects_zero() {
        assert!(!Constraint::Positive.holds(0.0));
        assert!(Constraint::NonNegative.holds(0.0));
        assert!(!Constraint::NonNegative.holds(-0.01));
    }

    #[test]
    fn missing_columns_are_reported_in_declaration_order() {
        let err = require_columns("t", ["a", "c"], &["a", "b", "c", "d"]).unwrap_err();
        match err {
            ReportError::Schema { missing, .. } => assert_eq!(missing, vec!["b", "d"]),
            other => panic!("expected schema error, got {other}"),
        }
    }
}
