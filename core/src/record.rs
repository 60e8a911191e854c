//! Typed row records for the two input tables.
//!
//! Columns are statically declared per record type. The only place a
//! column is looked up by name at runtime is `RowReader`, at the
//! CSV-to-record boundary.

use crate::{
    error::{ReportError, ReportResult},
    types::{Quarter, RecordId, RowIndex},
    validate::{Constraint, Rule},
};
use chrono::NaiveDate;
use csv::ByteRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

// ── Record contract ──────────────────────────────────────────────────────────

/// Every input table row type implements Record.
pub trait Record: Sized + 'static {
    /// Table name used in log lines and error messages.
    const TABLE: &'static str;

    /// Columns that must be present in the CSV header.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Name of the identifier column.
    const ID_COLUMN: &'static str;

    fn id(&self) -> &str;

    /// Row-level value rules, checked in declaration order.
    fn rules() -> &'static [Rule<Self>];

    /// Convert one CSV row. Every cell goes through a checked conversion.
    fn from_row(row: &RowReader<'_>) -> ReportResult<Self>;
}

/// A loaded table. Rows are never mutated after load.
#[derive(Debug, Clone)]
pub struct Table<R> {
    pub name: &'static str,
    pub rows: Vec<R>,
}

impl<R: Record> Table<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { name: R::TABLE, rows }
    }
}

impl<R> Table<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Transactions ─────────────────────────────────────────────────────────────

pub const TRANSACTION_COLUMNS: &[&str] = &[
    "transaction_id",
    "date",
    "card_category",
    "revenue",
    "interest_earned",
    "total_trans_amt",
    "annual_fees",
    "total_trans_count",
    "customer_job",
    "education_level",
    "use_chip",
    "exp_type",
    "quarter",
    "month",
    "gender",
    "age_group",
    "income_group",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub transaction_id: RecordId,
    pub date: NaiveDate,
    pub card_category: String,
    pub revenue: f64,
    pub interest_earned: f64,
    pub total_trans_amt: f64,
    pub annual_fees: f64,
    pub total_trans_count: u64,
    pub customer_job: String,
    pub education_level: String,
    /// Channel used: Swipe, Chip or Online.
    pub use_chip: String,
    pub exp_type: String,
    pub quarter: Quarter,
    pub month: String,
    pub gender: String,
    pub age_group: String,
    pub income_group: String,
}

const TRANSACTION_RULES: &[Rule<Transaction>] = &[
    Rule { column: "revenue", constraint: Constraint::NonNegative, value: |t| t.revenue },
    Rule { column: "interest_earned", constraint: Constraint::NonNegative, value: |t| t.interest_earned },
    Rule { column: "total_trans_amt", constraint: Constraint::Positive, value: |t| t.total_trans_amt },
    Rule { column: "annual_fees", constraint: Constraint::NonNegative, value: |t| t.annual_fees },
    Rule {
        column: "total_trans_count",
        constraint: Constraint::Positive,
        value: |t| t.total_trans_count as f64,
    },
];

impl Record for Transaction {
    const TABLE: &'static str = "transactions";
    const REQUIRED_COLUMNS: &'static [&'static str] = TRANSACTION_COLUMNS;
    const ID_COLUMN: &'static str = "transaction_id";

    fn id(&self) -> &str {
        &self.transaction_id
    }

    fn rules() -> &'static [Rule<Self>] {
        TRANSACTION_RULES
    }

    fn from_row(row: &RowReader<'_>) -> ReportResult<Self> {
        Ok(Self {
            transaction_id: row.text("transaction_id")?,
            date: row.date("date")?,
            card_category: row.text("card_category")?,
            revenue: row.amount("revenue")?,
            interest_earned: row.amount("interest_earned")?,
            total_trans_amt: row.amount("total_trans_amt")?,
            annual_fees: row.amount("annual_fees")?,
            total_trans_count: row.parse("total_trans_count")?,
            customer_job: row.text("customer_job")?,
            education_level: row.text("education_level")?,
            use_chip: row.text("use_chip")?,
            exp_type: row.text("exp_type")?,
            quarter: row.parse("quarter")?,
            month: row.text("month")?,
            gender: row.text("gender")?,
            age_group: row.text("age_group")?,
            income_group: row.text("income_group")?,
        })
    }
}

// ── Customers ────────────────────────────────────────────────────────────────

pub const CUSTOMER_COLUMNS: &[&str] = &[
    "customer_id",
    "gender",
    "age_group",
    "income_group",
    "education_level",
    "marital_status",
    "state",
    "customer_job",
    "total_income",
    "cust_satisfaction_score",
];

pub const SATISFACTION_MIN: f64 = 1.0;
pub const SATISFACTION_MAX: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub customer_id: RecordId,
    pub gender: String,
    pub age_group: String,
    pub income_group: String,
    pub education_level: String,
    pub marital_status: String,
    pub state: String,
    pub customer_job: String,
    pub total_income: f64,
    pub cust_satisfaction_score: f64,
}

const CUSTOMER_RULES: &[Rule<Customer>] = &[
    Rule { column: "total_income", constraint: Constraint::NonNegative, value: |c| c.total_income },
    Rule {
        column: "cust_satisfaction_score",
        constraint: Constraint::Within { min: SATISFACTION_MIN, max: SATISFACTION_MAX },
        value: |c| c.cust_satisfaction_score,
    },
];

impl Record for Customer {
    const TABLE: &'static str = "customers";
    const REQUIRED_COLUMNS: &'static [&'static str] = CUSTOMER_COLUMNS;
    const ID_COLUMN: &'static str = "customer_id";

    fn id(&self) -> &str {
        &self.customer_id
    }

    fn rules() -> &'static [Rule<Self>] {
        CUSTOMER_RULES
    }

    fn from_row(row: &RowReader<'_>) -> ReportResult<Self> {
        Ok(Self {
            customer_id: row.text("customer_id")?,
            gender: row.text("gender")?,
            age_group: row.text("age_group")?,
            income_group: row.text("income_group")?,
            education_level: row.text("education_level")?,
            marital_status: row.text("marital_status")?,
            state: row.text("state")?,
            customer_job: row.text("customer_job")?,
            total_income: row.amount("total_income")?,
            cust_satisfaction_score: row.amount("cust_satisfaction_score")?,
        })
    }
}

// ── Row reader ───────────────────────────────────────────────────────────────

/// Column-name → position lookup for one CSV header.
pub type HeaderMap = HashMap<String, usize>;

/// Checked, by-name access to the cells of one CSV row.
pub struct RowReader<'a> {
    pub table: &'static str,
    pub index: RowIndex,
    record: &'a ByteRecord,
    headers: &'a HeaderMap,
}

impl<'a> RowReader<'a> {
    pub fn new(
        table: &'static str,
        index: RowIndex,
        record: &'a ByteRecord,
        headers: &'a HeaderMap,
    ) -> Self {
        Self { table, index, record, headers }
    }

    fn cell(&self, column: &str) -> ReportResult<&'a str> {
        let raw = self
            .headers
            .get(column)
            .and_then(|&pos| self.record.get(pos))
            .ok_or_else(|| self.error(column, "value is missing (short row)"))?;
        std::str::from_utf8(raw).map_err(|e| self.error(column, format!("value is not valid UTF-8: {e}")))
    }

    fn error(&self, column: &str, constraint: impl Into<String>) -> ReportError {
        ReportError::data_quality(self.table, column, constraint, Some(self.index))
    }

    /// Categorical text. Kept exactly as written; no trimming or case-folding.
    pub fn text(&self, column: &str) -> ReportResult<String> {
        Ok(self.cell(column)?.to_string())
    }

    /// A finite decimal amount. Empty cells and NaN/inf are rejected.
    pub fn amount(&self, column: &str) -> ReportResult<f64> {
        let raw = self.cell(column)?.trim();
        if raw.is_empty() {
            return Err(self.error(column, "numeric value is missing"));
        }
        let value: f64 = raw
            .parse()
            .map_err(|_| self.error(column, format!("cannot parse '{raw}' as a number")))?;
        if !value.is_finite() {
            return Err(self.error(column, format!("value '{raw}' is not finite")));
        }
        Ok(value)
    }

    /// ISO `YYYY-MM-DD` date.
    pub fn date(&self, column: &str) -> ReportResult<NaiveDate> {
        let raw = self.cell(column)?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| self.error(column, format!("cannot parse '{raw}' as a date: {e}")))
    }

    /// Any `FromStr` value (integers, quarters).
    pub fn parse<T>(&self, column: &str) -> ReportResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.cell(column)?;
        raw.trim()
            .parse()
            .map_err(|e| self.error(column, format!("cannot parse '{raw}': {e}")))
    }
}
