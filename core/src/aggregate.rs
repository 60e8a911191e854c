//! Aggregation engine: KPIs and grouped summaries.
//!
//! Two operation families:
//!   1. KPI computation: fixed named scalars over whole tables.
//!   2. Grouped aggregation: group one table on a categorical key and
//!      reduce a numeric column (sum, mean, count or share).
//!
//! RULES:
//!   - Only `Validated` tables are accepted.
//!   - Group keys compare by exact match. No trimming, no case-folding.
//!   - Descending sorts break ties by ascending key order.
//!   - Values keep full precision here; rounding is applied at export.

use crate::{
    error::{ReportError, ReportResult},
    record::{Customer, Table, Transaction},
    validate::Validated,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

// ── Reductions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    /// Proportion of rows in each group.
    Count,
    /// Proportion of the metric total in each group.
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
    Share(ShareBasis),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Largest metric first, ties by ascending key.
    MetricDescending,
    /// Natural key order (lexicographic strings, numeric quarters).
    KeyAscending,
}

/// Export precision of a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Currency amounts: 2 decimal places.
    Currency,
    /// Whole counts.
    Integer,
    /// Shares and mean scores: 4 decimal places.
    Ratio,
}

impl Precision {
    pub fn decimals(&self) -> usize {
        match self {
            Self::Currency => 2,
            Self::Integer => 0,
            Self::Ratio => 4,
        }
    }

    pub fn round(&self, value: f64) -> f64 {
        round_to(value, self.decimals())
    }

    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimals(), self.round(value))
    }
}

pub fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
}

/// Group `rows` by `key` and reduce `metric` per group.
///
/// Groups exist only for observed keys, so no group is ever empty.
/// A `Share` whose grand total is zero yields 0.0 for every group.
pub fn group_by<'a, R, K, FK, FM>(
    rows: &'a [R],
    key: FK,
    metric: FM,
    reduction: Reduction,
    order: SortOrder,
) -> Vec<(K, f64)>
where
    K: Ord,
    FK: Fn(&'a R) -> K,
    FM: Fn(&'a R) -> f64,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(key(row)).or_default();
        acc.sum += metric(row);
        acc.count += 1;
    }

    let mut out: Vec<(K, f64)> = match reduction {
        Reduction::Sum => groups.into_iter().map(|(k, a)| (k, a.sum)).collect(),
        Reduction::Mean => groups
            .into_iter()
            .map(|(k, a)| (k, a.sum / a.count as f64))
            .collect(),
        Reduction::Count => groups
            .into_iter()
            .map(|(k, a)| (k, a.count as f64))
            .collect(),
        Reduction::Share(basis) => {
            let parts: Vec<(K, f64)> = groups
                .into_iter()
                .map(|(k, a)| match basis {
                    ShareBasis::Count => (k, a.count as f64),
                    ShareBasis::Sum => (k, a.sum),
                })
                .collect();
            let total = parts.iter().fold(0.0, |acc, (_, v)| acc + v);
            parts
                .into_iter()
                .map(|(k, v)| (k, if total == 0.0 { 0.0 } else { v / total }))
                .collect()
        }
    };

    if order == SortOrder::MetricDescending {
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    }
    out
}

// ── Aggregation results ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: String,
    pub value: f64,
}

/// An ordered (key, metric) list ready for export and charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub name: &'static str,
    pub key_column: &'static str,
    pub metric_column: &'static str,
    pub reduction: Reduction,
    pub precision: Precision,
    pub rows: Vec<GroupRow>,
}

impl AggregationResult {
    pub fn total(&self) -> f64 {
        self.rows.iter().fold(0.0, |acc, r| acc + r.value)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.key.as_str()).collect()
    }

    pub fn value_of(&self, key: &str) -> Option<f64> {
        self.rows.iter().find(|r| r.key == key).map(|r| r.value)
    }
}

/// Declarative description of one grouped aggregation.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub name: &'static str,
    pub key_column: &'static str,
    pub metric_column: &'static str,
    pub reduction: Reduction,
    pub order: SortOrder,
    pub precision: Precision,
}

impl GroupSpec {
    pub fn apply<'a, R, K, FK, FM>(&self, rows: &'a [R], key: FK, metric: FM) -> AggregationResult
    where
        K: Ord + Display,
        FK: Fn(&'a R) -> K,
        FM: Fn(&'a R) -> f64,
    {
        let rows = group_by(rows, key, metric, self.reduction, self.order)
            .into_iter()
            .map(|(k, value)| GroupRow { key: k.to_string(), value })
            .collect();
        AggregationResult {
            name: self.name,
            key_column: self.key_column,
            metric_column: self.metric_column,
            reduction: self.reduction,
            precision: self.precision,
            rows,
        }
    }
}

pub const REVENUE_BY_CARD_CATEGORY: GroupSpec = GroupSpec {
    name: "revenue_by_card_category",
    key_column: "card_category",
    metric_column: "revenue",
    reduction: Reduction::Sum,
    order: SortOrder::MetricDescending,
    precision: Precision::Currency,
};

pub const REVENUE_BY_CUSTOMER_JOB: GroupSpec = GroupSpec {
    name: "revenue_by_customer_job",
    key_column: "customer_job",
    metric_column: "revenue",
    reduction: Reduction::Sum,
    order: SortOrder::MetricDescending,
    precision: Precision::Currency,
};

pub const REVENUE_BY_EDUCATION_LEVEL: GroupSpec = GroupSpec {
    name: "revenue_by_education_level",
    key_column: "education_level",
    metric_column: "revenue",
    reduction: Reduction::Sum,
    order: SortOrder::MetricDescending,
    precision: Precision::Currency,
};

pub const CHIP_USAGE_SHARE: GroupSpec = GroupSpec {
    name: "chip_usage_share",
    key_column: "use_chip",
    metric_column: "share",
    reduction: Reduction::Share(ShareBasis::Count),
    order: SortOrder::MetricDescending,
    precision: Precision::Ratio,
};

pub const TRANSACTION_COUNT_BY_EXP_TYPE: GroupSpec = GroupSpec {
    name: "transaction_count_by_exp_type",
    key_column: "exp_type",
    metric_column: "txn_count",
    reduction: Reduction::Count,
    order: SortOrder::MetricDescending,
    precision: Precision::Integer,
};

pub const REVENUE_BY_QUARTER: GroupSpec = GroupSpec {
    name: "revenue_by_quarter",
    key_column: "quarter",
    metric_column: "revenue",
    reduction: Reduction::Sum,
    order: SortOrder::KeyAscending,
    precision: Precision::Currency,
};

pub const TOTAL_INCOME_BY_INCOME_GROUP: GroupSpec = GroupSpec {
    name: "total_income_by_income_group",
    key_column: "income_group",
    metric_column: "total_income",
    reduction: Reduction::Sum,
    order: SortOrder::MetricDescending,
    precision: Precision::Currency,
};

pub const AVG_SATISFACTION_BY_JOB: GroupSpec = GroupSpec {
    name: "avg_satisfaction_by_job",
    key_column: "customer_job",
    metric_column: "cust_satisfaction_score",
    reduction: Reduction::Mean,
    order: SortOrder::MetricDescending,
    precision: Precision::Ratio,
};

pub fn revenue_by_card_category(tx: &Validated<Transaction>) -> AggregationResult {
    REVENUE_BY_CARD_CATEGORY.apply(tx.rows(), |t| t.card_category.as_str(), |t| t.revenue)
}

pub fn revenue_by_customer_job(tx: &Validated<Transaction>) -> AggregationResult {
    REVENUE_BY_CUSTOMER_JOB.apply(tx.rows(), |t| t.customer_job.as_str(), |t| t.revenue)
}

pub fn revenue_by_education_level(tx: &Validated<Transaction>) -> AggregationResult {
    REVENUE_BY_EDUCATION_LEVEL.apply(tx.rows(), |t| t.education_level.as_str(), |t| t.revenue)
}

pub fn chip_usage_share(tx: &Validated<Transaction>) -> AggregationResult {
    CHIP_USAGE_SHARE.apply(tx.rows(), |t| t.use_chip.as_str(), |_| 1.0)
}

pub fn transaction_count_by_exp_type(tx: &Validated<Transaction>) -> AggregationResult {
    TRANSACTION_COUNT_BY_EXP_TYPE.apply(tx.rows(), |t| t.exp_type.as_str(), |_| 1.0)
}

pub fn revenue_by_quarter(tx: &Validated<Transaction>) -> AggregationResult {
    REVENUE_BY_QUARTER.apply(tx.rows(), |t| t.quarter, |t| t.revenue)
}

pub fn total_income_by_income_group(cs: &Validated<Customer>) -> AggregationResult {
    TOTAL_INCOME_BY_INCOME_GROUP.apply(cs.rows(), |c| c.income_group.as_str(), |c| c.total_income)
}

pub fn avg_satisfaction_by_job(cs: &Validated<Customer>) -> AggregationResult {
    AVG_SATISFACTION_BY_JOB.apply(cs.rows(), |c| c.customer_job.as_str(), |c| c.cust_satisfaction_score)
}

/// The eight pipeline aggregations, in export order.
pub fn standard_aggregations(
    tx: &Validated<Transaction>,
    cs: &Validated<Customer>,
) -> Vec<AggregationResult> {
    vec![
        revenue_by_card_category(tx),
        revenue_by_customer_job(tx),
        revenue_by_education_level(tx),
        chip_usage_share(tx),
        transaction_count_by_exp_type(tx),
        revenue_by_quarter(tx),
        total_income_by_income_group(cs),
        avg_satisfaction_by_job(cs),
    ]
}

// ── KPIs ─────────────────────────────────────────────────────────────────────

/// Whole-table scalars. Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_interest: f64,
    pub total_transaction_amount: f64,
    pub total_annual_fees: f64,
    pub total_transaction_count: u64,
    pub num_rows_transactions: usize,
    pub num_rows_customers: usize,
    pub avg_satisfaction: f64,
    pub total_income: f64,
}

impl KpiSummary {
    /// Export form: currency to 2 dp, satisfaction to 4 dp.
    pub fn rounded(&self) -> Self {
        let money = |v: f64| Precision::Currency.round(v);
        Self {
            total_revenue: money(self.total_revenue),
            total_interest: money(self.total_interest),
            total_transaction_amount: money(self.total_transaction_amount),
            total_annual_fees: money(self.total_annual_fees),
            total_transaction_count: self.total_transaction_count,
            num_rows_transactions: self.num_rows_transactions,
            num_rows_customers: self.num_rows_customers,
            avg_satisfaction: Precision::Ratio.round(self.avg_satisfaction),
            total_income: money(self.total_income),
        }
    }
}

/// Folds from +0.0; `Iterator::sum` over no floats yields -0.0.
fn sum_of<R>(rows: &[R], value: impl Fn(&R) -> f64) -> f64 {
    rows.iter().fold(0.0, |acc, row| acc + value(row))
}

/// Totals of finite inputs can still overflow.
fn finite_total(table: &'static str, column: &str, total: f64) -> ReportResult<f64> {
    if total.is_finite() {
        Ok(total)
    } else {
        Err(ReportError::data_quality(table, column, "total overflows a finite number", None))
    }
}

/// Mean over an empty table is undefined and fails instead of yielding NaN.
fn mean_of<R>(table: &Table<R>, column: &str, value: impl Fn(&R) -> f64) -> ReportResult<f64> {
    if table.is_empty() {
        return Err(ReportError::data_quality(
            table.name,
            column,
            "mean is undefined over an empty table",
            None,
        ));
    }
    Ok(sum_of(&table.rows, value) / table.len() as f64)
}

pub fn compute_kpis(tx: &Validated<Transaction>, cs: &Validated<Customer>) -> ReportResult<KpiSummary> {
    let kpis = KpiSummary {
        total_revenue: finite_total(tx.name, "revenue", sum_of(tx.rows(), |t| t.revenue))?,
        total_interest: finite_total(tx.name, "interest_earned", sum_of(tx.rows(), |t| t.interest_earned))?,
        total_transaction_amount: finite_total(
            tx.name,
            "total_trans_amt",
            sum_of(tx.rows(), |t| t.total_trans_amt),
        )?,
        total_annual_fees: finite_total(tx.name, "annual_fees", sum_of(tx.rows(), |t| t.annual_fees))?,
        total_transaction_count: tx.rows().iter().map(|t| t.total_trans_count).sum(),
        num_rows_transactions: tx.len(),
        num_rows_customers: cs.len(),
        avg_satisfaction: mean_of(&**cs, "cust_satisfaction_score", |c| c.cust_satisfaction_score)?,
        total_income: finite_total(cs.name, "total_income", sum_of(cs.rows(), |c| c.total_income))?,
    };
    log::info!(
        "kpis: revenue={:.2} txn_amount={:.2} txn_count={} avg_satisfaction={:.4}",
        kpis.total_revenue,
        kpis.total_transaction_amount,
        kpis.total_transaction_count,
        kpis.avg_satisfaction
    );
    Ok(kpis)
}

// ── Full report ──────────────────────────────────────────────────────────────

/// Everything the export coordinator needs from one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    pub kpis: KpiSummary,
    pub aggregations: Vec<AggregationResult>,
    /// Raw scores for the satisfaction histogram.
    pub satisfaction_scores: Vec<f64>,
}

impl AnalyticsReport {
    pub fn aggregation(&self, name: &str) -> Option<&AggregationResult> {
        self.aggregations.iter().find(|a| a.name == name)
    }
}

pub fn build_report(tx: &Validated<Transaction>, cs: &Validated<Customer>) -> ReportResult<AnalyticsReport> {
    let kpis = compute_kpis(tx, cs)?;
    let aggregations = standard_aggregations(tx, cs);
    for agg in &aggregations {
        log::debug!("aggregation '{}': {} groups", agg.name, agg.rows.len());
    }
    Ok(AnalyticsReport {
        kpis,
        aggregations,
        satisfaction_scores: cs.rows().iter().map(|c| c.cust_satisfaction_score).collect(),
    })
}
