//! Synthetic input generation.
//!
//! Produces transaction and customer tables with the same schema the
//! pipeline reads. All generation is deterministic: same seed and row
//! counts, byte-identical CSVs.

use crate::{
    aggregate::round_to,
    config::SampleConfig,
    error::{ReportError, ReportResult},
    export::write_records,
    record::{Customer, Table, Transaction},
    rng::{RngBank, SampleRng, Stream},
    types::Quarter,
};
use chrono::{Datelike, Days, NaiveDate};
use std::fs;
use std::path::Path;

const CARD_CATEGORIES: &[(&str, u32)] = &[("Blue", 70), ("Gold", 10), ("Platinum", 10), ("Silver", 10)];
const CUSTOMER_JOBS: &[&str] = &["Businessman", "White-collar", "Selfemployed", "Govt", "Blue-collar", "Retirees"];
const EDUCATION_LEVELS: &[&str] = &["Graduate", "High School", "Unknown", "Uneducated", "Post-Graduate", "Doctorate"];
const CHANNELS: &[(&str, u32)] = &[("Swipe", 63), ("Chip", 31), ("Online", 6)];
const EXPENSE_TYPES: &[(&str, u32)] = &[
    ("Bills", 28),
    ("Entertainment", 19),
    ("Fuel", 18),
    ("Grocery", 16),
    ("Food", 13),
    ("Travel", 6),
];
const INCOME_GROUPS: &[&str] = &["Low", "Med", "High"];
const GENDERS: &[&str] = &["F", "M"];
const AGE_GROUPS: &[(&str, u32)] = &[("20-30", 10), ("30-40", 20), ("40-50", 35), ("50-60", 25), ("60+", 10)];
const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
const ANNUAL_FEES: &[f64] = &[0.0, 0.0, 0.0, 49.0, 99.0, 199.0];
const STATES: &[&str] = &["TX", "NY", "CA", "FL", "NJ", "IL", "PA", "GA", "NC", "MI"];
const MARITAL_STATUSES: &[&str] = &["Single", "Married", "Unknown"];

fn money(v: f64) -> f64 {
    round_to(v, 2)
}

fn transaction(rng: &mut SampleRng, index: usize, start: NaiveDate) -> ReportResult<Transaction> {
    let offset = rng.int_inclusive(0, 364);
    let date = start
        .checked_add_days(Days::new(offset))
        .ok_or_else(|| ReportError::Config(format!("start date {start} + {offset} days overflows")))?;
    let month = date.month();
    let quarter = Quarter::from_month(month)
        .ok_or_else(|| ReportError::Config(format!("month {month} has no quarter")))?;

    let card_category = rng.weighted(CARD_CATEGORIES).to_string();
    let customer_job = rng.pick(CUSTOMER_JOBS).to_string();
    let education_level = rng.pick(EDUCATION_LEVELS).to_string();
    let use_chip = rng.weighted(CHANNELS).to_string();
    let exp_type = rng.weighted(EXPENSE_TYPES).to_string();
    let income_group = rng.pick(INCOME_GROUPS).to_string();
    let gender = rng.pick(GENDERS).to_string();
    let age_group = rng.weighted(AGE_GROUPS).to_string();

    let total_trans_amt = money(rng.uniform(20.0, 2500.0));
    let revenue = money(total_trans_amt * rng.uniform(0.01, 0.06));
    let interest_earned = money(total_trans_amt * rng.uniform(0.0, 0.03));
    let annual_fees = *rng.pick(ANNUAL_FEES);
    let total_trans_count = rng.int_inclusive(1, 5);

    Ok(Transaction {
        transaction_id: format!("T{:07}", index + 1),
        date,
        card_category,
        revenue,
        interest_earned,
        total_trans_amt,
        annual_fees,
        total_trans_count,
        customer_job,
        education_level,
        use_chip,
        exp_type,
        quarter,
        month: MONTHS[date.month0() as usize].to_string(),
        gender,
        age_group,
        income_group,
    })
}

fn customer(rng: &mut SampleRng, index: usize) -> Customer {
    Customer {
        customer_id: format!("C{:06}", index + 1),
        gender: rng.pick(GENDERS).to_string(),
        age_group: rng.weighted(AGE_GROUPS).to_string(),
        income_group: rng.pick(INCOME_GROUPS).to_string(),
        education_level: rng.pick(EDUCATION_LEVELS).to_string(),
        customer_job: rng.pick(CUSTOMER_JOBS).to_string(),
        state: rng.pick(STATES).to_string(),
        marital_status: rng.pick(MARITAL_STATUSES).to_string(),
        total_income: money(rng.uniform(15_000.0, 250_000.0)),
        cust_satisfaction_score: money(rng.uniform(1.0, 5.0)),
    }
}

pub fn generate_transactions(config: &SampleConfig) -> ReportResult<Table<Transaction>> {
    let start = NaiveDate::parse_from_str(&config.start_date, "%Y-%m-%d")
        .map_err(|e| ReportError::Config(format!("invalid start_date '{}': {e}", config.start_date)))?;
    let mut rng = RngBank::new(config.seed).for_stream(Stream::Transactions);
    log::debug!("generating {} rows on stream '{}'", config.transaction_rows, rng.name);
    let rows = (0..config.transaction_rows)
        .map(|i| transaction(&mut rng, i, start))
        .collect::<ReportResult<Vec<_>>>()?;
    Ok(Table::new(rows))
}

pub fn generate_customers(config: &SampleConfig) -> Table<Customer> {
    let mut rng = RngBank::new(config.seed).for_stream(Stream::Customers);
    log::debug!("generating {} rows on stream '{}'", config.customer_rows, rng.name);
    Table::new((0..config.customer_rows).map(|i| customer(&mut rng, i)).collect())
}

/// Generate both tables and write them as CSV, creating parent dirs.
pub fn write_sample(config: &SampleConfig, transactions_path: &Path, customers_path: &Path) -> ReportResult<()> {
    let transactions = generate_transactions(config)?;
    let customers = generate_customers(config);

    for path in [transactions_path, customers_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }
    write_records(transactions_path, &transactions.rows)?;
    write_records(customers_path, &customers.rows)?;

    log::info!(
        "generated {} transactions and {} customers (seed {})",
        transactions.len(),
        customers.len(),
        config.seed
    );
    Ok(())
}
