//! Card analytics batch report.
//!
//! Validates card-transaction and customer CSVs, computes KPIs and
//! grouped aggregations, and exports CSV, JSON and PNG artifacts.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod record;
pub mod rng;
pub mod sample;
pub mod types;
pub mod validate;
