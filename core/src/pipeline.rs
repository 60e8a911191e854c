//! The batch pipeline: load → validate → aggregate → export.
//!
//! EXECUTION ORDER (fixed, strictly sequential):
//!   1. Load transactions, then customers (schema check at the header)
//!   2. Validate transactions, then customers (row invariants)
//!   3. Compute KPIs and the eight aggregations
//!   4. Export every artifact, collecting failures
//!
//! RULES:
//!   - Steps 1–2 fail fast; nothing is aggregated from a bad table.
//!   - Step 4 never fails fast; see export.rs.
//!   - No state survives between runs except the written artifacts.

use crate::{
    aggregate::{build_report, AnalyticsReport},
    chart::ChartRenderer,
    config::ReportConfig,
    error::ReportResult,
    export::{ExportCoordinator, ExportReport},
    ingest::load_table,
    record::{Customer, Transaction},
    validate::{validate_inputs, Validated, ValidationReport},
};

/// Result of a full report run that got past validation.
#[derive(Debug)]
pub struct RunOutcome {
    pub validation: ValidationReport,
    pub report: AnalyticsReport,
    pub exports: ExportReport,
}

pub struct ReportPipeline {
    pub config: ReportConfig,
}

impl ReportPipeline {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Steps 1–2 only.
    pub fn load_validated(
        &self,
    ) -> ReportResult<(Validated<Transaction>, Validated<Customer>, ValidationReport)> {
        let transactions = load_table::<Transaction>(&self.config.transactions_path)?;
        let customers = load_table::<Customer>(&self.config.customers_path)?;
        validate_inputs(transactions, customers)
    }

    /// The `validate` command.
    pub fn validate(&self) -> ReportResult<ValidationReport> {
        self.load_validated().map(|(_, _, report)| report)
    }

    /// Steps 1–3: everything except writing.
    pub fn analyze(&self) -> ReportResult<(ValidationReport, AnalyticsReport)> {
        let (transactions, customers, validation) = self.load_validated()?;
        let report = build_report(&transactions, &customers)?;
        Ok((validation, report))
    }

    /// The `report` command. Errors only on load/validation failures;
    /// export failures are returned inside the outcome.
    pub fn run(&self, renderer: &dyn ChartRenderer) -> ReportResult<RunOutcome> {
        let (validation, report) = self.analyze()?;
        let exports = ExportCoordinator::new(&self.config, renderer).export_all(&report);
        Ok(RunOutcome { validation, report, exports })
    }
}
