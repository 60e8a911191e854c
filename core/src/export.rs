//! Export coordinator. The only component that writes to disk.
//!
//! RULE: a failed artifact never stops the batch. Every artifact is
//! attempted; failures are collected and reported together at the end.
//!
//! Artifacts (relative to the configured output directory):
//!   exports/summary_kpis.json        KPI summary
//!   exports/<aggregation>.csv        one per aggregation result
//!   figures/*.png                    bar, pie and histogram charts

use crate::{
    aggregate::{AggregationResult, AnalyticsReport, KpiSummary},
    chart::ChartRenderer,
    config::ReportConfig,
    error::{ReportError, ReportResult},
    record::{SATISFACTION_MAX, SATISFACTION_MIN},
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary_kpis.json";
pub const SATISFACTION_CHART_FILE: &str = "satisfaction_distribution.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
}

/// Which aggregation results get a chart, and under what file name.
pub const CHARTS: &[(&str, ChartKind, &str)] = &[
    ("revenue_by_card_category", ChartKind::Bar, "revenue_by_card_category.png"),
    ("revenue_by_customer_job", ChartKind::Bar, "revenue_by_customer_job.png"),
    ("revenue_by_education_level", ChartKind::Bar, "revenue_by_education_level.png"),
    ("transaction_count_by_exp_type", ChartKind::Bar, "txn_count_by_exp_type.png"),
    ("revenue_by_quarter", ChartKind::Bar, "revenue_by_quarter.png"),
    ("chip_usage_share", ChartKind::Pie, "chip_usage_share.png"),
];

#[derive(Serialize)]
struct SummaryFile<'a> {
    kpis: &'a KpiSummary,
}

// ── Sinks ────────────────────────────────────────────────────────────────────

/// Pretty-printed `{"kpis": {...}}` with currency rounded to 2 dp.
pub fn write_summary(path: &Path, kpis: &KpiSummary) -> ReportResult<()> {
    let rounded = kpis.rounded();
    let mut json = serde_json::to_string_pretty(&SummaryFile { kpis: &rounded })?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

/// Two-column CSV: key column, metric column at the result's precision.
pub fn write_aggregation_csv(path: &Path, result: &AggregationResult) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([result.key_column, result.metric_column])?;
    for row in &result.rows {
        writer.write_record([row.key.as_str(), result.precision.format(row.value).as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize rows with a header taken from the record's field names.
pub fn write_records<R: Serialize>(path: &Path, rows: &[R]) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ── Coordinator ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// One `ReportError::Export` per failed artifact.
    pub failures: Vec<ReportError>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_artifacts(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|e| match e {
                ReportError::Export { artifact, .. } => Some(artifact.as_str()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, artifact: &str, path: PathBuf, outcome: ReportResult<()>) {
        match outcome {
            Ok(()) => {
                log::info!("wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                log::warn!("export of {artifact} to {} failed: {e}", path.display());
                self.failures.push(ReportError::export(artifact, e));
            }
        }
    }
}

pub struct ExportCoordinator<'a> {
    config: &'a ReportConfig,
    renderer: &'a dyn ChartRenderer,
}

impl<'a> ExportCoordinator<'a> {
    pub fn new(config: &'a ReportConfig, renderer: &'a dyn ChartRenderer) -> Self {
        Self { config, renderer }
    }

    /// Write every artifact of `report`. Never stops early.
    pub fn export_all(&self, report: &AnalyticsReport) -> ExportReport {
        let mut out = ExportReport::default();

        let exports_dir = self.config.exports_dir();
        ensure_dir(&exports_dir);

        let path = exports_dir.join(SUMMARY_FILE);
        out.record(SUMMARY_FILE, path.clone(), write_summary(&path, &report.kpis));

        for result in &report.aggregations {
            let file = format!("{}.csv", result.name);
            let path = exports_dir.join(&file);
            out.record(&file, path.clone(), write_aggregation_csv(&path, result));
        }

        if self.config.render_charts {
            self.export_charts(report, &mut out);
        }

        log::info!(
            "export finished: {} written, {} failed",
            out.written.len(),
            out.failures.len()
        );
        out
    }

    fn export_charts(&self, report: &AnalyticsReport, out: &mut ExportReport) {
        let figures_dir = self.config.figures_dir();
        ensure_dir(&figures_dir);

        for &(name, kind, file) in CHARTS {
            let path = figures_dir.join(file);
            let outcome = match report.aggregation(name) {
                Some(result) => match kind {
                    ChartKind::Bar => self.renderer.bar_chart(result, &path),
                    ChartKind::Pie => self.renderer.pie_chart(result, &path),
                },
                None => Err(ReportError::Other(anyhow::anyhow!(
                    "aggregation '{name}' missing from report"
                ))),
            };
            out.record(file, path, outcome);
        }

        let path = figures_dir.join(SATISFACTION_CHART_FILE);
        let outcome = self.renderer.histogram(
            &report.satisfaction_scores,
            self.config.histogram_bins,
            (SATISFACTION_MIN, SATISFACTION_MAX),
            &path,
        );
        out.record(SATISFACTION_CHART_FILE, path, outcome);
    }
}

/// A failure here surfaces again as a write failure per artifact.
fn ensure_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        log::warn!("cannot create {}: {e}", dir.display());
    }
}
