//! Export coordinator and end-to-end pipeline tests.

use card_analytics_core::{
    aggregate::{compute_kpis, AggregationResult},
    chart::{ChartRenderer, PngRenderer},
    config::{ReportConfig, SampleConfig},
    error::{ReportError, ReportResult},
    export::{write_records, write_summary, CHARTS, SATISFACTION_CHART_FILE, SUMMARY_FILE},
    pipeline::ReportPipeline,
    record::{Customer, Table, Transaction},
    sample::write_sample,
    types::Quarter,
    validate::validate,
};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

const CSV_ARTIFACTS: [&str; 8] = [
    "revenue_by_card_category.csv",
    "revenue_by_customer_job.csv",
    "revenue_by_education_level.csv",
    "chip_usage_share.csv",
    "transaction_count_by_exp_type.csv",
    "revenue_by_quarter.csv",
    "total_income_by_income_group.csv",
    "avg_satisfaction_by_job.csv",
];

/// Records which charts were requested without touching the disk.
#[derive(Default)]
struct RecordingRenderer {
    calls: RefCell<Vec<String>>,
}

impl ChartRenderer for RecordingRenderer {
    fn bar_chart(&self, result: &AggregationResult, _path: &Path) -> ReportResult<()> {
        self.calls.borrow_mut().push(format!("bar:{}", result.name));
        Ok(())
    }

    fn pie_chart(&self, result: &AggregationResult, _path: &Path) -> ReportResult<()> {
        self.calls.borrow_mut().push(format!("pie:{}", result.name));
        Ok(())
    }

    fn histogram(&self, values: &[f64], bins: usize, _range: (f64, f64), _path: &Path) -> ReportResult<()> {
        self.calls.borrow_mut().push(format!("hist:{}:{bins}", values.len()));
        Ok(())
    }
}

fn tx(id: &str, card: &str, revenue: f64, quarter: Quarter) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        date: NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
        card_category: card.into(),
        revenue,
        interest_earned: 0.5,
        total_trans_amt: 250.0,
        annual_fees: 49.0,
        total_trans_count: 1,
        customer_job: "Selfemployed".into(),
        education_level: "Unknown".into(),
        use_chip: "Chip".into(),
        exp_type: "Food".into(),
        quarter,
        month: "May".into(),
        gender: "M".into(),
        age_group: "20-30".into(),
        income_group: "Low".into(),
    }
}

fn customer(id: &str, score: f64) -> Customer {
    Customer {
        customer_id: id.into(),
        gender: "F".into(),
        age_group: "60+".into(),
        income_group: "Med".into(),
        education_level: "High School".into(),
        marital_status: "Unknown".into(),
        state: "GA".into(),
        customer_job: "Retirees".into(),
        total_income: 40_000.125,
        cust_satisfaction_score: score,
    }
}

fn config_in(dir: &Path, charts: bool) -> ReportConfig {
    ReportConfig { render_charts: charts, ..ReportConfig::rooted_at(dir) }
}

fn write_inputs(config: &ReportConfig, tx: &[Transaction], cs: &[Customer]) {
    fs::create_dir_all(config.transactions_path.parent().unwrap()).unwrap();
    write_records(&config.transactions_path, tx).unwrap();
    write_records(&config.customers_path, cs).unwrap();
}

fn write_generated_inputs(config: &ReportConfig) {
    let sample = SampleConfig { seed: 3, transaction_rows: 400, customer_rows: 150, ..SampleConfig::default() };
    write_sample(&sample, &config.transactions_path, &config.customers_path).unwrap();
}

// ── Tabular and JSON sinks ───────────────────────────────────────────────────

#[test]
fn worked_example_exports_rounded_csv_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), false);
    write_inputs(
        &config,
        &[
            tx("T1", "Blue", 10.0, Quarter::Q2),
            tx("T2", "Blue", 20.0, Quarter::Q1),
            tx("T3", "Gold", 5.0, Quarter::Q2),
        ],
        &[customer("C1", 4.0), customer("C2", 2.5)],
    );

    let outcome = ReportPipeline::new(config.clone()).run(&RecordingRenderer::default()).unwrap();
    assert!(outcome.exports.is_success());
    assert_eq!(outcome.exports.written.len(), 9);

    let exports = config.exports_dir();
    let by_card = fs::read_to_string(exports.join("revenue_by_card_category.csv")).unwrap();
    assert_eq!(by_card, "card_category,revenue\nBlue,30.00\nGold,5.00\n");

    let by_quarter = fs::read_to_string(exports.join("revenue_by_quarter.csv")).unwrap();
    assert_eq!(by_quarter, "quarter,revenue\nQ1,20.00\nQ2,15.00\n");

    let share = fs::read_to_string(exports.join("chip_usage_share.csv")).unwrap();
    assert_eq!(share, "use_chip,share\nChip,1.0000\n");

    let counts = fs::read_to_string(exports.join("transaction_count_by_exp_type.csv")).unwrap();
    assert_eq!(counts, "exp_type,txn_count\nFood,3\n");

    let summary = fs::read_to_string(exports.join(SUMMARY_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&summary).unwrap();
    let kpis = &json["kpis"];
    assert_eq!(kpis.as_object().unwrap().len(), 9);
    assert_eq!(kpis["total_revenue"], 35.0);
    assert_eq!(kpis["total_annual_fees"], 147.0);
    assert_eq!(kpis["total_transaction_count"], 3);
    assert_eq!(kpis["num_rows_customers"], 2);
    assert_eq!(kpis["avg_satisfaction"], 3.25);
    assert_eq!(kpis["total_income"], 80_000.25);
    assert!(summary.find("total_revenue").unwrap() < summary.find("total_income").unwrap());
}

#[test]
fn one_failed_artifact_does_not_stop_the_others() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), false);
    write_generated_inputs(&config);

    // A directory where the file should go makes exactly one write fail.
    fs::create_dir_all(config.exports_dir().join("revenue_by_quarter.csv")).unwrap();

    let outcome = ReportPipeline::new(config.clone()).run(&RecordingRenderer::default()).unwrap();
    assert_eq!(outcome.exports.failed_artifacts(), vec!["revenue_by_quarter.csv"]);
    assert_eq!(outcome.exports.written.len(), 8);
    assert_eq!(outcome.exports.failures[0].exit_code(), 2);

    for file in CSV_ARTIFACTS.iter().filter(|f| **f != "revenue_by_quarter.csv") {
        assert!(config.exports_dir().join(file).is_file(), "{file} should be written");
    }
    assert!(config.exports_dir().join(SUMMARY_FILE).is_file());
}

#[test]
fn rerun_produces_byte_identical_exports() {
    let dir = TempDir::new().unwrap();
    let first = config_in(dir.path(), false);
    write_generated_inputs(&first);
    let second = ReportConfig { output_dir: dir.path().join("second"), ..first.clone() };

    let a = ReportPipeline::new(first.clone()).run(&RecordingRenderer::default()).unwrap();
    let b = ReportPipeline::new(second.clone()).run(&RecordingRenderer::default()).unwrap();
    assert_eq!(a.report.kpis, b.report.kpis);

    for file in CSV_ARTIFACTS.iter().chain([SUMMARY_FILE].iter()) {
        let left = fs::read(first.exports_dir().join(file)).unwrap();
        let right = fs::read(second.exports_dir().join(file)).unwrap();
        assert_eq!(left, right, "{file} differs between runs");
    }
}

// ── Charts ───────────────────────────────────────────────────────────────────

#[test]
fn charts_are_requested_for_the_declared_results() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), true);
    write_generated_inputs(&config);

    let renderer = RecordingRenderer::default();
    let outcome = ReportPipeline::new(config).run(&renderer).unwrap();
    assert!(outcome.exports.is_success());

    let calls = renderer.calls.into_inner();
    assert_eq!(
        calls,
        vec![
            "bar:revenue_by_card_category",
            "bar:revenue_by_customer_job",
            "bar:revenue_by_education_level",
            "bar:transaction_count_by_exp_type",
            "bar:revenue_by_quarter",
            "pie:chip_usage_share",
            "hist:150:20",
        ]
    );
}

#[test]
fn png_renderer_writes_every_figure() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), true);
    write_generated_inputs(&config);

    let renderer = PngRenderer { width: 160, height: 120, margin: 12 };
    let outcome = ReportPipeline::new(config.clone()).run(&renderer).unwrap();
    assert!(outcome.exports.is_success(), "{:?}", outcome.exports.failed_artifacts());
    assert_eq!(outcome.exports.written.len(), 9 + CHARTS.len() + 1);

    let files = CHARTS.iter().map(|(_, _, file)| *file).chain([SATISFACTION_CHART_FILE]);
    for file in files {
        let bytes = fs::read(config.figures_dir().join(file)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n", "{file} is not a PNG");
    }
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[test]
fn empty_transactions_summary_writes_positive_zeros() {
    let dir = TempDir::new().unwrap();
    let tx = validate(Table::<Transaction>::new(vec![])).unwrap();
    let cs = validate(Table::new(vec![customer("C1", 3.0)])).unwrap();
    let path = dir.path().join(SUMMARY_FILE);
    write_summary(&path, &compute_kpis(&tx, &cs).unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("-0"), "negative zero in summary:\n{text}");
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["kpis"]["total_revenue"], 0.0);
}

#[test]
fn data_quality_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), true);
    write_inputs(&config, &[tx("T1", "Blue", 1.0, Quarter::Q1)], &[customer("C1", 5.5)]);

    let err = ReportPipeline::new(config.clone()).run(&RecordingRenderer::default()).unwrap_err();
    assert!(matches!(err, ReportError::DataQuality { ref column, .. } if column == "cust_satisfaction_score"));
    assert!(!config.output_dir.exists());
}

#[test]
fn missing_input_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = ReportPipeline::new(config_in(dir.path(), false)).validate().unwrap_err();
    assert!(matches!(err, ReportError::Io(_)));
    assert_eq!(err.exit_code(), 3);
}
