use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReportError, ReportResult};

/// Everything the pipeline needs to know about where to read and write.
///
/// Load from a JSON file with `ReportConfig::load`; every field is
/// optional there and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Default: `data/credit_card_transactions.csv`
    pub transactions_path: PathBuf,
    /// Default: `data/credit_card_customers.csv`
    pub customers_path: PathBuf,
    /// Root of all artifacts. Default: `analysis`
    pub output_dir: PathBuf,
    /// CSV and JSON exports, relative to `output_dir`. Default: `exports`
    pub exports_subdir: PathBuf,
    /// Chart images, relative to `output_dir`. Default: `figures`
    pub figures_subdir: PathBuf,
    /// Default: true
    pub render_charts: bool,
    /// Satisfaction histogram bin count. Default: 20
    pub histogram_bins: usize,
    pub sample: SampleConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            transactions_path: PathBuf::from("data/credit_card_transactions.csv"),
            customers_path: PathBuf::from("data/credit_card_customers.csv"),
            output_dir: PathBuf::from("analysis"),
            exports_subdir: PathBuf::from("exports"),
            figures_subdir: PathBuf::from("figures"),
            render_charts: true,
            histogram_bins: 20,
            sample: SampleConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("Cannot read {}: {e}", path.display())))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .map_err(|e| ReportError::Config(format!("Cannot parse {}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings no run could succeed with.
    pub fn check(&self) -> ReportResult<()> {
        if self.histogram_bins == 0 {
            return Err(ReportError::Config("histogram_bins must be at least 1".into()));
        }
        Ok(())
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.output_dir.join(&self.exports_subdir)
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.output_dir.join(&self.figures_subdir)
    }

    /// Defaults rooted in `dir`, for tests and one-off runs.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            transactions_path: dir.join("data/credit_card_transactions.csv"),
            customers_path: dir.join("data/credit_card_customers.csv"),
            output_dir: dir.join("analysis"),
            ..Self::default()
        }
    }
}

/// Synthetic input generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub seed: u64,
    pub transaction_rows: usize,
    pub customer_rows: usize,
    /// First day of the generated year, ISO `YYYY-MM-DD`.
    pub start_date: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            transaction_rows: 5000,
            customer_rows: 2000,
            start_date: "2023-01-01".into(),
        }
    }
}
