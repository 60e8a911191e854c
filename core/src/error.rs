use crate::types::RowIndex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Schema error: table '{table}' is missing columns: {}", .missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    #[error(
        "Data quality error: table '{table}', column '{column}': {constraint}{}",
        row_suffix(.row)
    )]
    DataQuality {
        table: String,
        column: String,
        constraint: String,
        row: Option<RowIndex>,
    },

    #[error("Export of '{artifact}' failed: {source}")]
    Export {
        artifact: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    pub fn data_quality(
        table: &str,
        column: &str,
        constraint: impl Into<String>,
        row: Option<RowIndex>,
    ) -> Self {
        Self::DataQuality {
            table: table.to_string(),
            column: column.to_string(),
            constraint: constraint.into(),
            row,
        }
    }

    /// Wrap any lower-level failure as the export failure of one artifact.
    pub fn export(artifact: &str, cause: ReportError) -> Self {
        Self::Export {
            artifact: artifact.to_string(),
            source: Box::new(cause),
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Schema { .. } | Self::DataQuality { .. } => 1,
            Self::Export { .. } => 2,
            _ => 3,
        }
    }
}

fn row_suffix(row: &Option<RowIndex>) -> String {
    match row {
        Some(r) => format!(" (row {r})"),
        None => String::new(),
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_missing_column() {
        let err = ReportError::Schema {
            table: "transactions".into(),
            missing: vec!["revenue".into(), "quarter".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("revenue, quarter"), "{msg}");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn data_quality_message_carries_row() {
        let err = ReportError::data_quality("customers", "cust_satisfaction_score", "must be within [1, 5]", Some(7));
        assert!(err.to_string().ends_with("(row 7)"));
        let err = ReportError::data_quality("customers", "cust_satisfaction_score", "mean over empty table", None);
        assert!(!err.to_string().contains("row"));
    }
}
