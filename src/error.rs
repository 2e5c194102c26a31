use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file format: {} (expected .csv, .xlsx, .xlsm, .xls or .ods)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Could not read {dataset} data from {}: {source}", path.display())]
    Load {
        dataset: &'static str,
        path: PathBuf,
        #[source]
        source: Box<AuditError>,
    },

    #[error("No store identifier column found in {dataset} data (expected one of: {expected})")]
    MissingStoreColumn {
        dataset: &'static str,
        expected: String,
    },

    #[error("Assignee mapping is missing the required '{column}' column")]
    MissingMappingColumn { column: &'static str },
}

pub type Result<T> = std::result::Result<T, AuditError>;
