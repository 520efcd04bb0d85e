//! Error types for the import pipeline

use crate::sheets::SheetsError;
use thiserror::Error;

/// Errors scoped to a single input file (the run continues with the next
/// file) or to run setup (fatal, surfaced by the processor).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input directory not found: {0}")]
    InputDirNotFound(std::path::PathBuf),

    #[error("no .xls or .xlsx files in {0}")]
    NoInputFiles(std::path::PathBuf),

    #[error("malformed config file {path}: {message}")]
    InvalidConfig { path: std::path::PathBuf, message: String },

    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read workbook: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("header keywords not found: {}", missing.join(", "))]
    SchemaNotFound { missing: Vec<String> },

    #[error("could not detect the store from the file name: {0}")]
    StoreNotRecognized(String),

    #[error("no period in the file name and no manual period supplied")]
    PeriodMissing,

    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("no ledger worksheet (МП) found for store '{store}'")]
    TargetWorksheetNotFound { store: String },

    #[error("no aggregate block found for store '{store}'")]
    AggregateBlockNotFound { store: String },

    #[error(transparent)]
    Transport(#[from] SheetsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
