use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required column missing: {column}")]
    Schema { column: String },

    #[error("File has no header row")]
    EmptyFile,

    #[error("Row at line {line} has {found} fields but the header has {expected}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
