use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApAnalyticsError {
    #[error("Raw input could not be read as a table: {0}")]
    FatalInput(String),

    #[error("Required column missing from raw input: {0}")]
    MissingColumn(String),

    #[error("Row {row} has {found} cells but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApAnalyticsError>;
