use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid fiscal year label '{0}': expected e.g. '2024-25'")]
    InvalidFiscalYear(String),

    #[error("Duplicate entity id in configuration: {0}")]
    DuplicateEntity(String),

    #[error("Duplicate person id in configuration: {0}")]
    DuplicatePerson(String),

    #[error("Profit identity violation for {entity_id}: {field} is {actual}, expected {expected}")]
    ProfitIdentityViolation {
        entity_id: String,
        field: String,
        actual: f64,
        expected: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsolidationError>;
