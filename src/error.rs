// Error taxonomy shared by the guard, the ledger and the record store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or blank required field; nothing was written
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fingerprint or recency match against an existing record
    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    /// Corrupt stored data met while computing statements
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::DuplicateRecord(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
