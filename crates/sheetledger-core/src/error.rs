use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("reference id not found: {0}")]
    ReferenceNotFound(String),
    #[error("entry {0} was modified by another writer")]
    ConcurrentModification(String),
    #[error("invalid username or password")]
    Authentication,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
