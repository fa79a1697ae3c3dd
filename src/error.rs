use sheetledger_core::{LedgerError, TableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Server error: {0}")]
    Server(String),
}
