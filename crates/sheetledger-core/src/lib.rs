//! Core types and traits for SheetLedger table backends.
//!
//! This crate provides the `TableSource` trait, the row codec that maps ledger
//! entries onto spreadsheet rows, and the `LedgerStore` that implements ledger
//! CRUD on top of any table source.

pub mod access;
pub mod codec;
pub mod error;
pub mod export;
pub mod models;
pub mod report;
pub mod scope;
pub mod store;
pub mod table;

pub use access::{authenticate, CallerIdentity, CredentialVerifier, StaticCredentials};
pub use error::{LedgerError, Result};
pub use models::{Direction, EntryDraft, LedgerEntry};
pub use report::{monthly_report, DirectionTotals, MonthlyReport, YearMonth};
pub use scope::LedgerScope;
pub use store::{Ledger, LedgerStore, PositionToken};
pub use table::{Cell, CellGuard, RowPosition, TableError, TableSource};
