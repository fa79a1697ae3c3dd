//! SheetLedger - an in/out ledger kept in spreadsheet-style tables.
//!
//! The ledger logic lives in `sheetledger-core`; this crate adds the HTTP API,
//! configuration, telemetry and the command-line front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod render;
pub mod telemetry;
