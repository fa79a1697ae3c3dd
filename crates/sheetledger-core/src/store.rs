use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    codec::{self, REFERENCE_ID},
    error::{LedgerError, Result},
    models::{new_reference_id, EntryDraft, LedgerEntry},
    report::{self, MonthlyReport},
    table::{Cell, CellGuard, RowPosition, TableError, TableSource, FIRST_DATA_POSITION},
};

/// Handle to one owner's table, with the header row read when it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    name: Arc<str>,
    headers: Vec<Cell>,
    reference_column: usize,
}

impl Ledger {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Result of resolving a reference id: where the row sat when it was looked up.
/// Mutations go through only if the row still carries `reference_id` at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionToken {
    pub position: RowPosition,
    pub reference_id: String,
}

pub struct LedgerStore {
    tables: Arc<dyn TableSource>,
}

impl LedgerStore {
    pub fn new(tables: Arc<dyn TableSource>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Arc<dyn TableSource> {
        &self.tables
    }

    /// Opens the owner's table, creating it with the header row on first use.
    pub fn open_or_create(&self, owner: &str) -> Result<Ledger> {
        if !self.tables.table_exists(owner)? {
            match self.tables.create_table(owner, &codec::header_row()) {
                Ok(()) => info!(ledger = owner, "Created ledger table"),
                Err(TableError::TableAlreadyExists(_)) => debug!(ledger = owner, "Ledger table created concurrently"),
                Err(e) => return Err(e.into()),
            }
        }

        let headers = self.tables.header(owner)?;
        let reference_column = codec::column_of(&headers, REFERENCE_ID)
            .ok_or_else(|| LedgerError::MalformedRow(format!("table {} has no '{}' column", owner, REFERENCE_ID)))?;

        Ok(Ledger {
            name: Arc::from(owner),
            headers,
            reference_column,
        })
    }

    pub fn list_entries(&self, ledger: &Ledger) -> Result<Vec<LedgerEntry>> {
        self.tables
            .rows(&ledger.name)?
            .iter()
            .map(|row| codec::decode(row, &ledger.headers))
            .collect()
    }

    pub fn find_entry(&self, ledger: &Ledger, reference_id: &str) -> Result<LedgerEntry> {
        let (index, row) = self.locate(ledger, reference_id)?;
        debug!(ledger = %ledger.name, reference_id, index, "Found entry");
        codec::decode(&row, &ledger.headers)
    }

    pub fn append_entry(&self, ledger: &Ledger, draft: EntryDraft) -> Result<LedgerEntry> {
        draft.validate()?;
        let serial_number = self.tables.row_count(&ledger.name)? as u64 + 1;
        let entry = draft.into_entry(serial_number, new_reference_id())?;

        let position = self
            .tables
            .append_row(&ledger.name, &codec::encode_for(&entry, &ledger.headers)?)?;
        debug!(ledger = %ledger.name, reference_id = %entry.reference_id, position, "Appended entry");
        Ok(entry)
    }

    /// Finds the first row carrying `reference_id` and returns a token for a
    /// guarded update or delete.
    pub fn resolve(&self, ledger: &Ledger, reference_id: &str) -> Result<PositionToken> {
        let (index, _) = self.locate(ledger, reference_id)?;
        Ok(PositionToken {
            position: index + FIRST_DATA_POSITION,
            reference_id: reference_id.trim().to_string(),
        })
    }

    /// Overwrites the whole row behind `token`, keeping its reference id and
    /// recomputing the total. The serial number cell is rewritten with the
    /// row's physical position, the same value a spreadsheet row number shows.
    pub fn update_at(&self, ledger: &Ledger, token: &PositionToken, draft: EntryDraft) -> Result<LedgerEntry> {
        let entry = draft.into_entry(token.position as u64, token.reference_id.clone())?;
        let guard = self.guard(ledger, token);
        let cells = codec::encode_for(&entry, &ledger.headers)?;

        self.tables
            .update_row(&ledger.name, token.position, Some(&guard), &cells)
            .map_err(|e| conflict(e, &token.reference_id))?;
        debug!(ledger = %ledger.name, reference_id = %token.reference_id, position = token.position, "Updated entry");
        Ok(entry)
    }

    /// Removes the row behind `token`. Later rows move up one position; their
    /// serial numbers are left as they were.
    pub fn delete_at(&self, ledger: &Ledger, token: &PositionToken) -> Result<()> {
        let guard = self.guard(ledger, token);

        self.tables
            .delete_row(&ledger.name, token.position, Some(&guard))
            .map_err(|e| conflict(e, &token.reference_id))?;
        debug!(ledger = %ledger.name, reference_id = %token.reference_id, position = token.position, "Deleted entry");
        Ok(())
    }

    pub fn update_entry(&self, ledger: &Ledger, reference_id: &str, draft: EntryDraft) -> Result<LedgerEntry> {
        draft.validate()?;
        let token = self.resolve(ledger, reference_id)?;
        self.update_at(ledger, &token, draft)
    }

    pub fn delete_entry(&self, ledger: &Ledger, reference_id: &str) -> Result<()> {
        let token = self.resolve(ledger, reference_id)?;
        self.delete_at(ledger, &token)
    }

    pub fn monthly_report(&self, ledger: &Ledger) -> Result<MonthlyReport> {
        let entries = self.list_entries(ledger)?;
        Ok(report::monthly_report(&entries))
    }

    fn locate(&self, ledger: &Ledger, reference_id: &str) -> Result<(usize, Vec<Cell>)> {
        self.tables
            .rows(&ledger.name)?
            .into_iter()
            .enumerate()
            .find(|(_, row)| {
                row.get(ledger.reference_column)
                    .is_some_and(|cell| cell.trim() == reference_id.trim())
            })
            .ok_or_else(|| LedgerError::ReferenceNotFound(reference_id.to_string()))
    }

    fn guard(&self, ledger: &Ledger, token: &PositionToken) -> CellGuard {
        CellGuard::new(ledger.reference_column, token.reference_id.clone())
    }
}

fn conflict(err: TableError, reference_id: &str) -> LedgerError {
    match err {
        TableError::PreconditionFailed { .. } | TableError::RowOutOfRange { .. } => {
            LedgerError::ConcurrentModification(reference_id.to_string())
        }
        other => LedgerError::Table(other),
    }
}
