use std::sync::Arc;

use thiserror::Error;

/// A single spreadsheet cell. Every value crosses the table boundary as text.
pub type Cell = String;

/// 1-based physical row offset inside a table. Row 1 holds the header.
pub type RowPosition = usize;

pub const HEADER_POSITION: RowPosition = 1;
pub const FIRST_DATA_POSITION: RowPosition = 2;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{0}")]
    Other(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),
    #[error("row {position} is out of range in table {table}")]
    RowOutOfRange { table: String, position: RowPosition },
    #[error("row {position} in table {table} no longer holds the expected value")]
    PreconditionFailed { table: String, position: RowPosition },
}

/// Condition a row must satisfy before a guarded update or delete touches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGuard {
    pub column: usize,
    pub expected: Cell,
}

impl CellGuard {
    pub fn new(column: usize, expected: impl Into<Cell>) -> Self {
        Self {
            column,
            expected: expected.into(),
        }
    }

    /// Compares the cell with surrounding whitespace ignored.
    pub fn matches(&self, row: &[Cell]) -> bool {
        row.get(self.column)
            .is_some_and(|cell| cell.trim() == self.expected.trim())
    }
}

/// Maps a physical position to an index into the data rows (the rows below the header).
pub fn data_index(position: RowPosition) -> Option<usize> {
    position.checked_sub(FIRST_DATA_POSITION)
}

/// A keyed store of tables. Each table has one header row followed by data rows
/// addressed by physical position, the way a spreadsheet worksheet is.
///
/// Implementations serialize access internally; a guarded `update_row` or
/// `delete_row` checks its [`CellGuard`] and mutates under the same lock.
pub trait TableSource: Send + Sync {
    fn create_table(&self, name: &str, header: &[Cell]) -> Result<(), TableError>;
    fn table_exists(&self, name: &str) -> Result<bool, TableError>;
    fn list_tables(&self) -> Result<Vec<Arc<str>>, TableError>;

    fn header(&self, name: &str) -> Result<Vec<Cell>, TableError>;
    fn rows(&self, name: &str) -> Result<Vec<Vec<Cell>>, TableError>;
    fn row_count(&self, name: &str) -> Result<usize, TableError>;

    fn append_row(&self, name: &str, cells: &[Cell]) -> Result<RowPosition, TableError>;
    fn update_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>, cells: &[Cell]) -> Result<(), TableError>;
    fn delete_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>) -> Result<(), TableError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_index_skips_header() {
        assert_eq!(data_index(HEADER_POSITION), None);
        assert_eq!(data_index(FIRST_DATA_POSITION), Some(0));
        assert_eq!(data_index(7), Some(5));
        assert_eq!(data_index(0), None);
    }

    #[test]
    fn test_cell_guard_matches_column() {
        let row: Vec<Cell> = vec!["1".into(), "abc".into()];
        assert!(CellGuard::new(1, "abc").matches(&row));
        assert!(!CellGuard::new(1, "xyz").matches(&row));
        assert!(!CellGuard::new(5, "abc").matches(&row));

        let padded: Vec<Cell> = vec!["1".into(), " abc ".into()];
        assert!(CellGuard::new(1, "abc").matches(&padded));
        assert!(!CellGuard::new(1, "ab").matches(&padded));
    }
}
