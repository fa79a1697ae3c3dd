use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use sheetledger_core::table::{data_index, Cell, CellGuard, RowPosition, TableError, TableSource, FIRST_DATA_POSITION};

#[derive(Debug, Clone)]
struct Sheet {
    header: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(header: &[Cell]) -> Self {
        Self {
            header: header.to_vec(),
            rows: Vec::new(),
        }
    }

    fn checked_index(&self, table: &str, position: RowPosition, guard: Option<&CellGuard>) -> Result<usize, TableError> {
        let index = data_index(position)
            .filter(|i| *i < self.rows.len())
            .ok_or_else(|| TableError::RowOutOfRange {
                table: table.to_string(),
                position,
            })?;
        if let Some(guard) = guard {
            if !guard.matches(&self.rows[index]) {
                return Err(TableError::PreconditionFailed {
                    table: table.to_string(),
                    position,
                });
            }
        }
        Ok(index)
    }
}

/// Tables held in process memory. Contents are lost when the process exits.
#[derive(Default)]
pub struct InMemoryTables {
    sheets: RwLock<BTreeMap<Arc<str>, Sheet>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Arc<str>, Sheet>>, TableError> {
        self.sheets
            .read()
            .map_err(|_| TableError::Other("table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Arc<str>, Sheet>>, TableError> {
        self.sheets
            .write()
            .map_err(|_| TableError::Other("table lock poisoned".to_string()))
    }
}

fn not_found(name: &str) -> TableError {
    TableError::TableNotFound(name.to_string())
}

impl TableSource for InMemoryTables {
    fn create_table(&self, name: &str, header: &[Cell]) -> Result<(), TableError> {
        let mut sheets = self.write()?;
        if sheets.contains_key(name) {
            return Err(TableError::TableAlreadyExists(name.to_string()));
        }
        sheets.insert(Arc::from(name), Sheet::new(header));
        tracing::debug!(table = name, "Table created");
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, TableError> {
        Ok(self.read()?.contains_key(name))
    }

    fn list_tables(&self) -> Result<Vec<Arc<str>>, TableError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn header(&self, name: &str) -> Result<Vec<Cell>, TableError> {
        let sheets = self.read()?;
        let sheet = sheets.get(name).ok_or_else(|| not_found(name))?;
        Ok(sheet.header.clone())
    }

    fn rows(&self, name: &str) -> Result<Vec<Vec<Cell>>, TableError> {
        let sheets = self.read()?;
        let sheet = sheets.get(name).ok_or_else(|| not_found(name))?;
        Ok(sheet.rows.clone())
    }

    fn row_count(&self, name: &str) -> Result<usize, TableError> {
        let sheets = self.read()?;
        let sheet = sheets.get(name).ok_or_else(|| not_found(name))?;
        Ok(sheet.rows.len())
    }

    fn append_row(&self, name: &str, cells: &[Cell]) -> Result<RowPosition, TableError> {
        let mut sheets = self.write()?;
        let sheet = sheets.get_mut(name).ok_or_else(|| not_found(name))?;
        sheet.rows.push(cells.to_vec());
        let position = sheet.rows.len() - 1 + FIRST_DATA_POSITION;
        tracing::debug!(table = name, position, "Row appended");
        Ok(position)
    }

    fn update_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>, cells: &[Cell]) -> Result<(), TableError> {
        let mut sheets = self.write()?;
        let sheet = sheets.get_mut(name).ok_or_else(|| not_found(name))?;
        let index = sheet.checked_index(name, position, guard)?;
        sheet.rows[index] = cells.to_vec();
        tracing::debug!(table = name, position, "Row updated");
        Ok(())
    }

    fn delete_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>) -> Result<(), TableError> {
        let mut sheets = self.write()?;
        let sheet = sheets.get_mut(name).ok_or_else(|| not_found(name))?;
        let index = sheet.checked_index(name, position, guard)?;
        sheet.rows.remove(index);
        tracing::debug!(table = name, position, "Row deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_create_table_twice_fails() {
        let tables = InMemoryTables::new();
        tables.create_table("adit", &cells(&["A", "B"])).unwrap();
        assert!(matches!(
            tables.create_table("adit", &cells(&["A", "B"])),
            Err(TableError::TableAlreadyExists(_))
        ));
        assert_eq!(tables.list_tables().unwrap(), vec![Arc::<str>::from("adit")]);
    }

    #[test]
    fn test_positions_start_below_header() {
        let tables = InMemoryTables::new();
        tables.create_table("t", &cells(&["A"])).unwrap();
        assert_eq!(tables.append_row("t", &cells(&["x"])).unwrap(), 2);
        assert_eq!(tables.append_row("t", &cells(&["y"])).unwrap(), 3);
        assert_eq!(tables.row_count("t").unwrap(), 2);
    }

    #[test]
    fn test_header_row_cannot_be_mutated() {
        let tables = InMemoryTables::new();
        tables.create_table("t", &cells(&["A"])).unwrap();
        tables.append_row("t", &cells(&["x"])).unwrap();
        assert!(matches!(
            tables.update_row("t", 1, None, &cells(&["z"])),
            Err(TableError::RowOutOfRange { position: 1, .. })
        ));
        assert!(matches!(tables.delete_row("t", 1, None), Err(TableError::RowOutOfRange { .. })));
        assert_eq!(tables.header("t").unwrap(), cells(&["A"]));
    }

    #[test]
    fn test_delete_shifts_rows_up() {
        let tables = InMemoryTables::new();
        tables.create_table("t", &cells(&["A"])).unwrap();
        for v in ["x", "y", "z"] {
            tables.append_row("t", &cells(&[v])).unwrap();
        }
        tables.delete_row("t", 3, None).unwrap();
        assert_eq!(tables.rows("t").unwrap(), vec![cells(&["x"]), cells(&["z"])]);
    }

    #[test]
    fn test_guard_mismatch_leaves_row_untouched() {
        let tables = InMemoryTables::new();
        tables.create_table("t", &cells(&["A", "B"])).unwrap();
        tables.append_row("t", &cells(&["1", "ref-1"])).unwrap();

        let stale = CellGuard::new(1, "ref-2");
        assert!(matches!(
            tables.update_row("t", 2, Some(&stale), &cells(&["9", "ref-9"])),
            Err(TableError::PreconditionFailed { position: 2, .. })
        ));
        assert!(matches!(tables.delete_row("t", 2, Some(&stale)), Err(TableError::PreconditionFailed { .. })));
        assert_eq!(tables.rows("t").unwrap(), vec![cells(&["1", "ref-1"])]);
    }

    #[test]
    fn test_missing_table() {
        let tables = InMemoryTables::new();
        assert!(!tables.table_exists("ghost").unwrap());
        assert!(matches!(tables.rows("ghost"), Err(TableError::TableNotFound(_))));
        assert!(matches!(tables.append_row("ghost", &[]), Err(TableError::TableNotFound(_))));
    }
}
