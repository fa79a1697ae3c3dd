use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use sheetledger_core::table::{data_index, Cell, CellGuard, RowPosition, TableError, TableSource, FIRST_DATA_POSITION};
use time::OffsetDateTime;

/// Tables persisted in a SQLite database. Physical position is the rank of a
/// row by insertion id, so deleting a row moves every later row up by one.
pub struct SqliteTables {
    conn: Mutex<Connection>,
}

impl SqliteTables {
    pub fn new(path: &str) -> Result<Self, TableError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(backend)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(backend)?;

        let tables = Self {
            conn: Mutex::new(conn),
        };
        tables.init_schema()?;
        Ok(tables)
    }

    fn init_schema(&self) -> Result<(), TableError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sheets (
                name TEXT PRIMARY KEY,
                header TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sheet_rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sheet TEXT NOT NULL,
                cells TEXT NOT NULL,
                FOREIGN KEY (sheet) REFERENCES sheets(name)
            );

            CREATE INDEX IF NOT EXISTS idx_sheet_rows_sheet
                ON sheet_rows(sheet, id);
            ",
        )
        .map_err(backend)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TableError> {
        self.conn
            .lock()
            .map_err(|_| TableError::Other("sqlite connection lock poisoned".to_string()))
    }
}

fn backend(e: rusqlite::Error) -> TableError {
    TableError::Other(e.to_string())
}

fn cells_to_json(cells: &[Cell]) -> Result<String, TableError> {
    serde_json::to_string(cells).map_err(|e| TableError::Other(format!("Invalid cells: {}", e)))
}

fn cells_from_json(json: &str) -> Result<Vec<Cell>, TableError> {
    serde_json::from_str(json).map_err(|e| TableError::Other(format!("Corrupt row: {}", e)))
}

fn sheet_exists(conn: &Connection, name: &str) -> Result<bool, TableError> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sheets WHERE name = ?1", params![name], |r| r.get(0))
        .map_err(backend)?;
    Ok(count > 0)
}

fn require_sheet(conn: &Connection, name: &str) -> Result<(), TableError> {
    if sheet_exists(conn, name)? {
        Ok(())
    } else {
        Err(TableError::TableNotFound(name.to_string()))
    }
}

fn count_rows(conn: &Connection, name: &str) -> Result<usize, TableError> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sheet_rows WHERE sheet = ?1", params![name], |r| r.get(0))
        .map_err(backend)?;
    Ok(count as usize)
}

/// Returns the row id behind `position`, after checking the guard against its cells.
fn checked_row_id(conn: &Connection, name: &str, position: RowPosition, guard: Option<&CellGuard>) -> Result<i64, TableError> {
    require_sheet(conn, name)?;
    let out_of_range = || TableError::RowOutOfRange {
        table: name.to_string(),
        position,
    };
    let offset = data_index(position).ok_or_else(out_of_range)?;

    let found: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, cells FROM sheet_rows WHERE sheet = ?1 ORDER BY id LIMIT 1 OFFSET ?2",
            params![name, offset as i64],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(backend)?;
    let (id, json) = found.ok_or_else(out_of_range)?;

    if let Some(guard) = guard {
        if !guard.matches(&cells_from_json(&json)?) {
            return Err(TableError::PreconditionFailed {
                table: name.to_string(),
                position,
            });
        }
    }
    Ok(id)
}

impl TableSource for SqliteTables {
    fn create_table(&self, name: &str, header: &[Cell]) -> Result<(), TableError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        if sheet_exists(&tx, name)? {
            return Err(TableError::TableAlreadyExists(name.to_string()));
        }
        tx.execute(
            "INSERT INTO sheets (name, header, created_at) VALUES (?1, ?2, ?3)",
            params![name, cells_to_json(header)?, OffsetDateTime::now_utc().to_string()],
        )
        .map_err(backend)?;
        tx.commit().map_err(backend)?;
        tracing::debug!(table = name, "SQLite table created");
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool, TableError> {
        let conn = self.lock()?;
        sheet_exists(&conn, name)
    }

    fn list_tables(&self) -> Result<Vec<Arc<str>>, TableError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name FROM sheets ORDER BY name")
            .map_err(backend)?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(backend)?
            .map(|name| name.map(|n| Arc::<str>::from(n)).map_err(backend))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn header(&self, name: &str) -> Result<Vec<Cell>, TableError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row("SELECT header FROM sheets WHERE name = ?1", params![name], |r| r.get(0))
            .optional()
            .map_err(backend)?;
        match json {
            Some(json) => cells_from_json(&json),
            None => Err(TableError::TableNotFound(name.to_string())),
        }
    }

    fn rows(&self, name: &str) -> Result<Vec<Vec<Cell>>, TableError> {
        let conn = self.lock()?;
        require_sheet(&conn, name)?;
        let mut stmt = conn
            .prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY id")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![name], |r| r.get::<_, String>(0))
            .map_err(backend)?;

        let mut result = Vec::new();
        for json in rows {
            result.push(cells_from_json(&json.map_err(backend)?)?);
        }
        Ok(result)
    }

    fn row_count(&self, name: &str) -> Result<usize, TableError> {
        let conn = self.lock()?;
        require_sheet(&conn, name)?;
        count_rows(&conn, name)
    }

    fn append_row(&self, name: &str, cells: &[Cell]) -> Result<RowPosition, TableError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        require_sheet(&tx, name)?;
        tx.execute(
            "INSERT INTO sheet_rows (sheet, cells) VALUES (?1, ?2)",
            params![name, cells_to_json(cells)?],
        )
        .map_err(backend)?;
        let position = count_rows(&tx, name)? - 1 + FIRST_DATA_POSITION;
        tx.commit().map_err(backend)?;
        tracing::debug!(table = name, position, "SQLite row appended");
        Ok(position)
    }

    fn update_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>, cells: &[Cell]) -> Result<(), TableError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        let id = checked_row_id(&tx, name, position, guard)?;
        tx.execute(
            "UPDATE sheet_rows SET cells = ?1 WHERE id = ?2",
            params![cells_to_json(cells)?, id],
        )
        .map_err(backend)?;
        tx.commit().map_err(backend)?;
        tracing::debug!(table = name, position, "SQLite row updated");
        Ok(())
    }

    fn delete_row(&self, name: &str, position: RowPosition, guard: Option<&CellGuard>) -> Result<(), TableError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        let id = checked_row_id(&tx, name, position, guard)?;
        tx.execute("DELETE FROM sheet_rows WHERE id = ?1", params![id])
            .map_err(backend)?;
        tx.commit().map_err(backend)?;
        tracing::debug!(table = name, position, "SQLite row deleted");
        Ok(())
    }
}
