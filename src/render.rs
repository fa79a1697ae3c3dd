//! Terminal tables for the `list` and `report` commands.

use prettytable::{Cell, Row, Table};
use sheetledger_core::{codec, LedgerEntry, MonthlyReport, Result};

pub fn entries_table(entries: &[LedgerEntry]) -> Result<Table> {
    let mut table = Table::new();
    table.set_titles(Row::new(codec::HEADERS.iter().map(|h| Cell::new(h)).collect()));
    for entry in entries {
        table.add_row(Row::new(codec::encode(entry)?.iter().map(|c| Cell::new(c)).collect()));
    }
    Ok(table)
}

pub fn report_table(report: &MonthlyReport) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("Month"),
        Cell::new("In"),
        Cell::new("Out"),
        Cell::new("Net"),
    ]));
    for (month, totals) in report.iter() {
        table.add_row(Row::new(vec![
            Cell::new(&month.to_string()),
            Cell::new(&totals.inflow.to_string()),
            Cell::new(&totals.outflow.to_string()),
            Cell::new(&totals.net().to_string()),
        ]));
    }
    let totals = report.totals();
    table.add_row(Row::new(vec![
        Cell::new("Total"),
        Cell::new(&totals.inflow.to_string()),
        Cell::new(&totals.outflow.to_string()),
        Cell::new(&totals.net().to_string()),
    ]));
    table
}
