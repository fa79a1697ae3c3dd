use std::io::Write;

use csv::WriterBuilder;

use crate::{
    codec::{self, HEADERS},
    error::Result,
    models::LedgerEntry,
};

/// Writes the header line followed by one line per entry.
pub fn write_csv<W: Write>(entries: &[LedgerEntry], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADERS)?;
    for entry in entries {
        wtr.write_record(codec::encode(entry)?)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn to_csv_string(entries: &[LedgerEntry]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(entries, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn export_file_name(owner: &str) -> String {
    format!("{}_exported_data.csv", owner)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::*;
    use crate::models::{Direction, EntryDraft};

    #[test]
    fn test_csv_has_header_and_rows() {
        let entries = vec![
            EntryDraft::new(Direction::In, date!(2024 - 01 - 05), dec!(100))
                .with_name("Salary")
                .into_entry(1, "ref-a".to_string())
                .unwrap(),
            EntryDraft::new(Direction::Out, date!(2024 - 01 - 20), dec!(20))
                .with_quantity(dec!(2))
                .with_comments("two, items")
                .into_entry(2, "ref-b".to_string())
                .unwrap(),
        ];
        let csv = to_csv_string(&entries).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Sr No,Reference ID,In/Out,Date,Name,Domain,Price,Quantity,Total Amount,Comments");
        assert_eq!(lines[1], "1,ref-a,In,2024-01-05,Salary,,100,1,100,");
        assert_eq!(lines[2], "2,ref-b,Out,2024-01-20,,,20,2,40,\"two, items\"");
    }

    #[test]
    fn test_empty_ledger_exports_header_only() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("adit"), "adit_exported_data.csv");
    }
}
