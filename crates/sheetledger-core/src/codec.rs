//! Conversion between [`LedgerEntry`] values and spreadsheet rows.
//!
//! A row is ten text cells in the order of [`HEADERS`]. Decoding looks cells up
//! by header text, so a table whose columns were rearranged still decodes.

use std::str::FromStr;

use rust_decimal::Decimal;
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::{
    error::{LedgerError, Result},
    models::{Direction, LedgerEntry},
    table::Cell,
};

pub const SERIAL_NUMBER: &str = "Sr No";
pub const REFERENCE_ID: &str = "Reference ID";
pub const DIRECTION: &str = "In/Out";
pub const DATE: &str = "Date";
pub const NAME: &str = "Name";
pub const DOMAIN: &str = "Domain";
pub const UNIT_PRICE: &str = "Price";
pub const QUANTITY: &str = "Quantity";
pub const TOTAL_AMOUNT: &str = "Total Amount";
pub const COMMENTS: &str = "Comments";

pub const HEADERS: [&str; 10] = [
    SERIAL_NUMBER,
    REFERENCE_ID,
    DIRECTION,
    DATE,
    NAME,
    DOMAIN,
    UNIT_PRICE,
    QUANTITY,
    TOTAL_AMOUNT,
    COMMENTS,
];

pub fn header_row() -> Vec<Cell> {
    HEADERS.iter().map(|h| h.to_string()).collect()
}

/// `YYYY-MM-DD`, with a leading `-` for years before year 0.
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_date(date: Date) -> Result<String> {
    date.format(DATE_FORMAT)
        .map_err(|e| LedgerError::InvalidDate(format!("{} ({})", date, e)))
}

pub fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s.trim(), DATE_FORMAT).map_err(|_| LedgerError::InvalidDate(s.to_string()))
}

/// Encodes an entry in the canonical column order.
pub fn encode(entry: &LedgerEntry) -> Result<Vec<Cell>> {
    Ok(vec![
        entry.serial_number.to_string(),
        entry.reference_id.clone(),
        entry.direction.to_string(),
        format_date(entry.date)?,
        entry.name.clone(),
        entry.domain.clone(),
        entry.unit_price.to_string(),
        entry.quantity.to_string(),
        entry.total_amount.to_string(),
        entry.comments.clone(),
    ])
}

/// Encodes an entry in the column order of an existing table header.
/// Columns the codec does not know are written empty.
pub fn encode_for(entry: &LedgerEntry, headers: &[Cell]) -> Result<Vec<Cell>> {
    let canonical = encode(entry)?;
    Ok(headers
        .iter()
        .map(|header| {
            HEADERS
                .iter()
                .position(|known| *known == header.trim())
                .map(|i| canonical[i].clone())
                .unwrap_or_default()
        })
        .collect())
}

pub fn column_of(headers: &[Cell], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

struct RowView<'a> {
    row: &'a [Cell],
    headers: &'a [Cell],
}

impl<'a> RowView<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        column_of(self.headers, name)
            .and_then(|i| self.row.get(i))
            .map(String::as_str)
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn required(&self, name: &str) -> Result<&'a str> {
        match self.get(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(LedgerError::MalformedRow(format!("missing '{}'", name))),
        }
    }

    fn optional(&self, name: &str) -> Option<&'a str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }
}

fn parse_amount(name: &str, value: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(value)
        .map_err(|_| LedgerError::MalformedRow(format!("'{}' is not a number: '{}'", name, value)))?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::MalformedRow(format!("'{}' must not be negative: '{}'", name, value)));
    }
    Ok(amount)
}

/// Decodes one data row using the table's header row for column lookup.
pub fn decode(row: &[Cell], headers: &[Cell]) -> Result<LedgerEntry> {
    let view = RowView { row, headers };

    let serial = view.required(SERIAL_NUMBER)?;
    let serial_number = serial
        .parse::<u64>()
        .map_err(|_| LedgerError::MalformedRow(format!("'{}' is not a serial number: '{}'", SERIAL_NUMBER, serial)))?;
    let reference_id = view.required(REFERENCE_ID)?.to_string();
    let direction = Direction::from_str(view.get(DIRECTION).unwrap_or_default())?;
    let date = parse_date(view.get(DATE).unwrap_or_default())?;
    let unit_price = parse_amount(UNIT_PRICE, view.required(UNIT_PRICE)?)?;
    let quantity = match view.optional(QUANTITY) {
        Some(q) => parse_amount(QUANTITY, q)?,
        None => Decimal::ONE,
    };
    let total_amount = match view.optional(TOTAL_AMOUNT) {
        Some(t) => parse_amount(TOTAL_AMOUNT, t)?,
        None => unit_price
            .checked_mul(quantity)
            .ok_or_else(|| LedgerError::MalformedRow(format!("{} x {} overflows", unit_price, quantity)))?,
    };

    Ok(LedgerEntry {
        serial_number,
        reference_id,
        direction,
        date,
        name: view.text(NAME),
        domain: view.text(DOMAIN),
        unit_price,
        quantity,
        total_amount,
        comments: view.text(COMMENTS),
    })
}
