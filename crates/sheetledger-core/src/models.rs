use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::error::{LedgerError, Result};

time::serde::format_description!(ledger_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "In",
            Direction::Out => "Out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "In" => Ok(Direction::In),
            "Out" => Ok(Direction::Out),
            other => Err(LedgerError::MalformedRow(format!("unknown direction '{}'", other))),
        }
    }
}

/// One ledger row as the application sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub serial_number: u64,
    pub reference_id: String,
    pub direction: Direction,
    #[serde(with = "ledger_date")]
    pub date: Date,
    pub name: String,
    pub domain: String,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub total_amount: Decimal,
    pub comments: String,
}

/// The caller-supplied part of an entry. Serial number, reference id and
/// total are assigned by the store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub direction: Direction,
    #[serde(with = "ledger_date")]
    pub date: Date,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub comments: String,
}

impl EntryDraft {
    pub fn new(direction: Direction, date: Date, unit_price: Decimal) -> Self {
        Self {
            direction,
            date,
            name: String::new(),
            domain: String::new(),
            unit_price,
            quantity: None,
            comments: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ONE)
    }

    pub fn total_amount(&self) -> Result<Decimal> {
        self.unit_price
            .checked_mul(self.quantity())
            .ok_or_else(|| LedgerError::InvalidAmount(format!("{} x {} overflows", self.unit_price, self.quantity())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit_price < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!("price must not be negative, got {}", self.unit_price)));
        }
        let quantity = self.quantity();
        if quantity < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!("quantity must not be negative, got {}", quantity)));
        }
        Ok(())
    }

    pub fn into_entry(self, serial_number: u64, reference_id: String) -> Result<LedgerEntry> {
        self.validate()?;
        let quantity = self.quantity();
        let total_amount = self.total_amount()?;
        Ok(LedgerEntry {
            serial_number,
            reference_id,
            direction: self.direction,
            date: self.date,
            name: self.name,
            domain: self.domain,
            unit_price: self.unit_price,
            quantity,
            total_amount,
            comments: self.comments,
        })
    }
}

pub fn new_reference_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("In".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!(" Out ".parse::<Direction>().unwrap(), Direction::Out);
        assert!(matches!("in".parse::<Direction>(), Err(LedgerError::MalformedRow(_))));
        assert!(matches!("".parse::<Direction>(), Err(LedgerError::MalformedRow(_))));
    }

    #[test]
    fn test_draft_defaults_quantity_to_one() {
        let draft = EntryDraft::new(Direction::Out, date!(2024 - 03 - 01), dec!(12.50));
        assert_eq!(draft.quantity(), Decimal::ONE);
        assert_eq!(draft.total_amount().unwrap(), dec!(12.50));
    }

    #[test]
    fn test_into_entry_computes_total() {
        let entry = EntryDraft::new(Direction::In, date!(2024 - 03 - 01), dec!(2.25))
            .with_quantity(dec!(4))
            .with_name("Rice")
            .into_entry(3, "ref-1".to_string())
            .unwrap();
        assert_eq!(entry.serial_number, 3);
        assert_eq!(entry.total_amount, dec!(9.00));
        assert_eq!(entry.quantity, dec!(4));
        assert_eq!(entry.name, "Rice");
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let draft = EntryDraft::new(Direction::In, date!(2024 - 03 - 01), dec!(-1));
        assert!(matches!(draft.validate(), Err(LedgerError::InvalidAmount(_))));

        let draft = EntryDraft::new(Direction::In, date!(2024 - 03 - 01), dec!(1)).with_quantity(dec!(-0.5));
        assert!(matches!(draft.validate(), Err(LedgerError::InvalidAmount(_))));

        let draft = EntryDraft::new(Direction::In, date!(2024 - 03 - 01), dec!(0)).with_quantity(dec!(0));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_reference_ids_are_distinct() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_reference_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_draft_json_accepts_missing_optionals() {
        let draft: EntryDraft = serde_json::from_str(
            r#"{"direction":"Out","date":"2024-01-20","unit_price":"40"}"#,
        )
        .unwrap();
        assert_eq!(draft.date, date!(2024 - 01 - 20));
        assert_eq!(draft.quantity, None);
        assert_eq!(draft.name, "");
    }
}
