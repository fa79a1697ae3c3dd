use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use time::Date;

use crate::models::{Direction, LedgerEntry};

/// Calendar month used as the row key of the monthly pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Self {
        Self { year, month }
    }

    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionTotals {
    #[serde(rename = "In")]
    pub inflow: Decimal,
    #[serde(rename = "Out")]
    pub outflow: Decimal,
}

impl DirectionTotals {
    pub fn new(inflow: Decimal, outflow: Decimal) -> Self {
        Self { inflow, outflow }
    }

    pub fn get(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::In => self.inflow,
            Direction::Out => self.outflow,
        }
    }

    pub fn net(&self) -> Decimal {
        self.inflow - self.outflow
    }

    fn add(&mut self, direction: Direction, amount: Decimal) {
        match direction {
            Direction::In => self.inflow += amount,
            Direction::Out => self.outflow += amount,
        }
    }
}

/// Month × direction pivot of total amounts. Months iterate in ascending order;
/// a direction with no entries in a month reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthlyReport {
    months: BTreeMap<YearMonth, DirectionTotals>,
}

impl MonthlyReport {
    pub fn get(&self, month: YearMonth) -> Option<&DirectionTotals> {
        self.months.get(&month)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&YearMonth, &DirectionTotals)> {
        self.months.iter()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn totals(&self) -> DirectionTotals {
        self.months.values().fold(DirectionTotals::default(), |mut acc, t| {
            acc.inflow += t.inflow;
            acc.outflow += t.outflow;
            acc
        })
    }
}

pub fn monthly_report(entries: &[LedgerEntry]) -> MonthlyReport {
    let mut months: BTreeMap<YearMonth, DirectionTotals> = BTreeMap::new();
    for entry in entries {
        months
            .entry(YearMonth::of(entry.date))
            .or_default()
            .add(entry.direction, entry.total_amount);
    }
    MonthlyReport { months }
}
