use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("conflicting rates for {date}: {existing} vs {incoming}")]
    ConflictingRate {
        date: NaiveDate,
        existing: Decimal,
        incoming: Decimal,
    },
}

/// Exchange rates keyed by calendar day. Days without an entry had no
/// published rate (weekends, bank holidays).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateTable {
    rates: BTreeMap<NaiveDate, Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.rates.get(&date).copied()
    }

    /// Nearest rate strictly before `date`, looking back at most
    /// `max_days` days. Returns the date the rate was published on.
    pub fn last_before(&self, date: NaiveDate, max_days: u32) -> Option<(NaiveDate, Decimal)> {
        // a window reaching past the calendar's start covers everything earlier
        let earliest = date
            .checked_sub_days(Days::new(u64::from(max_days)))
            .unwrap_or(NaiveDate::MIN);
        self.rates
            .range(earliest..date)
            .next_back()
            .map(|(day, rate)| (*day, *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.rates.iter().map(|(date, rate)| (*date, *rate))
    }

    /// Combine two tables. The same rate repeated for a day is accepted,
    /// a different rate for an already-present day is rejected.
    pub fn merge(self, other: RateTable) -> Result<RateTable, MergeError> {
        let mut rates = self.rates;
        for (date, incoming) in other.rates {
            match rates.get(&date) {
                Some(&existing) if existing != incoming => {
                    return Err(MergeError::ConflictingRate {
                        date,
                        existing,
                        incoming,
                    })
                }
                Some(_) => {}
                None => {
                    rates.insert(date, incoming);
                }
            }
        }
        Ok(RateTable { rates })
    }
}

impl FromIterator<(NaiveDate, Decimal)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Decimal)>>(iter: I) -> Self {
        RateTable {
            rates: iter.into_iter().collect(),
        }
    }
}

/// Why a date is missing from a best-effort rate fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No rate was published for the day
    NotPublished,
    /// The request for the day failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::NotPublished => write!(f, "{}: no rate published", self.date),
            SkipReason::Failed(msg) => write!(f, "{}: {}", self.date, msg),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RateRecord {
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    rate: Decimal,
}

/// Read a `date,rate` CSV into a table
pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<RateTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut table = RateTable::new();
    for record in rdr.deserialize::<RateRecord>() {
        let record = record?;
        let single: RateTable = std::iter::once((record.date, record.rate)).collect();
        table = table.merge(single)?;
    }
    log::info!("Read {} rates", table.len());
    Ok(table)
}

/// Write a table as `date,rate` CSV, ordered by date
pub fn write_csv<W: Write>(table: &RateTable, writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (date, rate) in table.iter() {
        wtr.serialize(RateRecord { date, rate })?;
    }
    wtr.flush()?;
    Ok(())
}
