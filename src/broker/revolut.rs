//! Revolut "profits" export (realised PnL per closed position)

use super::ImportError;
use crate::core::{DetailedTransaction, Transaction};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PnlRecord {
    #[serde(rename = "Date sold")]
    date_sold: String,
    #[serde(rename = "Realised PnL", with = "rust_decimal::serde::str")]
    realised_pnl: Decimal,
}

#[derive(Debug, Deserialize)]
struct PositionRecord {
    #[serde(rename = "Date acquired")]
    date_acquired: String,
    #[serde(rename = "Date sold")]
    date_sold: String,
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Cost basis", with = "rust_decimal::serde::str")]
    cost_basis: Decimal,
    #[serde(rename = "Amount", with = "rust_decimal::serde::str")]
    amount: Decimal,
}

fn open(path: &Path) -> Result<BufReader<File>, ImportError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ImportError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Read realised PnL from the export at `path`, one transaction per sale date
pub fn read_transactions_file(path: &Path) -> Result<Vec<Transaction>, ImportError> {
    read_transactions(open(path)?)
}

pub fn read_detailed_transactions_file(
    path: &Path,
) -> Result<Vec<DetailedTransaction>, ImportError> {
    read_detailed_transactions(open(path)?)
}

/// Read realised PnL, summing rows that share a sale date.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut count = 0;

    for (i, result) in rdr.deserialize::<PnlRecord>().enumerate() {
        let record = result?;
        let date = parse_date(&record.date_sold, i + 1)?;
        *by_date.entry(date).or_default() += record.realised_pnl;
        count += 1;
    }

    log::info!("Read {} csv records over {} sale dates", count, by_date.len());
    Ok(by_date
        .into_iter()
        .map(|(date, amount)| Transaction::new(date, amount))
        .collect())
}

/// Read each closed position with both its acquisition and sale legs
pub fn read_detailed_transactions<R: Read>(
    reader: R,
) -> Result<Vec<DetailedTransaction>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();

    for (i, result) in rdr.deserialize::<PositionRecord>().enumerate() {
        let record = result?;
        transactions.push(DetailedTransaction {
            date_acquired: parse_date(&record.date_acquired, i + 1)?,
            date_sold: parse_date(&record.date_sold, i + 1)?,
            symbol: record.symbol.filter(|s| !s.is_empty()),
            cost_basis: record.cost_basis,
            amount: record.amount,
        });
    }

    log::info!("Read {} csv records", transactions.len());
    transactions.sort_by_key(|t| t.date_sold);
    Ok(transactions)
}

/// Calendar date of a date or date-time cell; any time of day is dropped.
fn parse_date(s: &str, record: usize) -> Result<NaiveDate, ImportError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .ok_or_else(|| ImportError::InvalidDate {
            record,
            value: s.to_string(),
        })
}
