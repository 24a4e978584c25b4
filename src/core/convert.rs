use super::rates::RateTable;
use super::transaction::{DetailedTransaction, Transaction};
use chrono::NaiveDate;

/// Weekends plus the longest run of Polish bank holidays fit comfortably
/// within this many days.
pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no exchange rate for {date}")]
    MissingRate { date: NaiveDate },
    #[error("no exchange rate within {max_lookback_days} days before {date}")]
    NoRateFound {
        date: NaiveDate,
        max_lookback_days: u32,
    },
}

/// Convert each amount with the rate published on exactly its date.
///
/// A single missing rate fails the whole batch.
pub fn convert(
    transactions: &[Transaction],
    rates: &RateTable,
) -> Result<Vec<Transaction>, ConversionError> {
    transactions
        .iter()
        .map(|tx| {
            let rate = rates
                .get(tx.date)
                .ok_or(ConversionError::MissingRate { date: tx.date })?;
            log::debug!("{} {} @ {}", tx.date, tx.amount, rate);
            Ok(Transaction::new(tx.date, tx.amount * rate))
        })
        .collect()
}

/// Convert both legs of each transaction with the last rate published
/// before the leg's date: the acquisition rate for cost basis, the sale
/// rate for the amount.
pub fn convert_detailed(
    transactions: &[DetailedTransaction],
    rates: &RateTable,
    max_lookback_days: u32,
) -> Result<Vec<DetailedTransaction>, ConversionError> {
    let rate_before = |date: NaiveDate| {
        rates
            .last_before(date, max_lookback_days)
            .map(|(published, rate)| {
                log::debug!("rate for {} taken from {}: {}", date, published, rate);
                rate
            })
            .ok_or(ConversionError::NoRateFound {
                date,
                max_lookback_days,
            })
    };

    transactions
        .iter()
        .map(|tx| {
            let acquired_rate = rate_before(tx.date_acquired)?;
            let sold_rate = rate_before(tx.date_sold)?;
            Ok(DetailedTransaction {
                cost_basis: tx.cost_basis * acquired_rate,
                amount: tx.amount * sold_rate,
                ..tx.clone()
            })
        })
        .collect()
}
