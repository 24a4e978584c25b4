use super::transaction::{DetailedTransaction, Transaction};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Net realized PnL for one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearlyPnl {
    pub year: i32,
    pub pnl: Decimal,
}

/// Yearly totals for the detailed form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct YearlySummary {
    pub year: i32,
    pub total_pnl: Decimal,
    pub total_cost_basis: Decimal,
    pub total_amount: Decimal,
}

impl YearlySummary {
    pub fn to_pnl(&self) -> YearlyPnl {
        YearlyPnl {
            year: self.year,
            pnl: self.total_pnl,
        }
    }
}

/// Sum PnL per calendar year, ascending by year
pub fn aggregate(transactions: &[Transaction]) -> Vec<YearlyPnl> {
    let mut years: BTreeMap<i32, Decimal> = BTreeMap::new();
    for tx in transactions {
        *years.entry(tx.date.year()).or_default() += tx.amount;
    }

    years
        .into_iter()
        .map(|(year, pnl)| YearlyPnl { year, pnl })
        .collect()
}

/// Sum PnL, cost basis and proceeds per calendar year of sale
pub fn aggregate_detailed(transactions: &[DetailedTransaction]) -> Vec<YearlySummary> {
    let mut years: BTreeMap<i32, YearlySummary> = BTreeMap::new();
    for tx in transactions {
        let year = tx.date_sold.year();
        let summary = years.entry(year).or_insert_with(|| YearlySummary {
            year,
            ..Default::default()
        });
        summary.total_pnl += tx.pnl();
        summary.total_cost_basis += tx.cost_basis;
        summary.total_amount += tx.amount;
    }

    log::debug!("Aggregated {} transactions into {} years", transactions.len(), years.len());
    years.into_values().collect()
}
