use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Realized PnL for a single sale date (simple form).
///
/// Same-date rows are summed by the CSV import, so dates are unique within
/// one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self { date, amount }
    }
}

/// A closed position with both legs (detailed form)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedTransaction {
    pub date_acquired: NaiveDate,
    pub date_sold: NaiveDate,
    #[serde(default)]
    pub symbol: Option<String>,
    pub cost_basis: Decimal,
    pub amount: Decimal,
}

impl DetailedTransaction {
    /// Signed gain or loss: sale proceeds less cost basis
    pub fn pnl(&self) -> Decimal {
        self.amount - self.cost_basis
    }
}
