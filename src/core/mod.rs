pub mod aggregate;
pub mod convert;
pub mod rates;
pub mod tax;
pub mod transaction;

// Flat public surface for domain types and functions.
#[allow(unused_imports)]
pub use aggregate::{aggregate, aggregate_detailed, YearlyPnl, YearlySummary};
#[allow(unused_imports)]
pub use convert::{convert, convert_detailed, ConversionError, DEFAULT_MAX_LOOKBACK_DAYS};
pub use rates::{MergeError, RateTable, SkipReason, SkippedDate};
#[allow(unused_imports)]
pub use tax::{
    compute_tax, compute_taxable_base, ReportYear, TaxDue, TaxReport, TaxableBase, BELKA_RATE,
};
pub use transaction::{DetailedTransaction, Transaction};
