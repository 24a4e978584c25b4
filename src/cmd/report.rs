//! Report command - yearly PnL, taxable base and tax due in PLN

use super::{read_rates_file, NbpArgs};
use crate::broker::revolut;
use crate::core::{
    aggregate, aggregate_detailed, convert, convert_detailed, DetailedTransaction, RateTable,
    ReportYear, TaxReport, DEFAULT_MAX_LOOKBACK_DAYS,
};
use crate::nbp;
use anyhow::Context;
use chrono::{Days, NaiveDate};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Upper bound accepted for `--max-lookback`
const MAX_LOOKBACK_LIMIT: i64 = 366;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Realised PnL per sale date, converted at that day's rate
    #[default]
    Simple,
    /// Cost basis and proceeds converted separately at the rate from the
    /// last business day before each leg
    Detailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One request per sale date
    #[default]
    Dates,
    /// Whole years, fetched in ranges
    Years,
}

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Revolut profits CSV export
    #[arg(short, long)]
    file: PathBuf,

    /// How transactions are read and converted
    #[arg(short, long, value_enum, default_value_t = Mode::Simple)]
    mode: Mode,

    /// Currency of the export
    #[arg(short, long, default_value = "usd")]
    currency: String,

    /// `date,rate` CSV to use instead of querying NBP
    #[arg(short, long)]
    rates: Option<PathBuf>,

    /// How rates are fetched from NBP in simple mode
    #[arg(long, value_enum, default_value_t = Strategy::Dates)]
    strategy: Strategy,

    /// Days to look back for a published rate in detailed mode
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_LOOKBACK_DAYS,
        value_parser = clap::value_parser!(u32).range(0..=MAX_LOOKBACK_LIMIT)
    )]
    max_lookback: u32,

    /// Only show this year (losses from earlier years are still carried)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON at full precision
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    nbp: NbpArgs,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = match self.mode {
            Mode::Simple => self.simple_report()?,
            Mode::Detailed => self.detailed_report()?,
        };

        let report = only_year(report, self.year);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        } else if self.csv {
            self.write_csv(&report.years)
        } else {
            self.print_table(&report);
            Ok(())
        }
    }

    fn simple_report(&self) -> anyhow::Result<TaxReport> {
        let transactions = revolut::read_transactions_file(&self.file)?;
        let dates = transactions.iter().map(|t| t.date);

        let rates = match &self.rates {
            Some(path) => read_rates_file(path)?,
            None => {
                let client = self.nbp.client();
                match self.strategy {
                    Strategy::Dates => {
                        let fetched = nbp::fetch_rates_for_dates(&client, dates, &self.currency);
                        if !fetched.skipped.is_empty() {
                            let skipped: Vec<String> =
                                fetched.skipped.iter().map(ToString::to_string).collect();
                            anyhow::bail!(
                                "no {} rate for {} sale date(s):\n  {}",
                                self.currency.to_uppercase(),
                                skipped.len(),
                                skipped.join("\n  ")
                            );
                        }
                        fetched.rates
                    }
                    Strategy::Years => nbp::fetch_rates_for_years(
                        &client,
                        nbp::years_spanning(dates),
                        &self.currency,
                    )?,
                }
            }
        };

        let converted = convert(&transactions, &rates).context("converting PnL to PLN")?;
        Ok(TaxReport::build(&self.currency, &aggregate(&converted)))
    }

    fn detailed_report(&self) -> anyhow::Result<TaxReport> {
        let transactions = revolut::read_detailed_transactions_file(&self.file)?;

        let rates = match &self.rates {
            Some(path) => read_rates_file(path)?,
            None => self.fetch_detailed_rates(&transactions)?,
        };

        let converted = convert_detailed(&transactions, &rates, self.max_lookback)
            .context("converting positions to PLN")?;
        Ok(TaxReport::build_detailed(
            &self.currency,
            &aggregate_detailed(&converted),
        ))
    }

    /// Every year a fallback search might reach into, from the earliest
    /// acquisition less the lookback window to the last sale
    fn fetch_detailed_rates(
        &self,
        transactions: &[DetailedTransaction],
    ) -> anyhow::Result<RateTable> {
        let lookback = Days::new(u64::from(self.max_lookback));
        let dates = transactions.iter().flat_map(|t| {
            let earliest = t
                .date_acquired
                .checked_sub_days(lookback)
                .unwrap_or(NaiveDate::MIN);
            [earliest, t.date_sold]
        });
        let years = nbp::years_spanning(dates);
        Ok(nbp::fetch_rates_for_years(
            &self.nbp.client(),
            years,
            &self.currency,
        )?)
    }

    fn print_table(&self, report: &TaxReport) {
        let years = &report.years;
        if years.is_empty() {
            println!("No realised PnL found");
            return;
        }

        println!("BELKA TAX REPORT ({} -> PLN)", report.currency);
        println!();

        let table = match self.mode {
            Mode::Simple => Table::new(years.iter().map(YearRow::from)),
            Mode::Detailed => Table::new(years.iter().map(DetailedYearRow::from)),
        }
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
        println!("{}", table);

        println!("Total tax due: {} PLN", format_pln(report.total_tax()));
    }

    fn write_csv(&self, years: &[ReportYear]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for year in years {
            match self.mode {
                Mode::Simple => wtr.serialize(YearRow::from(year))?,
                Mode::Detailed => wtr.serialize(DetailedYearRow::from(year))?,
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Tabled, serde::Serialize)]
struct YearRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "PnL (PLN)")]
    pnl: String,
    #[tabled(rename = "Taxable Base")]
    taxable_base: String,
    #[tabled(rename = "Tax (19%)")]
    tax: String,
}

impl From<&ReportYear> for YearRow {
    fn from(y: &ReportYear) -> Self {
        YearRow {
            year: y.year,
            pnl: format_pln(y.pnl),
            taxable_base: format_pln(y.taxable_base),
            tax: format_pln(y.tax),
        }
    }
}

#[derive(Debug, Clone, Tabled, serde::Serialize)]
struct DetailedYearRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Proceeds")]
    amount: String,
    #[tabled(rename = "PnL (PLN)")]
    pnl: String,
    #[tabled(rename = "Taxable Base")]
    taxable_base: String,
    #[tabled(rename = "Tax (19%)")]
    tax: String,
}

impl From<&ReportYear> for DetailedYearRow {
    fn from(y: &ReportYear) -> Self {
        DetailedYearRow {
            year: y.year,
            cost_basis: format_pln(y.cost_basis.unwrap_or_default()),
            amount: format_pln(y.amount.unwrap_or_default()),
            pnl: format_pln(y.pnl),
            taxable_base: format_pln(y.taxable_base),
            tax: format_pln(y.tax),
        }
    }
}

/// Narrow a report to a single year. Carryforward has already run over
/// every year, so the kept row still reflects earlier losses.
fn only_year(report: TaxReport, year: Option<i32>) -> TaxReport {
    match year {
        Some(year) => TaxReport {
            years: report.year(year).cloned().into_iter().collect(),
            ..report
        },
        None => report,
    }
}

/// Amounts are kept at full precision and only rounded for display
fn format_pln(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
