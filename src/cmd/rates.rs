//! Rates command - download NBP rates for offline reports

use super::NbpArgs;
use crate::core::rates;
use crate::nbp;
use clap::Args;
use std::io;

#[derive(Args, Debug)]
pub struct RatesCommand {
    /// Calendar year to fetch, may be repeated
    #[arg(short, long, required = true)]
    year: Vec<i32>,

    /// Currency code
    #[arg(short, long, default_value = "usd")]
    currency: String,

    #[command(flatten)]
    nbp: NbpArgs,
}

impl RatesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut years = self.year.clone();
        years.sort_unstable();
        years.dedup();

        let table = nbp::fetch_rates_for_years(&self.nbp.client(), years, &self.currency)?;
        if table.is_empty() {
            log::warn!("No {} rates published for {:?}", self.currency, self.year);
        }
        rates::write_csv(&table, io::stdout())
    }
}
