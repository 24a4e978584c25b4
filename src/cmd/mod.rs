pub mod rates;
pub mod report;
pub mod schema;

use crate::core::{rates as rate_table, RateTable};
use crate::nbp::{self, NbpClient};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Connection settings for the NBP exchange rate API
#[derive(Args, Debug)]
pub struct NbpArgs {
    /// Base URL of the NBP API
    #[arg(long, env = "BELKA_NBP_URL", default_value = nbp::DEFAULT_BASE_URL)]
    nbp_url: String,
}

impl NbpArgs {
    pub fn client(&self) -> NbpClient {
        NbpClient::new(&self.nbp_url)
    }
}

/// Read a `date,rate` CSV previously written by the `rates` command
pub fn read_rates_file(path: &Path) -> anyhow::Result<RateTable> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    rate_table::read_csv(BufReader::new(file))
        .with_context(|| format!("reading rates from {}", path.display()))
}
