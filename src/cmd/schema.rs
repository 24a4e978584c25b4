//! Schema command - print expected input and output formats

use crate::core::TaxReport;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "report-json")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema of `report --json` output
    ReportJson,
    /// Columns read from the broker export
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::ReportJson => {
                let schema = schema_for!(TaxReport);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvFields => {
                println!("Broker CSV Input Format");
                println!("=======================");
                println!();
                for (name, modes, description) in CSV_FIELD_DESCRIPTIONS {
                    println!("{:15} ({:16})  {}", name, modes, description);
                }
                println!();
                println!("Other columns are ignored. Dates are YYYY-MM-DD, a time part is dropped.");
            }
        }
        Ok(())
    }
}

const CSV_FIELD_DESCRIPTIONS: &[(&str, &str, &str)] = &[
    ("Date sold", "simple, detailed", "Date the position was closed"),
    ("Realised PnL", "simple", "Gain (positive) or loss (negative) in the export currency"),
    ("Date acquired", "detailed", "Date the position was opened"),
    ("Symbol", "detailed", "Ticker, optional"),
    ("Cost basis", "detailed", "Purchase cost in the export currency"),
    ("Amount", "detailed", "Sale proceeds in the export currency"),
];
