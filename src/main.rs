use clap::{Parser, Subcommand};

mod broker;
mod cmd;
mod core;
mod nbp;

#[derive(Parser, Debug)]
#[command(name = "belka", version, about = "Polish capital gains (Belka) tax calculator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate yearly PnL, taxable base and tax due
    Report(cmd::report::ReportCommand),
    /// Download NBP exchange rates as CSV
    Rates(cmd::rates::RatesCommand),
    /// Print input and output formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Rates(rates) => rates.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
