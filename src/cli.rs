use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Append-only run log.
    #[clap(long = "log-file", env = "LOG_FILE", default_value = "scraper.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the rate, update the ledger, render the chart, and alert.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Re-render the chart from the existing ledger, without fetching.
    #[clap(name = "chart")]
    Chart(ChartArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    #[clap(flatten)]
    pub chart: ChartArgs,

    /// Which date to persist with the observation.
    ///
    /// Historically this has been the local run date, even though the API
    /// reports its own. The run logs a warning whenever the two differ.
    #[clap(long = "date-source", env = "DATE_SOURCE", value_enum, default_value = "local")]
    pub date_source: DateSource,

    #[clap(flatten)]
    pub smtp: SmtpArgs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DateSource {
    /// The local wall-clock date of the run.
    Local,

    /// The date embedded in the API payload.
    Api,
}

#[derive(Parser)]
pub struct ChartArgs {
    #[clap(flatten)]
    pub ledger: LedgerArgs,

    /// Chart output path, overwritten on every render.
    #[clap(long = "chart-file", env = "CHART_FILE", default_value = "evolucion_dolar.png")]
    pub output_path: PathBuf,
}

#[derive(Parser)]
pub struct LedgerArgs {
    /// Historical ledger path.
    #[clap(long = "ledger-file", env = "LEDGER_FILE", default_value = "dolar_historico.csv")]
    pub path: PathBuf,
}

#[derive(Clone, Parser)]
pub struct SmtpArgs {
    /// Sender address, also used as the SMTP login name.
    #[clap(long = "email-from", env = "EMAIL_FROM")]
    pub from: Option<String>,

    /// Recipient address.
    #[clap(long = "email-to", env = "EMAIL_TO")]
    pub to: Option<String>,

    /// SMTP submission host.
    #[clap(long = "smtp-server", env = "SMTP_SERVER")]
    pub server: Option<String>,

    /// SMTP submission port (STARTTLS).
    #[clap(long = "smtp-port", env = "SMTP_PORT", default_value = "587")]
    pub port: u16,

    /// Sender password.
    #[clap(long = "email-password", env = "EMAIL_PASS", hide_env_values = true)]
    pub password: Option<String>,
}
