#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod alert;
mod api;
mod chart;
mod cli;
mod ledger;
mod prelude;
mod quantity;
mod run;

use std::{fs::OpenOptions, sync::Arc};

use clap::{Parser, crate_version};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cli::{Args, Command},
    ledger::Ledger,
    prelude::*,
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("failed to open the log file at `{}`", args.log_file.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().without_time().compact())
        .with(fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false))
        .init();
    info!(version = crate_version!(), "starting…");

    match args.command {
        Command::Run(run_args) => run::run(&run_args, &args.log_file).await?,
        Command::Chart(chart_args) => {
            chart::render(&Ledger::new(&chart_args.ledger.path), &chart_args.output_path)?;
        }
    }

    info!("done!");
    Ok(())
}
