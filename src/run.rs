//! The per-invocation pipeline: fetch, variation, append, chart, alert.

use std::path::Path;

use chrono::{Local, Timelike};

use crate::{
    alert::{Notifier, Outcome},
    api::mindicador::{Api, Observation},
    chart,
    cli::{DateSource, RunArgs},
    ledger::{Ledger, Row},
    prelude::*,
};

/// Execute the full pipeline.
///
/// Always `Ok` once startup succeeded: a failed fetch aborts the remaining
/// stages, and any later stage failure is logged while the run carries on.
pub async fn run(args: &RunArgs, log_file: &Path) -> Result {
    match Api::try_new()?.get_latest().await {
        Ok(observation) => {
            execute(&observation, args, log_file);
            Ok(())
        }
        Err(error) => {
            error!(
                error = format!("{error:#}"),
                "failed to fetch the exchange rate, aborting the run"
            );
            Ok(())
        }
    }
}

/// Everything after a successful fetch.
pub fn execute(observation: &Observation, args: &RunArgs, log_file: &Path) {
    let now = Local::now();
    let run_date = now.date_naive();
    if observation.date != run_date {
        warn!(api_date = %observation.date, %run_date, "the API date differs from the run date");
    }
    let date = match args.date_source {
        DateSource::Local => run_date,
        DateSource::Api => observation.date,
    };

    println!("\n💵 Dólar actual: {} CLP", observation.value);

    let ledger = Ledger::new(&args.chart.ledger.path);

    // Computed once, against the history as it stood before this run,
    // and reused for both the ledger row and the alert.
    let variation = ledger.variation_against_last(observation.value);

    let time = now.time();
    let row = Row {
        date,
        value: observation.value,
        time: time.with_nanosecond(0).unwrap_or(time),
        variation,
    };
    if let Err(error) = ledger.append(&row) {
        error!(error = format!("{error:#}"), "failed to append to the ledger");
    }

    if let Err(error) = chart::render(&ledger, &args.chart.output_path) {
        error!(error = format!("{error:#}"), "failed to render the chart");
    }

    if let Some(variation) = variation {
        println!("📈 Variación: {variation} respecto al día anterior");
    }
    match Notifier::new(&args.smtp).notify(observation.value, variation) {
        Ok(Outcome::Sent) => println!("📧 Alerta enviada"),
        Ok(Outcome::NoVariation | Outcome::BelowThreshold(_)) => {}
        Err(error) => {
            error!(error = format!("{error:#}"), "failed to send the alert");
        }
    }

    println!("\n✅ Proceso completado. Revisa los archivos generados:");
    println!("- Datos históricos: {}", ledger.path().display());
    println!("- Gráfico: {}", args.chart.output_path.display());
    println!("- Logs: {}", log_file.display());
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        cli::{ChartArgs, LedgerArgs, SmtpArgs},
        quantity::Pesos,
    };

    fn log_path(directory: &Path) -> PathBuf {
        directory.join("scraper.log")
    }

    fn test_args(directory: &Path) -> RunArgs {
        RunArgs {
            chart: ChartArgs {
                ledger: LedgerArgs { path: directory.join("historico.csv") },
                output_path: directory.join("chart.png"),
            },
            date_source: DateSource::Api,
            smtp: SmtpArgs { from: None, to: None, server: None, port: 587, password: None },
        }
    }

    #[test]
    fn test_execute_twice_fills_the_variation() -> Result {
        let directory = tempfile::tempdir()?;
        let args = test_args(directory.path());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        execute(&Observation { value: Pesos(1000.0), date }, &args, &log_path(directory.path()));
        execute(
            &Observation { value: Pesos(1020.0), date: date.succ_opt().unwrap() },
            &args,
            &log_path(directory.path()),
        );

        let rows = Ledger::new(&args.chart.ledger.path).read_all()?;
        assert_eq!(rows.len(), 2);
        // Cold start: the first row carries no variation.
        assert!(rows[0].variation.is_none());
        assert_abs_diff_eq!(rows[1].variation.unwrap().0, 2.0);
        // `DateSource::Api` persists the payload dates.
        assert_eq!(rows[0].date, date);
        Ok(())
    }

    #[test]
    fn test_execute_survives_an_unwritable_ledger() {
        let directory = tempfile::tempdir().unwrap();
        let mut args = test_args(directory.path());
        // A directory at the ledger path makes every file stage fail.
        args.chart.ledger.path = directory.path().to_path_buf();

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        execute(&Observation { value: Pesos(1000.0), date }, &args, &log_path(directory.path()));
    }
}
