//! Append-only CSV ledger of exchange-rate observations.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Deserialize;

use crate::{
    prelude::*,
    quantity::{Pesos, Variation},
};

const DELIMITER: u8 = b';';
const HEADER: [&str; 4] = ["Fecha", "Valor del Dólar (CLP)", "Hora", "Variación Diaria"];

/// Sentinel stored when there is no previous observation to compare against.
const NOT_AVAILABLE: &str = "N/A";

/// One observation as persisted in the ledger.
#[derive(Copy, Clone, Debug)]
pub struct Row {
    pub date: NaiveDate,
    pub value: Pesos,
    pub time: NaiveTime,
    pub variation: Option<Variation>,
}

/// The historical ledger file. Rows are only ever appended, never rewritten.
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file with its header when absent.
    ///
    /// The header is written at most once per file: only when the file is
    /// still empty at the moment of the append.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn append(&self, row: &Row) -> Result {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open the ledger at `{}`", self.path.display()))?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record([
            row.date.to_string(),
            row.value.to_string(),
            row.time.format("%H:%M:%S").to_string(),
            row.variation.map_or_else(|| NOT_AVAILABLE.to_string(), |variation| variation.to_string()),
        ])?;
        writer.flush().context("failed to flush the ledger")?;
        info!("appended");
        Ok(())
    }

    /// Read and parse every row, in stored (chronological) order.
    pub fn read_all(&self) -> Result<Vec<Row>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_path(&self.path)
            .with_context(|| format!("failed to read the ledger at `{}`", self.path.display()))?;
        reader
            .deserialize::<RawRow>()
            .map(|raw| Row::try_from(raw.context("malformed ledger row")?))
            .collect()
    }

    /// The most recently recorded value, or `None` on a cold start
    /// (no file yet, or a file without data rows).
    pub fn last_value(&self) -> Result<Option<Pesos>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        Ok(self.read_all()?.last().map(|row| row.value))
    }

    /// The single per-run variation computation: current value against the
    /// last recorded one, before this run's append.
    ///
    /// Cold start and unreadable history both degrade to `None` with a
    /// warning, they are expected states rather than failures.
    pub fn variation_against_last(&self, current: Pesos) -> Option<Variation> {
        match self.last_value() {
            Ok(Some(previous)) => {
                let variation = Variation::between(previous, current);
                info!(%previous, %current, %variation, "variation computed");
                Some(variation)
            }
            Ok(None) => {
                warn!("no history yet, skipping the variation");
                None
            }
            Err(error) => {
                warn!(error = format!("{error:#}"), "could not read the history, skipping the variation");
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(rename = "Fecha")]
    date: NaiveDate,

    #[serde(rename = "Valor del Dólar (CLP)")]
    value: String,

    #[serde(rename = "Hora")]
    time: NaiveTime,

    #[serde(rename = "Variación Diaria")]
    variation: String,
}

impl TryFrom<RawRow> for Row {
    type Error = Error;

    fn try_from(raw: RawRow) -> Result<Self> {
        let variation = if raw.variation == NOT_AVAILABLE {
            None
        } else {
            Some(Variation::from_str(&raw.variation)?)
        };
        Ok(Self {
            date: raw.date,
            value: Pesos::from_str(&raw.value)?,
            time: raw.time,
            variation,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn row(date: NaiveDate, value: Pesos, variation: Option<Variation>) -> Row {
        Row {
            date,
            value,
            time: NaiveTime::from_hms_opt(12, 30, 5).unwrap(),
            variation,
        }
    }

    #[test]
    fn test_append_writes_header_once() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("historico.csv"));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        ledger.append(&row(date, Pesos(950.32), None))?;
        ledger.append(&row(date.succ_opt().unwrap(), Pesos(960.0), Some(Variation(1.02))))?;

        let contents = std::fs::read_to_string(ledger.path())?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Fecha;Valor del Dólar (CLP);Hora;Variación Diaria");
        assert_eq!(lines[1], "2024-01-01;$950,32;12:30:05;N/A");
        assert_eq!(lines[2], "2024-01-02;$960,00;12:30:05;1.02%");
        Ok(())
    }

    #[test]
    fn test_read_all_round_trips() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("historico.csv"));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        ledger.append(&row(date, Pesos(1234.5), None))?;
        ledger.append(&row(date.succ_opt().unwrap(), Pesos(1210.99), Some(Variation(-1.9))))?;

        let rows = ledger.read_all()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date);
        assert_abs_diff_eq!(rows[0].value.0, 1234.5);
        assert!(rows[0].variation.is_none());
        assert_abs_diff_eq!(rows[1].variation.unwrap().0, -1.9);
        Ok(())
    }

    #[test]
    fn test_cold_start_is_not_an_error() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("missing.csv"));
        assert!(ledger.last_value()?.is_none());
        assert!(ledger.variation_against_last(Pesos(1000.0)).is_none());
        Ok(())
    }

    #[test]
    fn test_header_only_file_is_cold_start() -> Result {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("historico.csv");
        std::fs::write(&path, "Fecha;Valor del Dólar (CLP);Hora;Variación Diaria\n")?;
        assert!(Ledger::new(path).last_value()?.is_none());
        Ok(())
    }

    #[test]
    fn test_malformed_value_is_an_error() -> Result {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("historico.csv");
        std::fs::write(
            &path,
            "Fecha;Valor del Dólar (CLP);Hora;Variación Diaria\n2024-01-01;garbage;12:30:05;N/A\n",
        )?;
        let ledger = Ledger::new(path);
        assert!(ledger.last_value().is_err());
        // Unreadable history still degrades to "no variation".
        assert!(ledger.variation_against_last(Pesos(1000.0)).is_none());
        Ok(())
    }

    #[test]
    fn test_variation_against_last() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("historico.csv"));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ledger.append(&row(date, Pesos(1000.0), None))?;

        let variation = ledger.variation_against_last(Pesos(1020.0)).unwrap();
        assert_abs_diff_eq!(variation.0, 2.00);
        Ok(())
    }
}
