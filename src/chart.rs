//! Trend-chart rendering of the ledger history.

use std::path::Path;

use chrono::{Days, NaiveDate};
use itertools::Itertools;
use plotters::prelude::*;

use crate::{ledger::Ledger, prelude::*};

/// 12×6 in at 300 DPI.
const SIZE: (u32, u32) = (3600, 1800);

/// Plot the full ledger as a line-and-marker series of value over date and
/// overwrite the PNG at `output_path`.
///
/// Rows are plotted in stored order, which is assumed chronological.
#[instrument(skip_all, fields(output_path = %output_path.display()))]
pub fn render(ledger: &Ledger, output_path: &Path) -> Result {
    let rows = ledger.read_all().context("failed to load the history")?;
    ensure!(!rows.is_empty(), "the ledger has no rows to plot");

    let points: Vec<(NaiveDate, f64)> = rows.iter().map(|row| (row.date, row.value.0)).collect();
    let (x_range, y_range) = ranges(&points);

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|error| anyhow!("failed to fill the canvas: {error}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Evolución del Valor del Dólar en Chile", ("sans-serif", 80))
        .margin(40)
        .x_label_area_size(140)
        .y_label_area_size(220)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|error| anyhow!("failed to build the chart: {error}"))?;
    chart
        .configure_mesh()
        .x_desc("Fecha")
        .y_desc("Pesos Chilenos (CLP)")
        .label_style(("sans-serif", 40))
        .axis_desc_style(("sans-serif", 50))
        .draw()
        .map_err(|error| anyhow!("failed to draw the mesh: {error}"))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(3)))
        .map_err(|error| anyhow!("failed to draw the series: {error}"))?;
    chart
        .draw_series(points.iter().map(|point| Circle::new(*point, 8, BLUE.filled())))
        .map_err(|error| anyhow!("failed to draw the markers: {error}"))?;

    root.present().map_err(|error| anyhow!("failed to write `{}`: {error}", output_path.display()))?;
    info!(n_points = points.len(), "rendered");
    Ok(())
}

/// Axis ranges with a padded value axis. A single observation still renders:
/// the degenerate date range is widened by a day on each side.
fn ranges(points: &[(NaiveDate, f64)]) -> (std::ops::Range<NaiveDate>, std::ops::Range<f64>) {
    let (mut x_min, mut x_max) = (points[0].0, points[points.len() - 1].0);
    if x_min == x_max {
        x_min = x_min.checked_sub_days(Days::new(1)).unwrap_or(x_min);
        x_max = x_max.checked_add_days(Days::new(1)).unwrap_or(x_max);
    }

    let (y_min, y_max) = points
        .iter()
        .map(|(_, value)| *value)
        .minmax()
        .into_option()
        .unwrap_or((0.0, 1.0));
    let padding = ((y_max - y_min) * 0.1).max(1.0);

    (x_min..x_max, (y_min - padding).max(0.0)..y_max + padding)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::{
        ledger::Row,
        quantity::{Pesos, Variation},
    };

    fn append(ledger: &Ledger, date: NaiveDate, value: f64) -> Result {
        ledger.append(&Row {
            date,
            value: Pesos(value),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            variation: Some(Variation(0.5)),
        })
    }

    #[test]
    fn test_empty_ledger_fails() {
        let directory = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(directory.path().join("missing.csv"));
        assert!(render(&ledger, &directory.path().join("chart.png")).is_err());
    }

    #[test]
    fn test_degenerate_date_range_is_widened() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (x_range, y_range) = ranges(&[(date, 950.32)]);
        assert!(x_range.start < date);
        assert!(x_range.end > date);
        assert!(y_range.start < 950.32 && y_range.end > 950.32);
    }

    #[test]
    #[ignore = "needs a system font for the labels"]
    fn test_render_single_point() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("historico.csv"));
        append(&ledger, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 950.32)?;

        let output_path = directory.path().join("chart.png");
        render(&ledger, &output_path)?;
        assert!(output_path.metadata()?.len() > 0);
        Ok(())
    }

    #[test]
    #[ignore = "needs a system font for the labels"]
    fn test_render_many_points() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::new(directory.path().join("historico.csv"));
        let mut date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for value in [950.32, 948.11, 961.7, 955.0] {
            append(&ledger, date, value)?;
            date = date.succ_opt().unwrap();
        }

        let output_path = directory.path().join("chart.png");
        render(&ledger, &output_path)?;
        assert!(output_path.metadata()?.len() > 0);
        Ok(())
    }
}
