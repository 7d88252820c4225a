//! Per-metric diagnostic artifacts.
//!
//! CSV dumps of each metric's forecast and of the baseline's decomposed
//! components. Write-only and best-effort: callers log failures and carry on,
//! the numeric result is never affected.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use crate::domain::{BaselinePoint, CorrectedPoint};
use crate::forecast::baseline::ComponentPoint;

/// Write `<metric>_forecast.csv` and `<metric>_components.csv` under `dir`.
///
/// The forecast file carries the baseline over the full extended range plus
/// the corrected values for future dates (empty for historical rows).
pub fn write_metric_artifacts(
    dir: &Path,
    metric: &str,
    extended: &[BaselinePoint],
    components: &[ComponentPoint],
    corrected: &[CorrectedPoint],
) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    write_forecast_csv(&dir.join(format!("{metric}_forecast.csv")), extended, corrected)?;
    write_components_csv(&dir.join(format!("{metric}_components.csv")), components)?;
    Ok(())
}

fn write_forecast_csv(
    path: &Path,
    extended: &[BaselinePoint],
    corrected: &[CorrectedPoint],
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(BufWriter::new(File::create(path)?));
    wtr.write_record(["date", "yhat", "lower", "upper", "corrected"])?;

    for point in extended {
        let correction = corrected
            .iter()
            .find(|c| c.date == point.date)
            .map(|c| format!("{:.4}", c.yhat))
            .unwrap_or_default();
        wtr.write_record(&[
            point.date.to_string(),
            format!("{:.4}", point.yhat),
            format!("{:.4}", point.lower),
            format!("{:.4}", point.upper),
            correction,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_components_csv(path: &Path, components: &[ComponentPoint]) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(BufWriter::new(File::create(path)?));
    wtr.write_record(["date", "trend", "weekly", "yearly"])?;

    for point in components {
        wtr.write_record(&[
            point.date.to_string(),
            format!("{:.4}", point.trend),
            format!("{:.4}", point.weekly),
            format!("{:.4}", point.yearly),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_artifacts_are_written() {
        let dir = std::env::temp_dir().join("cpf_diag_test");
        let _ = fs::remove_dir_all(&dir);

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let extended = vec![BaselinePoint {
            date,
            yhat: 10.0,
            lower: 8.0,
            upper: 12.0,
        }];
        let components = vec![ComponentPoint {
            date,
            trend: 9.0,
            weekly: 1.0,
            yearly: 0.0,
        }];
        let corrected = vec![CorrectedPoint {
            date,
            yhat: 10.5,
            lower: 8.5,
            upper: 12.5,
        }];

        write_metric_artifacts(&dir, "solar_generation", &extended, &components, &corrected)
            .unwrap();

        let forecast = fs::read_to_string(dir.join("solar_generation_forecast.csv")).unwrap();
        assert!(forecast.contains("2024-05-01"));
        assert!(forecast.contains("10.5000"));
        assert!(fs::metadata(dir.join("solar_generation_components.csv")).is_ok());

        let _ = fs::remove_dir_all(&dir);
    }
}
