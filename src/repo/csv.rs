//! CSV-backed storage: one input file per metric, one output file per run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use super::{ForecastSink, SeriesReader};
use crate::domain::{DailyPoint, TimeSeries, WideForecastTable};

/// Reads `<data_dir>/<metric>.csv` files with `reading_date,value` columns.
///
/// Rows with an empty value cell (blank spreadsheet export cells) are
/// skipped; rows are sorted by date before validation.
#[derive(Debug, Clone)]
pub struct CsvSeriesReader {
    data_dir: PathBuf,
}

impl CsvSeriesReader {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl SeriesReader for CsvSeriesReader {
    async fn fetch_daily_series(&self, metric: &str) -> Result<TimeSeries> {
        let path = self.data_dir.join(format!("{metric}.csv"));
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let mut rdr = ::csv::ReaderBuilder::new().from_reader(bytes.as_slice());
        let mut points = Vec::new();
        for record in rdr.records() {
            let record = record.with_context(|| format!("parsing {}", path.display()))?;
            let date_field = record
                .get(0)
                .with_context(|| format!("missing date column in {}", path.display()))?;
            let value_field = record.get(1).unwrap_or("").trim();
            if value_field.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(date_field.trim(), "%Y-%m-%d")
                .with_context(|| format!("bad date `{date_field}` in {}", path.display()))?;
            let value: f64 = value_field
                .parse()
                .with_context(|| format!("bad value `{value_field}` in {}", path.display()))?;
            points.push(DailyPoint { date, value });
        }

        points.sort_by_key(|p| p.date);
        let series = TimeSeries::new(points)?;
        info!(metric, points = series.len(), "loaded series from csv");
        Ok(series)
    }
}

/// Writes the wide forecast table to a single CSV file, replacing any
/// previous output.
#[derive(Debug, Clone)]
pub struct CsvForecastSink {
    path: PathBuf,
}

impl CsvForecastSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ForecastSink for CsvForecastSink {
    async fn replace_wide_forecast(&self, table: &WideForecastTable) -> Result<()> {
        let mut wtr = ::csv::WriterBuilder::new().from_writer(Vec::new());

        let mut header = vec!["reading_date".to_string(), "month".to_string()];
        header.extend(table.prediction_columns());
        wtr.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.reading_date.to_string(), row.month.clone()];
            record.extend(row.values.iter().map(|v| format!("{v:.4}")));
            wtr.write_record(&record)?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing csv writer: {e}"))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!(rows = table.rows.len(), path = %self.path.display(), "wide forecast written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WideRow;
    use std::fs;

    #[tokio::test]
    async fn test_roundtrip_metric_csv() {
        let dir = std::env::temp_dir().join("cpf_csv_reader_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("solar_generation.csv"),
            "reading_date,value\n2024-01-02,5.5\n2024-01-01,4.0\n2024-01-03,\n",
        )
        .unwrap();

        let reader = CsvSeriesReader::new(dir.clone());
        let series = reader.fetch_daily_series("solar_generation").await.unwrap();

        // Blank value skipped, rows sorted by date.
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.first_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(series.values(), vec![4.0, 5.5]);

        assert!(reader.fetch_daily_series("missing_metric").await.is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_sink_writes_header_and_rows() {
        let path = std::env::temp_dir().join("cpf_csv_sink_test/forecast_data_wide.csv");
        let table = WideForecastTable {
            metrics: vec!["solar_generation".into()],
            rows: vec![WideRow {
                reading_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                month: "July".into(),
                values: vec![12.25],
            }],
        };

        CsvForecastSink::new(path.clone())
            .replace_wide_forecast(&table)
            .await
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("reading_date,month,solar_generation_pred"));
        assert!(written.contains("2024-07-01,July,12.2500"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
