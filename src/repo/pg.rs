#![cfg(feature = "db")]
//! PostgreSQL storage backend.
//!
//! Reads per-metric history from the ingestion pipeline's `power_data` table
//! and persists the wide forecast table, recreating it each run. Column names
//! come from run configuration, so queries are built at runtime with quoted
//! identifiers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use super::{ForecastSink, SeriesReader};
use crate::domain::{DailyPoint, TimeSeries, WideForecastTable};

const WIDE_TABLE: &str = "forecast_data_wide";

pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SeriesReader for PgRepo {
    async fn fetch_daily_series(&self, metric: &str) -> Result<TimeSeries> {
        let sql = format!(
            r#"SELECT reading_date, "{metric}" FROM power_data ORDER BY reading_date"#
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("fetching history for `{metric}`"))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let date: NaiveDate = row.try_get("reading_date")?;
            // NULL cells (missing spreadsheet readings) are skipped.
            let value: Option<f64> = row.try_get(metric)?;
            if let Some(value) = value {
                points.push(DailyPoint { date, value });
            }
        }

        let series = TimeSeries::new(points)?;
        info!(metric, points = series.len(), "loaded series from postgres");
        Ok(series)
    }
}

#[async_trait]
impl ForecastSink for PgRepo {
    async fn replace_wide_forecast(&self, table: &WideForecastTable) -> Result<()> {
        let mut columns = vec![
            "reading_date DATE PRIMARY KEY".to_string(),
            "month VARCHAR(20)".to_string(),
        ];
        columns.extend(
            table
                .prediction_columns()
                .iter()
                .map(|c| format!(r#""{c}" FLOAT"#)),
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {WIDE_TABLE}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE {WIDE_TABLE} ({})",
            columns.join(", ")
        ))
        .execute(&mut *tx)
        .await?;

        let quoted: Vec<String> = table
            .prediction_columns()
            .iter()
            .map(|c| format!(r#""{c}""#))
            .collect();
        let placeholders: Vec<String> =
            (1..=2 + quoted.len()).map(|i| format!("${i}")).collect();
        let insert = format!(
            "INSERT INTO {WIDE_TABLE} (reading_date, month, {}) VALUES ({})",
            quoted.join(", "),
            placeholders.join(", ")
        );

        for row in &table.rows {
            let mut query = sqlx::query(&insert)
                .bind(row.reading_date)
                .bind(row.month.as_str());
            for value in &row.values {
                query = query.bind(*value);
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(rows = table.rows.len(), table = WIDE_TABLE, "wide forecast persisted");
        Ok(())
    }
}
