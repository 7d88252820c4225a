//! In-memory series reader for tests and demos.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::SeriesReader;
use crate::domain::TimeSeries;

/// Serves preloaded series keyed by metric name.
#[derive(Debug, Default)]
pub struct InMemorySeriesReader {
    series: HashMap<String, TimeSeries>,
}

impl InMemorySeriesReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: impl Into<String>, series: TimeSeries) {
        self.series.insert(metric.into(), series);
    }

    pub fn with_series(mut self, metric: impl Into<String>, series: TimeSeries) -> Self {
        self.insert(metric, series);
        self
    }
}

#[async_trait]
impl SeriesReader for InMemorySeriesReader {
    async fn fetch_daily_series(&self, metric: &str) -> Result<TimeSeries> {
        match self.series.get(metric) {
            Some(series) => Ok(series.clone()),
            None => bail!("no series loaded for metric `{metric}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_fetch_known_and_unknown_metric() {
        let series = TimeSeries::from_parts(
            &[NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
            &[1.0],
        )
        .unwrap();
        let reader = InMemorySeriesReader::new().with_series("solar_generation", series);

        assert_eq!(
            reader
                .fetch_daily_series("solar_generation")
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(reader.fetch_daily_series("missing").await.is_err());
    }
}
