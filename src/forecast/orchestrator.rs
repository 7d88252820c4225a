//! Multi-series orchestration: fan out per-metric pipelines, fan in on a
//! common future date axis.
//!
//! Each metric's pipeline runs as its own blocking task; a failure is logged
//! and skipped, never fatal to the run. The join stage is deterministic and
//! keyed by date with inner-join semantics.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::{month_label, MetricForecast, WideForecastTable, WideRow};
use crate::error::{PipelineError, PipelineResult};
use crate::repo::SeriesReader;

use super::engine::MetricPipeline;

/// Result of one metric's pipeline task.
pub struct MetricOutcome {
    pub metric: String,
    pub result: PipelineResult<MetricForecast>,
}

/// Runs the per-metric pipelines and assembles the wide forecast table.
pub struct ForecastOrchestrator {
    pipeline: MetricPipeline,
    metrics: Vec<String>,
    horizon: usize,
}

impl ForecastOrchestrator {
    pub fn new(pipeline: MetricPipeline, metrics: Vec<String>, horizon: usize) -> Self {
        Self {
            pipeline,
            metrics,
            horizon,
        }
    }

    /// Fetch every configured metric's history, run the pipelines on the
    /// blocking pool, and join the surviving forecasts.
    ///
    /// Fails only when no metric succeeds.
    pub async fn run(&self, reader: &dyn SeriesReader) -> PipelineResult<WideForecastTable> {
        let mut tasks = Vec::with_capacity(self.metrics.len());
        let mut outcomes: Vec<MetricOutcome> = Vec::with_capacity(self.metrics.len());

        for metric in &self.metrics {
            let series = match reader.fetch_daily_series(metric).await {
                Ok(series) => series,
                Err(e) => {
                    outcomes.push(MetricOutcome {
                        metric: metric.clone(),
                        result: Err(PipelineError::DataUnavailable {
                            metric: metric.clone(),
                            reason: e.to_string(),
                        }),
                    });
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            let name = metric.clone();
            let horizon = self.horizon;
            tasks.push(tokio::task::spawn_blocking(move || MetricOutcome {
                result: pipeline.run(&name, &series, horizon),
                metric: name,
            }));
        }

        for joined in futures::future::join_all(tasks).await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                // A panicked task loses its metric name; the join error text
                // still identifies the task for the log.
                Err(e) => warn!(error = %e, "metric pipeline task panicked"),
            }
        }

        let mut forecasts = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(forecast) => forecasts.push(forecast),
                Err(e) => warn!(metric = %outcome.metric, error = %e, "metric skipped"),
            }
        }

        if forecasts.is_empty() {
            return Err(PipelineError::NoMetricSucceeded);
        }

        info!(
            succeeded = forecasts.len(),
            configured = self.metrics.len(),
            "assembling wide forecast table"
        );
        Ok(assemble_wide_table(&forecasts))
    }
}

/// Inner-join per-metric forecasts on date, restricted to dates strictly
/// after the run-global cutoff (the latest last-historical date across the
/// successful metrics), and derive the month label per row.
///
/// Dates dropped by the cutoff or the join are surfaced as per-metric counts.
pub fn assemble_wide_table(forecasts: &[MetricForecast]) -> WideForecastTable {
    let cutoff = forecasts
        .iter()
        .map(|f| f.last_historical)
        .max()
        .expect("at least one forecast");

    // Per metric: future dates that survive the cutoff.
    let mut per_metric: Vec<BTreeMap<NaiveDate, f64>> = Vec::with_capacity(forecasts.len());
    for forecast in forecasts {
        let kept: BTreeMap<NaiveDate, f64> = forecast
            .points
            .iter()
            .filter(|p| p.date > cutoff)
            .map(|p| (p.date, p.yhat))
            .collect();
        let dropped = forecast.points.len() - kept.len();
        if dropped > 0 {
            warn!(
                metric = %forecast.metric,
                dropped,
                %cutoff,
                "dates at or before the run cutoff dropped from the wide table"
            );
        }
        per_metric.push(kept);
    }

    // Intersection of the per-metric date sets.
    let mut common: Vec<NaiveDate> = per_metric
        .first()
        .map(|m| m.keys().copied().collect())
        .unwrap_or_default();
    for map in &per_metric[1..] {
        common.retain(|date| map.contains_key(date));
    }

    for (forecast, map) in forecasts.iter().zip(&per_metric) {
        let dropped = map.len() - common.len();
        if dropped > 0 {
            warn!(
                metric = %forecast.metric,
                dropped,
                "dates dropped by the inner join across metrics"
            );
        }
    }

    let rows = common
        .iter()
        .map(|&date| WideRow {
            reading_date: date,
            month: month_label(date),
            values: per_metric.iter().map(|m| m[&date]).collect(),
        })
        .collect();

    WideForecastTable {
        metrics: forecasts.iter().map(|f| f.metric.clone()).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CorrectedPoint;
    use chrono::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn forecast(metric: &str, last_historical: NaiveDate, horizon: usize, value: f64) -> MetricForecast {
        MetricForecast {
            metric: metric.to_string(),
            last_historical,
            points: (1..=horizon)
                .map(|k| CorrectedPoint {
                    date: last_historical + Duration::days(k as i64),
                    yhat: value,
                    lower: value - 1.0,
                    upper: value + 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_join_intersects_future_ranges() {
        // Metric A: D+1..D+10, metric B: D+1..D+8 -> exactly 8 rows.
        let a = forecast("a", day(10), 10, 1.0);
        let b = forecast("b", day(10), 8, 2.0);

        let table = assemble_wide_table(&[a, b]);
        assert_eq!(table.rows.len(), 8);
        assert_eq!(table.metrics, vec!["a", "b"]);
        assert_eq!(table.rows[0].reading_date, day(11));
        assert_eq!(table.rows[0].values, vec![1.0, 2.0]);
        assert_eq!(table.rows[0].month, "June");
    }

    #[test]
    fn test_cutoff_uses_latest_history() {
        // Metric A's history ends later; B's early future dates overlap A's
        // history and must not survive.
        let a = forecast("a", day(10), 5, 1.0); // future 11..15
        let b = forecast("b", day(7), 10, 2.0); // future 8..17

        let table = assemble_wide_table(&[a, b]);
        let dates: Vec<NaiveDate> = table.rows.iter().map(|r| r.reading_date).collect();
        assert_eq!(dates, vec![day(11), day(12), day(13), day(14), day(15)]);
    }

    #[test]
    fn test_disjoint_ranges_produce_empty_table() {
        let a = forecast("a", day(1), 3, 1.0); // future 2..4
        let b = forecast("b", day(20), 3, 2.0); // future 21..23

        let table = assemble_wide_table(&[a, b]);
        assert!(table.is_empty());
        assert_eq!(table.metrics.len(), 2);
    }

    #[test]
    fn test_single_metric_passthrough() {
        let table = assemble_wide_table(&[forecast("a", day(1), 4, 9.0)]);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.prediction_columns(), vec!["a_pred"]);
    }

    #[test]
    fn test_values_follow_metric_order() {
        let a = forecast("first", day(5), 3, 10.0);
        let b = forecast("second", day(5), 3, 20.0);
        let table = assemble_wide_table(&[a, b]);
        for row in &table.rows {
            assert_eq!(row.values, vec![10.0, 20.0]);
        }
    }
}
