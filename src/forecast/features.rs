//! Feature engineering for the residual model.
//!
//! Derives calendar and lag/rolling-window features from a daily series. Lag
//! and rolling fields stay undefined when history is too short; nothing is
//! ever imputed.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::TimeSeries;
use crate::error::{PipelineError, PipelineResult};

/// Short lag offset in days.
pub const LAG_SHORT: usize = 7;
/// Long lag offset in days.
pub const LAG_LONG: usize = 14;
/// Trailing rolling-mean window in days (current day excluded).
pub const ROLLING_WINDOW: usize = 7;

/// Positions earlier than this lack at least one lag/rolling feature.
pub const WARMUP_POSITIONS: usize = LAG_LONG;

/// Feature column names, in the order produced by [`FeatureRow::to_vector`].
pub const FEATURE_NAMES: [&str; 8] = [
    "day_of_year",
    "day_of_week",
    "month",
    "year",
    "week_of_year",
    "lag_7",
    "lag_14",
    "rolling_mean_7",
];

/// Derived features for one time position.
///
/// Calendar fields are deterministic functions of the date and always
/// defined. Lag and rolling fields are `None` when the position has
/// insufficient prior history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// Day of year (1-366)
    pub day_of_year: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    /// Month (1-12)
    pub month: u32,
    pub year: i32,
    /// ISO week number (1-53)
    pub week_of_year: u32,
    /// Target value 7 positions earlier
    pub lag_7: Option<f64>,
    /// Target value 14 positions earlier
    pub lag_14: Option<f64>,
    /// Mean of the 7 values strictly preceding this position
    pub rolling_mean_7: Option<f64>,
}

impl FeatureRow {
    /// Whether every declared feature is defined.
    pub fn is_complete(&self) -> bool {
        self.missing_feature().is_none()
    }

    /// Name of the first undefined feature, if any.
    pub fn missing_feature(&self) -> Option<&'static str> {
        if self.lag_7.is_none() {
            Some("lag_7")
        } else if self.lag_14.is_none() {
            Some("lag_14")
        } else if self.rolling_mean_7.is_none() {
            Some("rolling_mean_7")
        } else {
            None
        }
    }

    /// Dense vector in [`FEATURE_NAMES`] order.
    ///
    /// Fails with `FeatureIncomplete` if any lag/rolling field is undefined;
    /// callers must guarantee completeness before converting.
    pub fn to_vector(&self) -> PipelineResult<Vec<f64>> {
        if let Some(missing) = self.missing_feature() {
            return Err(PipelineError::FeatureIncomplete {
                date: self.date,
                missing,
            });
        }
        Ok(vec![
            self.day_of_year as f64,
            self.day_of_week as f64,
            self.month as f64,
            self.year as f64,
            self.week_of_year as f64,
            self.lag_7.unwrap(),
            self.lag_14.unwrap(),
            self.rolling_mean_7.unwrap(),
        ])
    }
}

/// Builds [`FeatureRow`]s from a date and the values strictly preceding it.
///
/// The same builder serves training (prior values are actual observations)
/// and recursive prediction (prior values include earlier corrected
/// predictions); the caller chooses what the history slice contains.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the row for the position immediately after `prior_values`.
    pub fn build_row(&self, date: NaiveDate, prior_values: &[f64]) -> FeatureRow {
        let n = prior_values.len();

        let lag_7 = (n >= LAG_SHORT).then(|| prior_values[n - LAG_SHORT]);
        let lag_14 = (n >= LAG_LONG).then(|| prior_values[n - LAG_LONG]);
        let rolling_mean_7 = (n >= ROLLING_WINDOW).then(|| {
            let window = &prior_values[n - ROLLING_WINDOW..];
            window.iter().sum::<f64>() / window.len() as f64
        });

        FeatureRow {
            date,
            day_of_year: date.ordinal(),
            day_of_week: date.weekday().num_days_from_monday(),
            month: date.month(),
            year: date.year(),
            week_of_year: date.iso_week().week(),
            lag_7,
            lag_14,
            rolling_mean_7,
        }
    }

    /// Build one row per position of a historical series.
    ///
    /// Position `i` sees `values[..i]` as its history, so the first
    /// [`WARMUP_POSITIONS`] rows are incomplete.
    pub fn build_history(&self, series: &TimeSeries) -> Vec<FeatureRow> {
        let values = series.values();
        series
            .points()
            .iter()
            .enumerate()
            .map(|(i, p)| self.build_row(p.date, &values[..i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSeries;
    use rstest::rstest;

    fn series(n: usize) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let values: Vec<f64> = (0..n).map(|i| i as f64 * 10.0).collect();
        TimeSeries::from_parts(&dates, &values).unwrap()
    }

    #[test]
    fn test_calendar_fields() {
        let builder = FeatureBuilder::new();
        // 2024-01-01 is a Monday, day-of-year 1, ISO week 1.
        let row = builder.build_row(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &[]);
        assert_eq!(row.day_of_week, 0);
        assert_eq!(row.day_of_year, 1);
        assert_eq!(row.month, 1);
        assert_eq!(row.year, 2024);
        assert_eq!(row.week_of_year, 1);
    }

    #[test]
    fn test_first_14_positions_are_incomplete() {
        let builder = FeatureBuilder::new();
        let rows = builder.build_history(&series(30));

        for (i, row) in rows.iter().enumerate() {
            if i < WARMUP_POSITIONS {
                assert!(!row.is_complete(), "position {i} should be incomplete");
            } else {
                assert!(row.is_complete(), "position {i} should be complete");
            }
        }
    }

    #[test]
    fn test_lag_values_point_backwards() {
        let builder = FeatureBuilder::new();
        let rows = builder.build_history(&series(30));

        // values are i*10, so lag_7 at position 20 is value at position 13.
        assert_eq!(rows[20].lag_7, Some(130.0));
        assert_eq!(rows[20].lag_14, Some(60.0));
        // rolling mean over positions 13..=19
        let expected = (13..20).map(|i| i as f64 * 10.0).sum::<f64>() / 7.0;
        assert_eq!(rows[20].rolling_mean_7, Some(expected));
    }

    #[rstest]
    #[case(0, false, false, false)]
    #[case(6, false, false, false)]
    #[case(7, true, false, true)]
    #[case(13, true, false, true)]
    #[case(14, true, true, true)]
    fn test_definedness_by_history_length(
        #[case] n: usize,
        #[case] lag_7: bool,
        #[case] lag_14: bool,
        #[case] rolling: bool,
    ) {
        let builder = FeatureBuilder::new();
        let prior: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let row = builder.build_row(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &prior);
        assert_eq!(row.lag_7.is_some(), lag_7);
        assert_eq!(row.lag_14.is_some(), lag_14);
        assert_eq!(row.rolling_mean_7.is_some(), rolling);
    }

    #[test]
    fn test_rolling_mean_excludes_current_day() {
        let builder = FeatureBuilder::new();
        let prior = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let row = builder.build_row(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &prior);
        assert_eq!(row.rolling_mean_7, Some(4.0));
        assert_eq!(row.lag_7, Some(1.0));
        assert_eq!(row.lag_14, None);
    }

    #[test]
    fn test_to_vector_errors_on_incomplete() {
        let builder = FeatureBuilder::new();
        let row = builder.build_row(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &[1.0]);
        let err = row.to_vector().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FeatureIncomplete { missing: "lag_7", .. }
        ));
    }

    #[test]
    fn test_to_vector_order_matches_names() {
        let builder = FeatureBuilder::new();
        let prior: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let row = builder.build_row(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &prior);
        let vec = row.to_vector().unwrap();
        assert_eq!(vec.len(), FEATURE_NAMES.len());
        assert_eq!(vec[5], row.lag_7.unwrap());
        assert_eq!(vec[6], row.lag_14.unwrap());
        assert_eq!(vec[7], row.rolling_mean_7.unwrap());
    }
}
