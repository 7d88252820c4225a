//! Daily time series primitives shared by the whole pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// One observed value for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// An ordered univariate daily series.
///
/// Dates are unique and strictly increasing; downstream lag features assume a
/// daily cadence without gaps, so `new` rejects out-of-order input but a gap
/// only degrades lag quality rather than failing construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<DailyPoint>,
}

impl TimeSeries {
    /// Build a series from points, validating date ordering.
    pub fn new(points: Vec<DailyPoint>) -> PipelineResult<Self> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(PipelineError::InvalidSeries(format!(
                    "dates must be strictly increasing: {} followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { points })
    }

    /// Build a series from parallel date/value slices.
    pub fn from_parts(dates: &[NaiveDate], values: &[f64]) -> PipelineResult<Self> {
        if dates.len() != values.len() {
            return Err(PipelineError::InvalidSeries(format!(
                "date/value length mismatch: {} dates, {} values",
                dates.len(),
                values.len()
            )));
        }
        let points = dates
            .iter()
            .zip(values.iter())
            .map(|(&date, &value)| DailyPoint { date, value })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Copy out the value column.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Copy out the date column.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// The leading portion of the series, used for holdout evaluation.
    pub fn head(&self, n: usize) -> Self {
        Self {
            points: self.points[..n.min(self.points.len())].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_new_accepts_increasing_dates() {
        let series = TimeSeries::new(vec![
            DailyPoint { date: day(1), value: 1.0 },
            DailyPoint { date: day(2), value: 2.0 },
            DailyPoint { date: day(3), value: 3.0 },
        ])
        .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), Some(day(1)));
        assert_eq!(series.last_date(), Some(day(3)));
    }

    #[test]
    fn test_new_rejects_duplicates_and_disorder() {
        let dup = TimeSeries::new(vec![
            DailyPoint { date: day(1), value: 1.0 },
            DailyPoint { date: day(1), value: 2.0 },
        ]);
        assert!(dup.is_err());

        let disorder = TimeSeries::new(vec![
            DailyPoint { date: day(2), value: 1.0 },
            DailyPoint { date: day(1), value: 2.0 },
        ]);
        assert!(disorder.is_err());
    }

    #[test]
    fn test_from_parts_checks_lengths() {
        let err = TimeSeries::from_parts(&[day(1)], &[1.0, 2.0]);
        assert!(err.is_err());
    }

    #[test]
    fn test_head() {
        let series =
            TimeSeries::from_parts(&[day(1), day(2), day(3)], &[1.0, 2.0, 3.0]).unwrap();
        let head = series.head(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head.last_date(), Some(day(2)));
        assert_eq!(series.head(10).len(), 3);
    }
}
