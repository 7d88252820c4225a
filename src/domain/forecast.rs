//! Forecast result types produced by the pipeline stages.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Forecast confidence grade derived from holdout accuracy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForecastConfidence {
    High,   // > 90% accuracy expected
    Medium, // 70-90% accuracy expected
    Low,    // < 70% accuracy expected
}

impl std::fmt::Display for ForecastConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl ForecastConfidence {
    /// Create from a numerical accuracy value (0.0 - 1.0)
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 0.9 {
            Self::High
        } else if accuracy >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One date of a baseline forecast: point estimate plus uncertainty bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselinePoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

/// One future date after residual correction.
///
/// `yhat` is baseline + predicted residual; bounds are the baseline bounds
/// shifted by the same residual, so the interval width is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectedPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Final per-metric output of the pipeline: corrected future forecasts only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricForecast {
    pub metric: String,
    /// Last date for which an actual observation exists.
    pub last_historical: NaiveDate,
    pub points: Vec<CorrectedPoint>,
}

/// One row of the wide forecast table.
///
/// `values` is aligned with the owning table's `metrics` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub reading_date: NaiveDate,
    pub month: String,
    pub values: Vec<f64>,
}

/// The orchestrator's output: one row per common future date, one column per
/// successful metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideForecastTable {
    pub metrics: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideForecastTable {
    /// Storage column names in table order: `<metric>_pred`.
    pub fn prediction_columns(&self) -> Vec<String> {
        self.metrics.iter().map(|m| format!("{m}_pred")).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// English month name used as the wide table's derived calendar label.
pub fn month_label(date: NaiveDate) -> String {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS[date.month0() as usize].to_string()
}
