//! Error types for the forecasting pipeline.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running a metric's forecasting pipeline.
///
/// A `PipelineError` is scoped to a single metric: the orchestrator treats it
/// as "skip this metric and keep going", never as a reason to abort the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The metric's historical series could not be loaded.
    #[error("no data available for metric `{metric}`: {reason}")]
    DataUnavailable { metric: String, reason: String },

    /// The series exists but is too short for residual training.
    #[error("insufficient data for `{metric}`: need at least {needed} points, got {got}")]
    InsufficientData {
        metric: String,
        needed: usize,
        got: usize,
    },

    /// Series dates are not unique and strictly increasing.
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    /// A feature row lacks a required field at a position where completeness
    /// is assumed (past the warm-up window during recursive prediction).
    #[error("incomplete features at {date}: `{missing}` is undefined")]
    FeatureIncomplete {
        date: NaiveDate,
        missing: &'static str,
    },

    /// The underlying model fit failed for numerical reasons.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// Predict was called on a model that has not been fitted.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Every configured metric failed; the run has nothing to write.
    #[error("no metric pipeline succeeded")]
    NoMetricSucceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = PipelineError::InsufficientData {
            metric: "solar_generation".into(),
            needed: 21,
            got: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for `solar_generation`: need at least 21 points, got 5"
        );

        let err = PipelineError::FeatureIncomplete {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            missing: "lag_14",
        };
        assert_eq!(
            err.to_string(),
            "incomplete features at 2024-03-01: `lag_14` is undefined"
        );

        assert_eq!(
            PipelineError::FitRequired.to_string(),
            "model must be fitted before prediction"
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = PipelineError::NoMetricSucceeded;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
