//! Forecast accuracy metrics.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Standard regression accuracy metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    /// Compute metrics for paired predictions and actuals.
    pub fn calculate(predictions: &[f64], actuals: &[f64]) -> PipelineResult<Self> {
        if predictions.len() != actuals.len() {
            return Err(PipelineError::ModelFit(format!(
                "prediction/actual count mismatch: {} vs {}",
                predictions.len(),
                actuals.len()
            )));
        }
        if predictions.is_empty() {
            return Err(PipelineError::ModelFit("no predictions to evaluate".into()));
        }

        let n = predictions.len() as f64;

        let mae: f64 = predictions
            .iter()
            .zip(actuals)
            .map(|(p, a)| (p - a).abs())
            .sum::<f64>()
            / n;

        let mse: f64 = predictions
            .iter()
            .zip(actuals)
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / n;
        let rmse = mse.sqrt();

        let mape: f64 = predictions
            .iter()
            .zip(actuals)
            .filter(|(_, a)| a.abs() > 1e-10)
            .map(|(p, a)| ((p - a) / a).abs() * 100.0)
            .sum::<f64>()
            / n;

        let mean_actual: f64 = actuals.iter().sum::<f64>() / n;
        let ss_tot: f64 = actuals.iter().map(|a| (a - mean_actual).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(actuals)
            .map(|(p, a)| (a - p).powi(2))
            .sum();
        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - (ss_res / ss_tot)
        };

        Ok(Self { mae, rmse, mape, r2 })
    }

    /// Accuracy in [0, 1] derived from MAPE, the grade the run reports.
    pub fn accuracy(&self) -> f64 {
        ((100.0 - self.mape) / 100.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_metrics() {
        let predictions = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let actuals = vec![1.1, 2.1, 2.9, 4.2, 4.8];

        let metrics = ValidationMetrics::calculate(&predictions, &actuals).unwrap();
        assert!(metrics.mae < 0.3);
        assert!(metrics.rmse < 0.4);
        assert!(metrics.r2 > 0.9);
    }

    #[test]
    fn test_perfect_predictions() {
        let values = vec![10.0, 20.0, 30.0];
        let metrics = ValidationMetrics::calculate(&values, &values).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mape, 0.0);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.accuracy(), 1.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(ValidationMetrics::calculate(&[1.0], &[1.0, 2.0]).is_err());
        assert!(ValidationMetrics::calculate(&[], &[]).is_err());
    }

    #[test]
    fn test_accuracy_is_clamped() {
        let metrics = ValidationMetrics {
            mae: 0.0,
            rmse: 0.0,
            mape: 250.0,
            r2: 0.0,
        };
        assert_eq!(metrics.accuracy(), 0.0);
    }
}
