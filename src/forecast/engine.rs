//! Per-metric forecasting pipeline.
//!
//! Runs the full hybrid procedure for one metric: fit the baseline, learn
//! its residuals, then correct the future scaffold recursively. One pipeline
//! instance is self-contained and shares no state with other metrics.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::diagnostics;
use crate::domain::{ForecastConfidence, MetricForecast, TimeSeries};
use crate::error::{PipelineError, PipelineResult};

use super::baseline::{BaselineConfig, SeasonalTrendModel};
use super::corrector::RecursiveCorrector;
use super::features::FeatureBuilder;
use super::metrics::ValidationMetrics;
use super::residual::{GradientBoostedRegressor, ResidualModelConfig};

/// Series-size thresholds gating what the pipeline attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Below this the metric is skipped outright.
    pub min_training_points: usize,
    /// Below this the holdout accuracy evaluation is skipped.
    pub min_evaluation_points: usize,
    /// Trailing window held out for the accuracy evaluation.
    pub holdout_days: usize,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            min_training_points: 21,
            min_evaluation_points: 120,
            holdout_days: 30,
        }
    }
}

/// End-to-end pipeline for a single metric.
#[derive(Debug, Clone)]
pub struct MetricPipeline {
    baseline: BaselineConfig,
    residual: ResidualModelConfig,
    thresholds: ThresholdsConfig,
    builder: FeatureBuilder,
    diagnostics_dir: Option<PathBuf>,
}

impl MetricPipeline {
    pub fn new(
        baseline: BaselineConfig,
        residual: ResidualModelConfig,
        thresholds: ThresholdsConfig,
    ) -> Self {
        Self {
            baseline,
            residual,
            thresholds,
            builder: FeatureBuilder::new(),
            diagnostics_dir: None,
        }
    }

    /// Enable best-effort CSV diagnostics under the given directory.
    pub fn with_diagnostics_dir(mut self, dir: PathBuf) -> Self {
        self.diagnostics_dir = Some(dir);
        self
    }

    /// Run the hybrid forecast for one metric over `horizon` future days.
    pub fn run(
        &self,
        metric: &str,
        series: &TimeSeries,
        horizon: usize,
    ) -> PipelineResult<MetricForecast> {
        if series.len() < self.thresholds.min_training_points {
            return Err(PipelineError::InsufficientData {
                metric: metric.to_string(),
                needed: self.thresholds.min_training_points,
                got: series.len(),
            });
        }

        self.evaluate_holdout_accuracy(metric, series);

        info!(metric, points = series.len(), horizon, "fitting baseline model");
        let mut baseline = SeasonalTrendModel::new(self.baseline.clone());
        baseline.fit(series)?;

        let residuals = baseline
            .residuals()
            .ok_or(PipelineError::FitRequired)?
            .to_vec();
        let rows = self.builder.build_history(series);

        let mut residual_model = GradientBoostedRegressor::new(self.residual.clone());
        residual_model.fit(&rows, &residuals)?;
        info!(
            metric,
            training_rows = residual_model.training_rows().unwrap_or(0),
            "residual model trained"
        );

        let future = baseline.predict_future(horizon)?;
        let corrected =
            RecursiveCorrector::new(&self.builder, &residual_model, series).run(&future)?;

        if let Some(dir) = &self.diagnostics_dir {
            let extended = baseline.extend_and_predict(horizon)?;
            let dates: Vec<_> = extended.iter().map(|p| p.date).collect();
            let components = baseline.components(&dates)?;
            if let Err(e) =
                diagnostics::write_metric_artifacts(dir, metric, &extended, &components, &corrected)
            {
                warn!(metric, error = %e, "failed to write diagnostic artifacts");
            }
        }

        let last_historical = series.last_date().ok_or(PipelineError::InsufficientData {
            metric: metric.to_string(),
            needed: 1,
            got: 0,
        })?;

        Ok(MetricForecast {
            metric: metric.to_string(),
            last_historical,
            points: corrected,
        })
    }

    /// Evaluate baseline accuracy on a trailing holdout and log the grade.
    /// Skipped for short series; never fatal.
    fn evaluate_holdout_accuracy(&self, metric: &str, series: &TimeSeries) {
        if series.len() < self.thresholds.min_evaluation_points {
            info!(
                metric,
                points = series.len(),
                needed = self.thresholds.min_evaluation_points,
                "series too short for holdout accuracy evaluation"
            );
            return;
        }

        let Some(split) = series.len().checked_sub(self.thresholds.holdout_days) else {
            return;
        };
        let train = series.head(split);
        let actuals: Vec<f64> = series.points()[split..].iter().map(|p| p.value).collect();

        let outcome = (|| -> PipelineResult<ValidationMetrics> {
            let mut model = SeasonalTrendModel::new(self.baseline.clone());
            model.fit(&train)?;
            let predictions: Vec<f64> = model
                .predict_future(self.thresholds.holdout_days)?
                .iter()
                .map(|p| p.yhat)
                .collect();
            ValidationMetrics::calculate(&predictions, &actuals)
        })();

        match outcome {
            Ok(metrics) => {
                let accuracy = metrics.accuracy();
                info!(
                    metric,
                    mape = metrics.mape,
                    rmse = metrics.rmse,
                    accuracy,
                    confidence = %ForecastConfidence::from_accuracy(accuracy),
                    "holdout accuracy"
                );
            }
            Err(e) => warn!(metric, error = %e, "holdout accuracy evaluation failed"),
        }
    }
}
