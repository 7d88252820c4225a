//! Residual learner: a gradient-boosted regression ensemble.
//!
//! Trained to predict the baseline forecaster's historical errors from the
//! derived features. Boosting is built over smartcore's deterministic
//! regression trees; with `subsample < 1.0` the row draws come from a seeded
//! RNG, so identical input and configuration always reproduce the same model.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use super::features::{FeatureRow, FEATURE_NAMES};
use crate::error::{PipelineError, PipelineResult};

/// Hyperparameters of the residual model. Fixed configuration, not tuned at
/// runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualModelConfig {
    /// Number of boosting stages.
    pub n_estimators: usize,
    /// Shrinkage applied to each stage's contribution.
    pub learning_rate: f64,
    /// Depth limit of each tree.
    pub max_depth: u16,
    /// Fraction of rows drawn per stage; 1.0 disables subsampling.
    pub subsample: f64,
    /// Seed for the subsample draws.
    pub seed: u64,
}

impl Default for ResidualModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 3,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl ResidualModelConfig {
    fn validate(&self) -> PipelineResult<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::ModelFit("n_estimators must be positive".into()));
        }
        if self.learning_rate <= 0.0 || self.learning_rate > 1.0 {
            return Err(PipelineError::ModelFit(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.subsample <= 0.0 || self.subsample > 1.0 {
            return Err(PipelineError::ModelFit(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

struct FittedEnsemble {
    init: f64,
    trees: Vec<Tree>,
    training_rows: usize,
}

/// Gradient-boosted regressor mapping a complete [`FeatureRow`] to a scalar
/// residual estimate. Immutable once trained.
pub struct GradientBoostedRegressor {
    config: ResidualModelConfig,
    state: Option<FittedEnsemble>,
}

impl GradientBoostedRegressor {
    pub fn new(config: ResidualModelConfig) -> Self {
        Self { config, state: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Number of rows that survived the completeness filter during training.
    pub fn training_rows(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.training_rows)
    }

    /// Fit the ensemble on feature rows and their residual targets.
    ///
    /// Rows with any undefined feature are excluded; with daily history this
    /// drops the first 14 positions.
    pub fn fit(&mut self, rows: &[FeatureRow], targets: &[f64]) -> PipelineResult<()> {
        self.config.validate()?;
        if rows.len() != targets.len() {
            return Err(PipelineError::ModelFit(format!(
                "feature/target count mismatch: {} rows, {} targets",
                rows.len(),
                targets.len()
            )));
        }

        let mut x_rows: Vec<Vec<f64>> = Vec::with_capacity(rows.len());
        let mut y: Vec<f64> = Vec::with_capacity(rows.len());
        for (row, &target) in rows.iter().zip(targets) {
            if row.is_complete() {
                x_rows.push(row.to_vector()?);
                y.push(target);
            }
        }

        let n = x_rows.len();
        if n < 2 {
            return Err(PipelineError::ModelFit(format!(
                "need at least 2 complete feature rows to train, got {n}"
            )));
        }

        let n_features = FEATURE_NAMES.len();
        let flat: Vec<f64> = x_rows.iter().flatten().copied().collect();
        let x_full = DenseMatrix::new(n, n_features, flat, false);

        let init = y.iter().sum::<f64>() / n as f64;
        let mut current: Vec<f64> = vec![init; n];
        let mut trees: Vec<Tree> = Vec::with_capacity(self.config.n_estimators);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let params = || DecisionTreeRegressorParameters {
            max_depth: Some(self.config.max_depth),
            min_samples_leaf: 1,
            min_samples_split: 2,
            ..Default::default()
        };

        for _stage in 0..self.config.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, c)| t - c).collect();

            let tree = if self.config.subsample < 1.0 {
                let k = ((n as f64 * self.config.subsample).floor() as usize).max(2);
                let indices = rand::seq::index::sample(&mut rng, n, k);
                let mut sub_flat = Vec::with_capacity(k * n_features);
                let mut sub_y = Vec::with_capacity(k);
                for idx in indices.iter() {
                    sub_flat.extend_from_slice(&x_rows[idx]);
                    sub_y.push(residuals[idx]);
                }
                let x_sub = DenseMatrix::new(k, n_features, sub_flat, false);
                DecisionTreeRegressor::fit(&x_sub, &sub_y, params())
            } else {
                DecisionTreeRegressor::fit(&x_full, &residuals, params())
            }
            .map_err(|e| PipelineError::ModelFit(format!("tree fit failed: {:?}", e)))?;

            let stage_pred = tree
                .predict(&x_full)
                .map_err(|e| PipelineError::ModelFit(format!("stage predict failed: {:?}", e)))?;
            for (c, p) in current.iter_mut().zip(&stage_pred) {
                *c += self.config.learning_rate * p;
            }
            trees.push(tree);
        }

        self.state = Some(FittedEnsemble {
            init,
            trees,
            training_rows: n,
        });
        Ok(())
    }

    /// Predict the residual for one feature row.
    ///
    /// Fails with `FeatureIncomplete` if any required feature is undefined;
    /// callers must guarantee completeness before invoking.
    pub fn predict(&self, row: &FeatureRow) -> PipelineResult<f64> {
        let state = self.state.as_ref().ok_or(PipelineError::FitRequired)?;
        let vector = row.to_vector()?;
        let x = DenseMatrix::new(1, vector.len(), vector, false);

        let mut acc = state.init;
        for tree in &state.trees {
            let pred = tree
                .predict(&x)
                .map_err(|e| PipelineError::ModelFit(format!("predict failed: {:?}", e)))?;
            acc += self.config.learning_rate * pred[0];
        }
        Ok(acc)
    }
}

/// Seam between the corrector and the fitted residual model, so the corrector
/// can be exercised with a stub in tests.
pub trait ResidualPredictor {
    fn predict_residual(&self, row: &FeatureRow) -> PipelineResult<f64>;
}

impl ResidualPredictor for GradientBoostedRegressor {
    fn predict_residual(&self, row: &FeatureRow) -> PipelineResult<f64> {
        self.predict(row)
    }
}
