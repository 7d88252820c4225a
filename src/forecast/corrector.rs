//! Recursive residual correction over the future horizon.
//!
//! Walks the future dates one at a time. Each step builds features against a
//! running buffer seeded with the full historical series and extended with
//! the *corrected* prediction of every earlier step, so lag and rolling
//! features see prior corrections, never raw baseline values. The steps are
//! inherently sequential: each depends on the buffer mutated by all prior
//! steps.

use crate::domain::{BaselinePoint, CorrectedPoint, TimeSeries};
use crate::error::PipelineResult;

use super::features::FeatureBuilder;
use super::residual::ResidualPredictor;

/// Sequential corrector owning the running value buffer for one metric.
pub struct RecursiveCorrector<'a> {
    builder: &'a FeatureBuilder,
    model: &'a dyn ResidualPredictor,
    /// History values followed by corrected predictions, in date order.
    buffer: Vec<f64>,
    corrected: Vec<CorrectedPoint>,
}

impl<'a> RecursiveCorrector<'a> {
    /// Seed the buffer with the full historical target series.
    pub fn new(
        builder: &'a FeatureBuilder,
        model: &'a dyn ResidualPredictor,
        history: &TimeSeries,
    ) -> Self {
        Self {
            builder,
            model,
            buffer: history.values(),
            corrected: Vec::new(),
        }
    }

    /// Current buffer length: historical points plus corrected steps so far.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Correct one future date and append the result to the buffer.
    ///
    /// An incomplete feature row here means the buffer is shorter than the
    /// warm-up window, which cannot happen when the history satisfies the
    /// pipeline's minimum length; the error is propagated rather than
    /// papered over with a default.
    pub fn step(&mut self, baseline: &BaselinePoint) -> PipelineResult<CorrectedPoint> {
        let row = self.builder.build_row(baseline.date, &self.buffer);
        let residual = self.model.predict_residual(&row)?;

        let point = CorrectedPoint {
            date: baseline.date,
            yhat: baseline.yhat + residual,
            lower: baseline.lower + residual,
            upper: baseline.upper + residual,
        };
        self.buffer.push(point.yhat);
        self.corrected.push(point);
        Ok(point)
    }

    /// Process every future date in order and return the corrected forecast.
    pub fn run(mut self, future: &[BaselinePoint]) -> PipelineResult<Vec<CorrectedPoint>> {
        for baseline in future {
            self.step(baseline)?;
        }
        Ok(self.corrected)
    }
}
