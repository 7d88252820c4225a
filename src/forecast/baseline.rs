//! Baseline seasonal/trend forecaster.
//!
//! A decomposable model: linear trend plus Fourier seasonality terms, fitted
//! with ordinary least squares. Weekly seasonality (order 3) is the
//! configuration this pipeline runs with; yearly (order 10) is available for
//! series long enough to support it. The fit is fully deterministic.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{BaselinePoint, TimeSeries};
use crate::error::{PipelineError, PipelineResult};

const WEEKLY_PERIOD_DAYS: f64 = 7.0;
const YEARLY_PERIOD_DAYS: f64 = 365.25;
const WEEKLY_FOURIER_ORDER: usize = 3;
const YEARLY_FOURIER_ORDER: usize = 10;

/// Baseline model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    /// Coverage level of the uncertainty bounds, e.g. 0.95.
    pub interval_level: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            weekly_seasonality: true,
            yearly_seasonality: false,
            interval_level: 0.95,
        }
    }
}

/// Decomposed baseline components for one date, for diagnostics output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentPoint {
    pub date: NaiveDate,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
}

#[derive(Debug, Clone)]
struct FittedState {
    origin: NaiveDate,
    t_scale: f64,
    beta: Vec<f64>,
    sigma: f64,
    z: f64,
    train_dates: Vec<NaiveDate>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
}

/// Trend + seasonality baseline model.
#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    config: BaselineConfig,
    state: Option<FittedState>,
}

impl SeasonalTrendModel {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config, state: None }
    }

    fn n_columns(&self) -> usize {
        let mut n = 2; // intercept + trend
        if self.config.weekly_seasonality {
            n += 2 * WEEKLY_FOURIER_ORDER;
        }
        if self.config.yearly_seasonality {
            n += 2 * YEARLY_FOURIER_ORDER;
        }
        n
    }

    fn design_row(&self, t_days: f64, t_scale: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.n_columns());
        row.push(1.0);
        row.push(t_days / t_scale);
        if self.config.weekly_seasonality {
            push_fourier(&mut row, t_days, WEEKLY_PERIOD_DAYS, WEEKLY_FOURIER_ORDER);
        }
        if self.config.yearly_seasonality {
            push_fourier(&mut row, t_days, YEARLY_PERIOD_DAYS, YEARLY_FOURIER_ORDER);
        }
        row
    }

    /// Fit trend and seasonality to a historical series.
    pub fn fit(&mut self, series: &TimeSeries) -> PipelineResult<()> {
        if self.config.interval_level <= 0.0 || self.config.interval_level >= 1.0 {
            return Err(PipelineError::ModelFit(format!(
                "interval_level must be in (0, 1), got {}",
                self.config.interval_level
            )));
        }
        let n = series.len();
        let p = self.n_columns();
        if n <= p {
            return Err(PipelineError::ModelFit(format!(
                "need more than {p} points to fit {p} coefficients, got {n}"
            )));
        }

        let origin = series.first_date().expect("non-empty series");
        let span = (series.last_date().unwrap() - origin).num_days();
        let t_scale = (span as f64).max(1.0);

        let rows: Vec<Vec<f64>> = series
            .points()
            .iter()
            .map(|point| self.design_row((point.date - origin).num_days() as f64, t_scale))
            .collect();
        let y = series.values();

        let beta = solve_least_squares(&rows, &y)?;

        let fitted: Vec<f64> = rows.iter().map(|row| dot(row, &beta)).collect();
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();
        let dof = (n - p) as f64;
        let sigma = (residuals.iter().map(|r| r * r).sum::<f64>() / dof).sqrt();
        let z = quantile_normal(0.5 + self.config.interval_level / 2.0);

        self.state = Some(FittedState {
            origin,
            t_scale,
            beta,
            sigma,
            z,
            train_dates: series.dates(),
            fitted,
            residuals,
        });
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// In-sample residuals (actual - fitted), in training order.
    pub fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn state(&self) -> PipelineResult<&FittedState> {
        self.state.as_ref().ok_or(PipelineError::FitRequired)
    }

    /// In-sample predictions for every historical date, used only to compute
    /// residual training targets.
    pub fn predict_historical(&self) -> PipelineResult<Vec<BaselinePoint>> {
        let state = self.state()?;
        let half_width = state.z * state.sigma;
        Ok(state
            .train_dates
            .iter()
            .zip(&state.fitted)
            .map(|(&date, &yhat)| BaselinePoint {
                date,
                yhat,
                lower: yhat - half_width,
                upper: yhat + half_width,
            })
            .collect())
    }

    /// Forecast `periods` daily steps beyond the last historical date.
    ///
    /// Bound width grows with the square root of the step count, the usual
    /// convention for extrapolated uncertainty.
    pub fn predict_future(&self, periods: usize) -> PipelineResult<Vec<BaselinePoint>> {
        let state = self.state()?;
        let last = *state.train_dates.last().expect("fitted on non-empty series");
        let mut out = Vec::with_capacity(periods);
        for step in 1..=periods {
            let date = last + Duration::days(step as i64);
            let t_days = (date - state.origin).num_days() as f64;
            let yhat = dot(&self.design_row(t_days, state.t_scale), &state.beta);
            let half_width = state.z * state.sigma * (step as f64).sqrt();
            out.push(BaselinePoint {
                date,
                yhat,
                lower: yhat - half_width,
                upper: yhat + half_width,
            });
        }
        Ok(out)
    }

    /// Historical range plus `periods` future days, at daily frequency.
    pub fn extend_and_predict(&self, periods: usize) -> PipelineResult<Vec<BaselinePoint>> {
        let mut all = self.predict_historical()?;
        all.extend(self.predict_future(periods)?);
        Ok(all)
    }

    /// Decompose the fit into trend and seasonal parts for the given dates.
    pub fn components(&self, dates: &[NaiveDate]) -> PipelineResult<Vec<ComponentPoint>> {
        let state = self.state()?;
        let weekly_offset = 2;
        let yearly_offset = weekly_offset
            + if self.config.weekly_seasonality {
                2 * WEEKLY_FOURIER_ORDER
            } else {
                0
            };
        Ok(dates
            .iter()
            .map(|&date| {
                let t_days = (date - state.origin).num_days() as f64;
                let trend = state.beta[0] + state.beta[1] * t_days / state.t_scale;
                let weekly = if self.config.weekly_seasonality {
                    let mut row = Vec::with_capacity(2 * WEEKLY_FOURIER_ORDER);
                    push_fourier(&mut row, t_days, WEEKLY_PERIOD_DAYS, WEEKLY_FOURIER_ORDER);
                    dot(&row, &state.beta[weekly_offset..weekly_offset + row.len()])
                } else {
                    0.0
                };
                let yearly = if self.config.yearly_seasonality {
                    let mut row = Vec::with_capacity(2 * YEARLY_FOURIER_ORDER);
                    push_fourier(&mut row, t_days, YEARLY_PERIOD_DAYS, YEARLY_FOURIER_ORDER);
                    dot(&row, &state.beta[yearly_offset..yearly_offset + row.len()])
                } else {
                    0.0
                };
                ComponentPoint { date, trend, weekly, yearly }
            })
            .collect())
    }
}

fn push_fourier(row: &mut Vec<f64>, t_days: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * std::f64::consts::PI * k as f64 * t_days / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `X beta = y` in the least-squares sense via the normal equations
/// with Gaussian elimination and partial pivoting.
fn solve_least_squares(rows: &[Vec<f64>], y: &[f64]) -> PipelineResult<Vec<f64>> {
    let p = rows[0].len();

    // Accumulate X'X and X'y.
    let mut a = vec![vec![0.0; p + 1]; p];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..p {
            for j in 0..p {
                a[i][j] += row[i] * row[j];
            }
            a[i][p] += row[i] * target;
        }
    }

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap();
        if a[pivot_row][col].abs() < 1e-12 {
            return Err(PipelineError::ModelFit(
                "design matrix is rank deficient".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        for row in col + 1..p {
            let factor = a[row][col] / a[col][col];
            for k in col..=p {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let mut beta = vec![0.0; p];
    for row in (0..p).rev() {
        let mut acc = a[row][p];
        for col in row + 1..p {
            acc -= a[row][col] * beta[col];
        }
        beta[row] = acc / a[row][row];
    }
    Ok(beta)
}

/// Inverse CDF of the standard normal distribution (Acklam's rational
/// approximation, |relative error| < 1.15e-9).
fn quantile_normal(p: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0);

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
