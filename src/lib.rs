//! Hybrid daily forecaster for campus power metrics.
//!
//! A baseline trend/seasonality model produces first-pass forecasts with
//! uncertainty bounds; a gradient-boosted residual model corrects the
//! baseline's systematic errors day by day over the future horizon. The
//! orchestrator runs the pipeline per metric and joins the results into a
//! single wide table, one row per future date.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod repo;
pub mod telemetry;

pub use error::{PipelineError, PipelineResult};
