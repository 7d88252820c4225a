//! Storage seams the forecasting core reads from and writes to.
//!
//! The core only sees these traits; concrete backends are a CSV directory
//! (always available) and PostgreSQL behind the `db` feature.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{TimeSeries, WideForecastTable};

pub mod csv;
pub mod memory;

#[cfg(feature = "db")]
pub mod pg;

pub use csv::{CsvForecastSink, CsvSeriesReader};
pub use memory::InMemorySeriesReader;

/// Per-metric historical series accessor.
#[async_trait]
pub trait SeriesReader: Send + Sync {
    /// Fetch the full available daily history for one metric, ordered by
    /// date. An error signals absence of data; the caller treats it as a
    /// skip condition for that metric.
    async fn fetch_daily_series(&self, metric: &str) -> Result<TimeSeries>;
}

/// Destination for the assembled wide forecast table.
#[async_trait]
pub trait ForecastSink: Send + Sync {
    /// Persist the table, replacing any previous run's output.
    async fn replace_wide_forecast(&self, table: &WideForecastTable) -> Result<()>;
}
