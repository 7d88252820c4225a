use std::path::PathBuf;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::forecast::{BaselineConfig, ResidualModelConfig, ThresholdsConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    pub db: DbConfig,
    pub baseline: BaselineConfig,
    pub residual: ResidualModelConfig,
    pub thresholds: ThresholdsConfig,
}

/// What to forecast: the metric columns and how far ahead.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub metrics: Vec<String>,
    pub horizon_days: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory with one `<metric>.csv` history file per metric.
    pub csv_dir: PathBuf,
    /// Where the wide forecast CSV is written (non-db builds).
    pub output_path: PathBuf,
    /// Per-metric diagnostic dumps land here when set.
    pub diagnostics_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CPF__").split("__"));
        Ok(figment.extract()?)
    }
}
