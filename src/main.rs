use anyhow::Result;
use campus_power_forecast::{config, forecast, repo, telemetry};
use config::Config;
use forecast::{ForecastOrchestrator, MetricPipeline};
use repo::ForecastSink;
use telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    if cfg.run.metrics.is_empty() {
        anyhow::bail!("no metrics configured; set [run].metrics in config/default.toml");
    }

    info!(
        metrics = cfg.run.metrics.len(),
        horizon_days = cfg.run.horizon_days,
        "starting wide forecast run"
    );

    let mut pipeline = MetricPipeline::new(
        cfg.baseline.clone(),
        cfg.residual.clone(),
        cfg.thresholds.clone(),
    );
    if let Some(dir) = &cfg.data.diagnostics_dir {
        pipeline = pipeline.with_diagnostics_dir(dir.clone());
    }

    let orchestrator =
        ForecastOrchestrator::new(pipeline, cfg.run.metrics.clone(), cfg.run.horizon_days);

    #[cfg(feature = "db")]
    {
        let pg = repo::pg::PgRepo::connect(&cfg.db.url).await?;
        let table = orchestrator.run(&pg).await?;
        info!(
            rows = table.rows.len(),
            columns = table.metrics.len(),
            "wide forecast table assembled"
        );
        pg.replace_wide_forecast(&table).await?;
    }

    #[cfg(not(feature = "db"))]
    {
        let reader = repo::CsvSeriesReader::new(cfg.data.csv_dir.clone());
        let sink = repo::CsvForecastSink::new(cfg.data.output_path.clone());
        let table = orchestrator.run(&reader).await?;
        info!(
            rows = table.rows.len(),
            columns = table.metrics.len(),
            "wide forecast table assembled"
        );
        sink.replace_wide_forecast(&table).await?;
    }

    info!("wide forecast run finished");
    Ok(())
}
