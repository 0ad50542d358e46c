//! Demo binary: drives the data logger with a simulated variable source.
//!
//! A background task produces random-walk values for every configured
//! variable, the logger assembles datapoints per the configured trigger and
//! each finished datapoint is published as a JSON line on stdout. On ctrl-c
//! (or after `--duration`) the collected history is saved to disk.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use daqlog::config::Settings;
use daqlog::datapoint::{Datapoint, TIME_H_KEY, TIME_KEY};
use daqlog::events::DatapointPublisher;
use daqlog::logger::DataLogger;
use daqlog::monitor::LagMonitor;

#[derive(Parser, Debug)]
#[command(name = "daqlog", about = "Triggered data logging against a simulated source.")]
struct Cli {
    /// Settings file (TOML) without extension, e.g. `config/default`.
    #[arg(short, long)]
    config: Option<String>,

    /// Variables declaration overriding the settings file,
    /// e.g. `"time:s, noise, sine:V"`.
    #[arg(long)]
    variables: Option<String>,

    /// Timer interval in seconds, overriding the settings file.
    #[arg(long)]
    interval: Option<f64>,

    /// History length limit in datapoints (0 disables cutting).
    #[arg(long)]
    limit: Option<usize>,

    /// Run duration in seconds; runs until ctrl-c when omitted.
    #[arg(long)]
    duration: Option<f64>,
}

/// Publishes finished datapoints as JSON lines on stdout.
struct StdoutPublisher;

impl DatapointPublisher for StdoutPublisher {
    fn publish(&self, datapoint: &Datapoint) -> Result<()> {
        println!("{}", serde_json::to_string(datapoint)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(variables) = cli.variables {
        settings.logger.variables = variables;
    }
    if let Some(interval) = cli.interval {
        settings.logger.trigger_interval = Duration::from_secs_f64(interval);
    }
    if let Some(limit) = cli.limit {
        settings.logger.data_length_limit = limit;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    let logger = DataLogger::new();
    logger.set_publisher(StdoutPublisher);
    logger.set_data_length_limit(settings.logger.data_length_limit);

    let config = settings.logger.to_session_config();
    let simulated: Vec<String> = config
        .variables
        .iter()
        .filter(|name| name.as_str() != TIME_KEY && name.as_str() != TIME_H_KEY)
        .cloned()
        .collect();
    let source_period = settings.logger.trigger_interval / 3;
    logger.start_collecting(config)?;

    let monitor = Arc::new(LagMonitor::new(logger.clone()));
    let source = tokio::spawn(simulate_source(
        logger.clone(),
        Arc::clone(&monitor),
        simulated,
        source_period,
    ));

    match cli.duration {
        Some(seconds) => tokio::time::sleep(Duration::from_secs_f64(seconds)).await,
        None => tokio::signal::ctrl_c().await?,
    }

    source.abort();
    drop(monitor);
    logger.stop();

    let path = logger.save_data(
        &settings.save_path,
        "daqlog demo run with a simulated source",
        "",
        serde_json::Value::Null,
    )?;
    info!(
        path = %path.display(),
        datapoints = logger.get_list_length(),
        "data saved"
    );
    Ok(())
}

/// Deliver random-walk values for every simulated variable.
async fn simulate_source(
    logger: DataLogger,
    monitor: Arc<LagMonitor>,
    variables: Vec<String>,
    period: Duration,
) {
    let mut values: HashMap<String, f64> = HashMap::new();
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(10)));
    loop {
        ticker.tick().await;
        for name in &variables {
            let step: f64 = rand::thread_rng().gen_range(-0.5..=0.5);
            let value = values.entry(name.clone()).or_insert(0.0);
            *value += step;
            logger.handle_update(name, Some(*value));
        }
        monitor.touch();
    }
}
