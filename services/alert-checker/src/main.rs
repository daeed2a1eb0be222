//! Air-quality alert checker.
//!
//! Runs the check pipeline once or on a fixed interval against the
//! configured reading source.

use std::sync::Arc;

use air_common::{BoundingBox, Pollutant};
use alerting::{InMemoryAlertStore, InMemoryUsers};
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use alert_checker::{create_source, load_users, CheckPipeline, CheckReport, CheckerConfig};

#[derive(Parser, Debug)]
#[command(name = "alert-checker")]
#[command(about = "Interpolate pollutant readings and raise threshold alerts")]
struct Args {
    /// Configuration file path; defaults plus environment when omitted
    #[arg(short, long, env = "ALERT_CHECKER_CONFIG")]
    config: Option<String>,

    /// Run one cycle and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Check only this pollutant (default: all configured)
    #[arg(short, long)]
    pollutant: Option<String>,

    /// Fixed grid bounds as "minx,miny,maxx,maxy"
    #[arg(long)]
    bbox: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Human-readable logs instead of JSON
    #[arg(long)]
    pretty: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt().with_env_filter(filter).with_target(true);
    if args.pretty {
        builder.pretty().init();
    } else {
        builder.json().init();
    }
}

fn print_report(report: &CheckReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args);

    info!("Starting alert checker");

    let mut config = match &args.config {
        Some(path) => CheckerConfig::load(path)?,
        None => CheckerConfig::from_env()?,
    };
    if let Some(code) = &args.pollutant {
        let pollutant: Pollutant = code.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        config.pollutants = vec![pollutant];
    }
    if let Some(bbox) = &args.bbox {
        config.bounds = Some(BoundingBox::from_csv(bbox)?);
    }
    info!(pollutants = ?config.pollutants, forecast = config.forecast.enabled, "Loaded configuration");

    let users = match &config.users_file {
        Some(path) => load_users(path).await?,
        None => Vec::new(),
    };

    let source = create_source(&config.source);
    let store = Arc::new(InMemoryAlertStore::new());
    let pipeline = CheckPipeline::new(config, source, Arc::new(InMemoryUsers::new(users)), store.clone());

    if !args.once {
        info!("Starting continuous polling");
        pipeline.run_forever().await;
        return Ok(());
    }

    let mut failed = 0;
    for (pollutant, result) in pipeline.check_all(pipeline.now()).await? {
        match result {
            Ok(report) => print_report(&report)?,
            Err(e) => {
                error!(pollutant = %pollutant, error = %e, retryable = e.is_retryable(), "Check failed");
                failed += 1;
            }
        }
    }

    info!(records = store.records().await.len(), failed, "Check cycle finished");
    anyhow::ensure!(failed == 0, "{} pollutant check(s) failed", failed);
    Ok(())
}
