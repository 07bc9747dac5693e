//! Composition worker binary.
//!
//! Reads a `CompositionRequest` as JSON from the file given as the first
//! argument (or stdin), runs it and prints the `CompositionResult` as JSON.

use std::io::Read;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::{CompositionRequest, CompositionResult};
use reel_worker::{metrics, CompositionService, WorkerConfig};

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reel=info".parse()?);

    // Logs go to stderr; stdout carries the result.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn read_request() -> anyhow::Result<CompositionRequest> {
    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request file {}", path))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read request from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("Failed to parse composition request")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    info!("Starting reel-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
        info!(%addr, "Metrics exporter listening");
    }

    if let Err(e) = reel_media::check_ffmpeg() {
        warn!("{}; every composition will fail", e);
    }

    let request = read_request()?;
    let service = CompositionService::new(config);
    let result = service.submit_composition_job(request).await;

    println!("{}", serde_json::to_string(&result)?);

    if let CompositionResult::Failure { message, .. } = &result {
        anyhow::bail!("composition failed: {}", message);
    }
    Ok(())
}
