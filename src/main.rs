use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod error;
mod harness;
mod messaging;
mod metrics;
mod models;
mod query;
mod synthesizer;
mod utils;
mod verification;

#[cfg(test)]
mod testing;

use config::{Cli, Mode};
use harness::{shutdown_on, HarnessRunner, OrderFeed, RunSettings};
use messaging::{BusPublisher, KafkaTransport};
use metrics::HarnessMetrics;
use query::HttpQueryClient;
use verification::CacheVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // RUST_LOG overrides the default filter, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_cache_probe=debug"))
        )
        .init();

    let cli = Cli::parse();
    let config = cli.harness_config()?;
    let metrics = Arc::new(HarnessMetrics::new()?);

    tracing::info!(
        brokers = %config.bus.brokers,
        topic = %config.topic,
        query_url = %config.query.base_url,
        "🚀 Starting order pipeline harness"
    );

    let success = match cli.mode() {
        Mode::Verify => {
            let query = HttpQueryClient::new(&config.query).context("creating query client")?;
            let transport = KafkaTransport::new(&config.bus).context("creating bus producer")?;

            let runner = HarnessRunner::new(
                BusPublisher::new(transport, config.publish.clone()),
                CacheVerifier::new(query),
                metrics.clone(),
                RunSettings::from(&config),
            );

            let report = runner.run().await;
            report.log_summary();
            report.is_success()
        }
        Mode::Produce(settings) => {
            let shutdown = shutdown_on(shutdown_signal());
            let transport = KafkaTransport::new(&config.bus).context("creating bus producer")?;

            let feed = OrderFeed::new(
                BusPublisher::new(transport, config.publish.clone()),
                metrics.clone(),
                config.topic.clone(),
                settings,
            );

            feed.run(shutdown).await.is_success()
        }
    };

    export_metrics(&metrics, config.metrics_file.as_deref())?;

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C; feed runs until its count is reached");
        std::future::pending::<()>().await;
    }
}

fn export_metrics(metrics: &HarnessMetrics, path: Option<&Path>) -> anyhow::Result<()> {
    let text = metrics.render()?;

    match path {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("writing metrics to {}", path.display()))?;
            tracing::info!(path = %path.display(), "📊 Metrics written");
        }
        None => tracing::debug!(metrics = %text, "📊 Run metrics"),
    }

    Ok(())
}
