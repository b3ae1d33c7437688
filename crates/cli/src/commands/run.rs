//! `run` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{Settings, StreamSourceKind, STREAM_HOST_KEY, STREAM_REPLAY_PATH_KEY};
use dispatcher::create_default_sink;
use ingestion::{ConfiguredStreamClient, StreamCloser};
use tracing::{debug, error, info, warn};

use crate::cli::Cli;
use crate::error::CliError;
use crate::pipeline::Pipeline;

/// Execute the bridge for the configuration at `config_path`
pub async fn run_bridge(config_path: &Path, cli: &Cli) -> Result<()> {
    info!(config = %config_path.display(), "Loading configuration");

    // Validate config path
    if !config_path.exists() {
        return Err(CliError::config_not_found(config_path.display().to_string()).into());
    }

    // Load, parse and validate configuration
    let settings = config_loader::ConfigLoader::load_from_path(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let terms = settings.filter_terms();
    info!(
        topic = %settings.topic(),
        terms = %terms,
        keys = settings.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if cli.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&settings)?;
        return Ok(());
    }

    // Sink first: a bad producer configuration fails before the stream connects
    let sink = create_default_sink(&settings).context("Failed to create sink")?;
    let client = ConfiguredStreamClient::from_settings(&settings)
        .context("Failed to configure stream client")?;

    let pipeline = Pipeline::new(settings, client, sink);
    debug!(state = %pipeline.state(), "Pipeline created");

    let running = pipeline.start().await.context("Failed to start bridge")?;
    debug!(state = %running.state(), "Pipeline started");

    // Setup graceful shutdown handler
    let shutdown = tokio::spawn(close_on_signal(running.closer()));

    info!("Bridge running, press Ctrl+C to stop");
    let result = running.run().await;
    shutdown.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        delivered = stats.deliveries.delivered,
        failed = stats.deliveries.failed,
        abandoned = stats.deliveries.abandoned,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Bridge stopped"
    );

    // Print detailed statistics
    stats.print_summary();

    info!("Stream Bridge finished");
    Ok(())
}

/// Close the stream on Ctrl+C or SIGTERM
async fn close_on_signal(closer: StreamCloser) {
    shutdown_signal().await;
    warn!("Received shutdown signal, closing stream and draining...");
    closer.close();
}

/// Wait for Ctrl+C or SIGTERM
///
/// A handler that fails to install never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Mask a secret for display
fn mask(value: &str) -> String {
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = value.chars().take(2).collect();
        format!("{prefix}****")
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(settings: &Settings) -> Result<()> {
    let credentials = settings.credentials()?;
    let source = settings.stream_source()?;

    println!("\n=== Configuration Summary ===\n");
    println!("Stream:");
    match source {
        StreamSourceKind::Tcp => println!(
            "  Source: tcp ({})",
            settings.get(STREAM_HOST_KEY).unwrap_or_default()
        ),
        StreamSourceKind::Replay => println!(
            "  Source: replay ({})",
            settings.get(STREAM_REPLAY_PATH_KEY).unwrap_or_default()
        ),
    }
    println!("  Terms: {}", settings.filter_terms());

    println!("\nCredentials:");
    println!("  Consumer key: {}", mask(&credentials.consumer_key));
    println!("  Consumer secret: {}", mask(&credentials.consumer_secret));
    println!("  Token: {}", mask(&credentials.token));
    println!("  Token secret: {}", mask(&credentials.token_secret));

    println!("\nRelay:");
    println!("  Capacity: {}", settings.relay_capacity()?);
    match settings.drain_timeout()? {
        Some(timeout) => println!("  Drain timeout: {}ms", timeout.as_millis()),
        None => println!("  Drain timeout: unbounded"),
    }

    println!("\nSink:");
    println!("  Topic: {}", settings.topic());
    let passthrough: Vec<_> = settings.passthrough().collect();
    if !passthrough.is_empty() {
        println!("  Producer settings ({}):", passthrough.len());
        for (key, value) in passthrough {
            println!("    {key} = {value}");
        }
    }

    println!();
    Ok(())
}
