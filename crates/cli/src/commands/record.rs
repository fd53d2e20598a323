//! `record` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::{CompressionKind, LoggerBlueprint};

use crate::cli::RecordArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // CLI overrides
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding storage directory from CLI");
        blueprint.storage.base_path = output.clone();
    }
    if let Some(ref name) = args.name {
        info!(name = %name, "Overriding session name from CLI");
        blueprint.session.name = name.clone();
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid CLI overrides")?;

    info!(
        session = %blueprint.session.name,
        storage = %blueprint.storage.base_path.display(),
        hardware = blueprint.hardware.len(),
        compression = ?blueprint.storage.compression,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let duration = if args.duration == 0 {
        None
    } else {
        Some(Duration::from_secs(args.duration))
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!(duration_secs = ?duration.map(|d| d.as_secs()), "Starting recording...");

    let stats = pipeline
        .run(stop_signal(duration))
        .await
        .context("Recording failed")?;

    info!(
        blocks = stats.session.blocks_written,
        samples = stats.session.samples_written,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.1}", stats.samples_per_sec()),
        "Recording completed"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C, SIGTERM or after `duration`
async fn stop_signal(duration: Option<Duration>) {
    let timer = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = timer => info!("Recording duration reached"),
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping recording..."),
    }
}

/// Ctrl+C and SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &LoggerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Session:");
    println!("  Name: {}", blueprint.session.name);
    if !blueprint.session.driver.is_empty() {
        println!("  Driver: {}", blueprint.session.driver);
    }
    if !blueprint.session.vehicle.is_empty() {
        println!("  Vehicle: {}", blueprint.session.vehicle);
    }

    if !blueprint.hardware.is_empty() {
        println!("\nHardware ({}):", blueprint.hardware.len());
        for item in &blueprint.hardware {
            println!(
                "  - {} ({:?} via {:?})",
                item.identifier, item.class, item.connection
            );
        }
    }

    println!("\nFlush Policy:");
    println!("  G-force threshold: {:.2} g", blueprint.flush.gforce_threshold);
    println!("  Event rate limit: {:.2} s", blueprint.flush.event_rate_limit_s);
    println!("  Time threshold: {:.0} s", blueprint.flush.time_threshold_s);

    println!("\nStorage:");
    println!("  Directory: {}", blueprint.storage.base_path.display());
    match blueprint.storage.capacity_bytes {
        Some(bytes) => println!("  Capacity: {} bytes", bytes),
        None => println!("  Capacity: unbounded (retention idle)"),
    }
    if blueprint.storage.compression == CompressionKind::Deflate {
        println!("  Compression: deflate");
    }

    if blueprint.retention.enabled {
        println!(
            "\nRetention: {:.0}% -> {:.0}% every {} s",
            blueprint.retention.high_water * 100.0,
            blueprint.retention.low_water * 100.0,
            blueprint.retention.interval_s
        );
    } else {
        println!("\nRetention: disabled");
    }

    println!();
}
