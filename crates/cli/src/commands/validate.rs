//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{LoggerBlueprint, MAX_HARDWARE_ID};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    session: String,
    hardware_count: usize,
    storage: String,
    compression: String,
    queue_capacity: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    session: blueprint.session.name.clone(),
                    hardware_count: blueprint.hardware.len(),
                    storage: blueprint.storage.base_path.display().to_string(),
                    compression: format!("{:?}", blueprint.storage.compression),
                    queue_capacity: blueprint.queue.capacity,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
///
/// Flush thresholds the manager would ignore at runtime are reported here
/// rather than rejected.
fn collect_warnings(blueprint: &LoggerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let flush = &blueprint.flush;

    if !(flush.gforce_threshold.is_finite() && flush.gforce_threshold > 0.0) {
        warnings.push(format!(
            "flush.gforce_threshold = {} is ignored, default 3.0 g applies",
            flush.gforce_threshold
        ));
    }
    if !(flush.event_rate_limit_s.is_finite() && flush.event_rate_limit_s >= 0.0) {
        warnings.push(format!(
            "flush.event_rate_limit_s = {} is ignored, default 1.0 s applies",
            flush.event_rate_limit_s
        ));
    }
    if !(flush.time_threshold_s.is_finite() && flush.time_threshold_s > 0.0) {
        warnings.push(format!(
            "flush.time_threshold_s = {} is ignored, default 300 s applies",
            flush.time_threshold_s
        ));
    }

    if blueprint.storage.capacity_bytes.is_none() && blueprint.retention.enabled {
        warnings.push("storage.capacity_bytes is unset - retention will never evict".to_string());
    }

    for item in &blueprint.hardware {
        if item.identifier.len() > MAX_HARDWARE_ID {
            warnings.push(format!(
                "hardware identifier '{}' exceeds {} bytes and will be truncated",
                item.identifier, MAX_HARDWARE_ID
            ));
        }
    }

    if blueprint.hardware.is_empty() {
        warnings.push("No hardware items configured - session files carry no provenance".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Session: {}", summary.session);
            println!("  Hardware items: {}", summary.hardware_count);
            println!("  Storage: {}", summary.storage);
            println!("  Compression: {}", summary.compression);
            println!("  Queue capacity: {}", summary.queue_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
