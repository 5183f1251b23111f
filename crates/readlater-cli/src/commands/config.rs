//! Config command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};

use readlater_core::{Config, DuplicatePolicy};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config = Config::load_with_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "duplicate_policy": config.duplicate_policy,
                    "search_debounce_ms": config.search_debounce_ms,
                    "poll_interval_ms": config.poll_interval_ms,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:           {}", config.data_dir.display());
            println!("  duplicate_policy:   {}", config.duplicate_policy);
            println!("  search_debounce_ms: {}", config.search_debounce_ms);
            println!("  poll_interval_ms:   {}", config.poll_interval_ms);
            println!(
                "  log_file:           {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let mut config = Config::load_with_override(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "duplicate_policy" => {
            config.duplicate_policy = value
                .parse::<DuplicatePolicy>()
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        "search_debounce_ms" => {
            config.search_debounce_ms = value
                .parse()
                .context("Invalid value for search_debounce_ms. Use a number of milliseconds.")?;
        }
        "poll_interval_ms" => {
            config.poll_interval_ms = value
                .parse()
                .context("Invalid value for poll_interval_ms. Use a number of milliseconds.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone().into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, duplicate_policy, search_debounce_ms, poll_interval_ms, log_file",
                key
            );
        }
    }

    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
