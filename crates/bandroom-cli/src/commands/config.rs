//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use bandroom_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, db_file, verbose, max_attempts, retry_backoff_ms, \
                          busy_timeout_ms, repair_on_lock, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "db_file": config.db_file,
                    "db_path": config.db_path(),
                    "verbose": config.verbose,
                    "max_attempts": config.max_attempts,
                    "retry_backoff_ms": config.retry_backoff_ms,
                    "busy_timeout_ms": config.busy_timeout_ms,
                    "repair_on_lock": config.repair_on_lock,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.db_path().display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!("  db_file:          {}", config.db_file.display());
            println!("  verbose:          {}", config.verbose);
            println!("  max_attempts:     {}", config.max_attempts);
            println!("  retry_backoff_ms: {}", config.retry_backoff_ms);
            println!("  busy_timeout_ms:  {}", config.busy_timeout_ms);
            println!("  repair_on_lock:   {}", config.repair_on_lock);
            println!(
                "  log_file:         {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Store file:  {}", config.db_path().display());
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply_setting(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let saved = match config_path {
        Some(path) => config.save_to_path(path),
        None => config.save(),
    };
    saved.context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Parse `value` into the field named by `key`
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "db_file" => config.db_file = value.into(),
        "verbose" => {
            config.verbose = value
                .parse()
                .context("Invalid value for verbose. Use 'true' or 'false'.")?;
        }
        "max_attempts" => {
            config.max_attempts = value
                .parse()
                .context("Invalid value for max_attempts. Use a whole number.")?;
        }
        "retry_backoff_ms" => {
            config.retry_backoff_ms = value
                .parse()
                .context("Invalid value for retry_backoff_ms. Use milliseconds.")?;
        }
        "busy_timeout_ms" => {
            config.busy_timeout_ms = value
                .parse()
                .context("Invalid value for busy_timeout_ms. Use milliseconds.")?;
        }
        "repair_on_lock" => {
            config.repair_on_lock = value
                .parse()
                .context("Invalid value for repair_on_lock. Use 'true' or 'false'.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EnvGuard;

    #[test]
    fn test_apply_setting() {
        let mut config = Config::default();

        apply_setting(&mut config, "db_file", "school.db").unwrap();
        apply_setting(&mut config, "max_attempts", "5").unwrap();
        apply_setting(&mut config, "repair_on_lock", "true").unwrap();
        apply_setting(&mut config, "log_file", "/tmp/bandroom.log").unwrap();

        assert!(config.db_path().ends_with("school.db"));
        assert_eq!(config.max_attempts, 5);
        assert!(config.repair_on_lock);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/bandroom.log")));

        apply_setting(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_setting_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply_setting(&mut config, "max_attempts", "many").is_err());
        assert!(apply_setting(&mut config, "verbose", "loud").is_err());

        let err = apply_setting(&mut config, "colour", "blue").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_set_writes_config_file() {
        let _guard = EnvGuard::clean();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set("busy_timeout_ms".into(), "250".into(), Some(&path), &output).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("busy_timeout_ms = 250"));
    }

    #[test]
    fn test_set_without_path_uses_default_config_file() {
        let _guard = EnvGuard::clean();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bandroom").join("config.toml");
        std::env::set_var("BANDROOM_CONFIG", &path);
        let output = Output::new(OutputFormat::Quiet);

        set("max_attempts".into(), "6".into(), None, &output).unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.max_attempts, 6);
    }
}
