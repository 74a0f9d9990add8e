//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/bandroom/config.toml)
//! 3. Environment variables (BANDROOM_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::RetryPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "BANDROOM";

/// Default name of the store file inside `data_dir`
pub const DEFAULT_DB_FILE: &str = "inventory.db";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the store file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Store file name, or an absolute path to the store file
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,

    /// Log every statement (and batch parameters) at debug level
    #[serde(default)]
    pub verbose: bool,

    /// Attempts per statement when the store reports lock contention
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How long a connection waits on a locked store before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Copy the store file aside and back when lock retries are exhausted
    #[serde(default)]
    pub repair_on_lock: bool,

    /// Optional log file (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            verbose: false,
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            repair_on_lock: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Build a configuration pointing at a specific store file
    ///
    /// No config file or environment is consulted. Used by tests and by
    /// callers that already know where the store lives.
    pub fn for_db_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => Self {
                data_dir: parent.to_path_buf(),
                db_file: PathBuf::from(name),
                ..Self::default()
            },
            _ => Self {
                data_dir: PathBuf::from("."),
                db_file: path,
                ..Self::default()
            },
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BANDROOM_DATA_DIR, BANDROOM_DB_FILE, ...)
    /// 2. Config file (~/.config/bandroom/config.toml or BANDROOM_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit config file path
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DB_FILE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.db_file = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var(format!("{}_VERBOSE", ENV_PREFIX)) {
            self.verbose = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // Unparseable values are ignored rather than clobbering the file value
        if let Ok(val) = std::env::var(format!("{}_MAX_ATTEMPTS", ENV_PREFIX)) {
            if let Ok(n) = val.parse() {
                self.max_attempts = n;
            }
        }
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BANDROOM_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bandroom")
            .join("config.toml")
    }

    /// Get the path to the store file
    ///
    /// An absolute `db_file` is used as-is; a relative one lives in `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        if self.db_file.is_absolute() {
            self.db_file.clone()
        } else {
            self.data_dir.join(&self.db_file)
        }
    }

    /// Retry settings for the statement executor
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bandroom")
}

fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "BANDROOM_DATA_DIR",
        "BANDROOM_DB_FILE",
        "BANDROOM_VERBOSE",
        "BANDROOM_MAX_ATTEMPTS",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.verbose);
        assert!(!config.repair_on_lock);
        assert_eq!(config.max_attempts, 3);
        assert!(config.data_dir.ends_with("bandroom"));
        assert!(config.db_path().ends_with("inventory.db"));
    }

    #[test]
    fn test_db_path_absolute_file_wins() {
        let mut config = Config::default();
        config.db_file = PathBuf::from("/srv/school/band.db");
        assert_eq!(config.db_path(), PathBuf::from("/srv/school/band.db"));
    }

    #[test]
    fn test_for_db_path() {
        let config = Config::for_db_path("/tmp/bandroom/test_basic.db");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bandroom"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/bandroom/test_basic.db"));
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let mut config = Config::default();
        config.max_attempts = 0;
        config.retry_backoff_ms = 25;

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::from_millis(25));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("BANDROOM_DATA_DIR", "/tmp/bandroom-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/bandroom-test"));
    }

    #[test]
    fn test_env_override_verbose() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(!config.verbose);

        env::set_var("BANDROOM_VERBOSE", "true");
        config.apply_env_overrides();
        assert!(config.verbose);

        env::set_var("BANDROOM_VERBOSE", "1");
        config.verbose = false;
        config.apply_env_overrides();
        assert!(config.verbose);

        env::set_var("BANDROOM_VERBOSE", "false");
        config.apply_env_overrides();
        assert!(!config.verbose);
    }

    #[test]
    fn test_env_override_max_attempts_ignores_garbage() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("BANDROOM_MAX_ATTEMPTS", "7");
        config.apply_env_overrides();
        assert_eq!(config.max_attempts, 7);

        env::set_var("BANDROOM_MAX_ATTEMPTS", "lots");
        config.apply_env_overrides();
        assert_eq!(config.max_attempts, 7);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            db_file = "school.db"
            verbose = true
            repair_on_lock = true
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/custom/data/school.db"));
        assert!(config.verbose);
        assert!(config.repair_on_lock);
        assert_eq!(config.retry_backoff_ms, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::for_db_path(dir.path().join("band.db"));
        config.max_attempts = 5;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.db_path(), config.db_path());
        assert_eq!(loaded.max_attempts, 5);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(!config.verbose);
        assert_eq!(config.max_attempts, 3);
    }
}
