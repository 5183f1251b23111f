//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/readlater/config.toml)
//! 3. Environment variables (READLATER_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::library::DuplicatePolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "READLATER";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the store file and logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// What to do when a saved URL is added again
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Delay before a search keystroke recomputes the view
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// How often a live surface checks the store file for outside writes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Log file (defaults to `<data_dir>/debug.log`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            duplicate_policy: DuplicatePolicy::default(),
            search_debounce_ms: default_search_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (READLATER_DATA_DIR, READLATER_DUPLICATE_POLICY, ...)
    /// 2. Config file (~/.config/readlater/config.toml or READLATER_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` when given, otherwise from the default location
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
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
        config.ensure_data_dir()?;
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
    ///
    /// Unparseable values are ignored with a warning.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DUPLICATE_POLICY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.duplicate_policy = policy,
                Err(e) => tracing::warn!("Ignoring {}_DUPLICATE_POLICY: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_SEARCH_DEBOUNCE_MS", ENV_PREFIX)) {
            match val.parse() {
                Ok(ms) => self.search_debounce_ms = ms,
                Err(e) => tracing::warn!("Ignoring {}_SEARCH_DEBOUNCE_MS: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_POLL_INTERVAL_MS", ENV_PREFIX)) {
            match val.parse() {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(e) => tracing::warn!("Ignoring {}_POLL_INTERVAL_MS: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default location
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
    /// Can be overridden with READLATER_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readlater")
            .join("config.toml")
    }

    /// Get the path to the store file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    /// Get the path log output goes to
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would make tokio::time::interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readlater")
}

fn default_search_debounce_ms() -> u64 {
    200
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

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
        "READLATER_DATA_DIR",
        "READLATER_DUPLICATE_POLICY",
        "READLATER_SEARCH_DEBOUNCE_MS",
        "READLATER_POLL_INTERVAL_MS",
        "READLATER_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::MoveSilently);
        assert_eq!(config.search_debounce_ms, 200);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("readlater"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/readlater"),
            ..Config::default()
        };

        assert_eq!(config.store_path(), PathBuf::from("/data/readlater/storage.json"));
        assert_eq!(config.log_path(), PathBuf::from("/data/readlater/debug.log"));

        let config = Config {
            log_file: Some(PathBuf::from("/var/log/readlater.log")),
            ..config
        };
        assert_eq!(config.log_path(), PathBuf::from("/var/log/readlater.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("READLATER_DATA_DIR", "/tmp/readlater-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/readlater-test"));
    }

    #[test]
    fn test_env_override_duplicate_policy() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("READLATER_DUPLICATE_POLICY", "confirm");
        config.apply_env_overrides();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Confirm);

        // Invalid values leave the current setting alone
        env::set_var("READLATER_DUPLICATE_POLICY", "sometimes");
        config.apply_env_overrides();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Confirm);
    }

    #[test]
    fn test_env_override_timings() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("READLATER_SEARCH_DEBOUNCE_MS", "50");
        env::set_var("READLATER_POLL_INTERVAL_MS", "not-a-number");
        config.apply_env_overrides();

        assert_eq!(config.search_debounce(), Duration::from_millis(50));
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("READLATER_LOG_FILE", "/tmp/readlater.log");
        config.apply_env_overrides();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/readlater.log")));

        // Empty string clears it
        env::set_var("READLATER_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/readlater"),
            duplicate_policy: DuplicatePolicy::Confirm,
            search_debounce_ms: 150,
            poll_interval_ms: 500,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("duplicate_policy = \"confirm\""));
        assert!(!toml_str.contains("log_file"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            duplicate_policy = "move_silently"
            search_debounce_ms = 300
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::MoveSilently);
        assert_eq!(config.search_debounce_ms, 300);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("READLATER_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert_eq!(config.search_debounce_ms, 200);
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            duplicate_policy: DuplicatePolicy::Confirm,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }
}
