use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.json";
const APP_CONFIG_DIR: &str = "tagfleet";
const SERVER_ENV: &str = "TAGFLEET_SERVER";
const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
const DEFAULT_LOG_RETENTION: usize = 14;
const DEFAULT_REFRESH_DELAY_MS: u64 = 2_000;

/// Local settings of the desktop client. The repository list itself is served by
/// the tag server (`/api/config`), never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    server_url: String,
    log_retention_files: usize,
    refresh_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            log_retention_files: DEFAULT_LOG_RETENTION,
            refresh_delay_ms: DEFAULT_REFRESH_DELAY_MS,
        }
    }
}

impl AppConfig {
    /// Reads the config file, writing the defaults out on first start so they can be edited.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        let config = Self::default();
        if let Err(err) = config.save_to(&path) {
            warn!(target: "tagfleet::config", error = %err, path = %path.display(), "could not write default config");
        }
        config
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(contents) = fs::read_to_string(path) {
            match serde_json::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(err) => {
                    warn!(target: "tagfleet::config", error = %err, path = %path.display(), "ignoring malformed config file");
                }
            }
        }
        Self::default()
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        fs::write(path, content)
    }

    /// Server base URL; `TAGFLEET_SERVER` wins over the file.
    pub fn server_url(&self) -> String {
        std::env::var(SERVER_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.server_url.clone())
    }

    pub fn log_retention_files(&self) -> usize {
        self.log_retention_files
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

pub fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_CONFIG_DIR)
}

pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_CONFIG_DIR)
}

pub fn logs_directory() -> PathBuf {
    let path = app_data_dir().join("logs");
    let _ = fs::create_dir_all(&path);
    path
}

fn config_path() -> PathBuf {
    app_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = AppConfig::load_from(&temp.path().join("absent.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.refresh_delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"refresh_delay_ms": 500}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.refresh_delay(), Duration::from_millis(500));
        assert_eq!(config.log_retention_files(), DEFAULT_LOG_RETENTION);
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let config = AppConfig {
            server_url: "http://tags.internal:9000".to_string(),
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }
}
