//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default video output settings.
    pub video: VideoDefaults,

    /// Shared-memory channel settings.
    pub ipc: IpcDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default video parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDefaults {
    /// Default output width.
    pub width: u32,

    /// Default output height.
    pub height: u32,

    /// Default compositing/recording rate.
    pub fps: u32,
}

/// Shared-memory channel parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcDefaults {
    /// Prefix prepended to channel names to keep them per-application.
    pub channel_prefix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "patchbay=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video: VideoDefaults::default(),
            ipc: IpcDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

impl Default for IpcDefaults {
    fn default() -> Self {
        Self {
            channel_prefix: "patchbay".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("patchbay").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.video.width, config.video.width);
        assert_eq!(parsed.ipc.channel_prefix, config.ipc.channel_prefix);
        assert_eq!(parsed.logging.level, config.logging.level);
    }
}
