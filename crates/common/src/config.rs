//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClipdeckError, ClipdeckResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preview canvas geometry.
    pub canvas: CanvasConfig,

    /// Texture and sprite pool limits.
    pub pool: PoolConfig,

    /// Performance governor thresholds.
    pub governor: GovernorConfig,

    /// Frame rendering parameters.
    pub render: RenderConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Preview canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

/// Resource pool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of decoded textures retained.
    pub texture_capacity: usize,

    /// Maximum bytes of decoded texture data retained.
    pub texture_byte_budget: usize,

    /// Maximum number of idle sprites kept on the free-list.
    pub sprite_capacity: usize,

    /// Delay before failed assets are eligible for another fetch (ms).
    pub retry_delay_ms: u64,

    /// Share of entries dropped when the entry cap is hit, oldest first.
    pub eviction_fraction: f64,
}

/// Performance governor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Memory usage ratio (used / limit) that raises a warning.
    pub memory_warning_ratio: f64,

    /// Memory usage ratio that is treated as critical.
    pub memory_critical_ratio: f64,

    /// Frame rate below which a warning is raised.
    pub fps_warning: f64,

    /// Frame rate below which the signal is critical.
    pub fps_critical: f64,

    /// Number of mode changes retained for diagnostics.
    pub history_limit: usize,

    /// Whether the governor may switch modes on its own.
    pub auto_optimize: bool,
}

/// Frame rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Length of the text overlay fade-in and fade-out (seconds).
    pub text_fade_secs: f64,

    /// Playback tick rate.
    pub fps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipdeck=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            texture_capacity: 20,
            texture_byte_budget: 512 * 1024 * 1024,
            sprite_capacity: 10,
            retry_delay_ms: 5000,
            eviction_fraction: 0.3,
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            memory_warning_ratio: 0.75,
            memory_critical_ratio: 0.9,
            fps_warning: 24.0,
            fps_critical: 15.0,
            history_limit: 50,
            auto_optimize: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            text_fade_secs: 0.3,
            fps: 30,
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
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> ClipdeckResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClipdeckError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ClipdeckError::Io(e),
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
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

    /// Reject values the pools and governor cannot work with.
    pub fn validate(&self) -> ClipdeckResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ClipdeckError::config("canvas dimensions must be non-zero"));
        }
        if self.pool.texture_capacity == 0 {
            return Err(ClipdeckError::config("pool.texture_capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.pool.eviction_fraction) {
            return Err(ClipdeckError::config(
                "pool.eviction_fraction must be within [0, 1]",
            ));
        }
        if self.governor.memory_warning_ratio > self.governor.memory_critical_ratio {
            return Err(ClipdeckError::config(
                "governor.memory_warning_ratio must not exceed memory_critical_ratio",
            ));
        }
        if self.governor.fps_warning < self.governor.fps_critical {
            return Err(ClipdeckError::config(
                "governor.fps_warning must not be below fps_critical",
            ));
        }
        if self.render.fps == 0 {
            return Err(ClipdeckError::config("render.fps must be non-zero"));
        }
        Ok(())
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
    base.join("clipdeck").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.texture_capacity, 20);
        assert_eq!(config.pool.sprite_capacity, 10);
        assert_eq!(config.pool.retry_delay_ms, 5000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "pool": { "texture_capacity": 4 } }"#).unwrap();
        assert_eq!(config.pool.texture_capacity, 4);
        assert_eq!(config.pool.sprite_capacity, 10);
        assert_eq!(config.canvas.width, 1920);
        assert!((config.render.text_fade_secs - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_memory_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.governor.memory_warning_ratio = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("clipdeck_missing_config.json");
        let _ = std::fs::remove_file(&path);
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ClipdeckError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_from_round_trips_file() {
        let path = std::env::temp_dir().join("clipdeck_test_config.json");
        let mut config = AppConfig::default();
        config.canvas.width = 640;
        config.canvas.height = 360;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.canvas.width, 640);
        std::fs::remove_file(&path).ok();
    }
}
