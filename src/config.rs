//! Engine Configuration
//!
//! Loaded from a JSON file; every key is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::composite::MAX_CANVAS_PIXELS;
use crate::layer::ColorMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Reserved name of the solid-fill layer carrying the document color.
    #[serde(default = "default_color_layer_name")]
    pub color_layer_name: String,
    #[serde(default)]
    pub canvas: CanvasRule,
    #[serde(default)]
    pub color_modes: ColorModeRule,
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool { true }
fn default_color_layer_name() -> String { "@color".to_string() }
fn default_color_modes() -> Vec<ColorMode> { vec![ColorMode::Rgb] }
fn default_log_level() -> String { "info".to_string() }
fn default_max_pixels() -> u64 { MAX_CANVAS_PIXELS }

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

/// Restricts canvas dimensions. The allowed-size list is disabled by default;
/// zero-sized canvases and canvases above `max_pixels` are always rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_sizes: Vec<[u32; 2]>,
    /// Capped at the engine's own allocation limit.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for CanvasRule {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_sizes: vec![],
            max_pixels: default_max_pixels(),
        }
    }
}

impl CanvasRule {
    pub fn pixel_limit(&self) -> u64 {
        self.max_pixels.min(MAX_CANVAS_PIXELS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorModeRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_color_modes")]
    pub allowed: Vec<ColorMode>,
}

impl Default for ColorModeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed: default_color_modes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "layerflat_core=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output structured JSON logs.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            color_layer_name: default_color_layer_name(),
            canvas: CanvasRule::default(),
            color_modes: ColorModeRule::default(),
            failure_mode: FailureMode::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.color_layer_name, "@color");
        assert!(!config.canvas.enabled);
        assert_eq!(config.canvas.max_pixels, MAX_CANVAS_PIXELS);
        assert!(config.color_modes.enabled);
        assert_eq!(config.color_modes.allowed, vec![ColorMode::Rgb]);
        assert_eq!(config.failure_mode, FailureMode::Block);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_banner_sizes_config() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"canvas": {"enabled": true, "allowedSizes": [[1170, 363], [570, 363]]}, "failureMode": "warn"}"#,
        )
        .unwrap();
        assert_eq!(config.canvas.allowed_sizes, vec![[1170, 363], [570, 363]]);
        assert_eq!(config.failure_mode, FailureMode::Warn);
        assert_eq!(config.canvas.max_pixels, MAX_CANVAS_PIXELS);
    }

    #[test]
    fn test_max_pixels_capped_at_engine_limit() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"canvas": {"maxPixels": 18446744073709551615}}"#).unwrap();
        assert_eq!(config.canvas.pixel_limit(), MAX_CANVAS_PIXELS);

        let config: EngineConfig = serde_json::from_str(r#"{"canvas": {"maxPixels": 1000}}"#).unwrap();
        assert_eq!(config.canvas.pixel_limit(), 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layerflat.json");
        fs::write(&path, r#"{"colorLayerName": "META", "logging": {"json": true}}"#).unwrap();
        let config = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.color_layer_name, "META");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }
}
