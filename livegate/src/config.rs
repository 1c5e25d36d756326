//! YAML configuration.
//!
//! Every field is optional; an empty file is the default configuration.
//!
//! ```yaml
//! tolerance: 0.001
//! max_micro_rounds: 10000
//! markers:
//!   role_attr: data-role
//!   cell_role: cell
//!   behavior_attr: data-behavior
//!   pin_attrs: [data-pin, "inkscape:label"]
//!   name_attrs: [data-name, "inkscape:label"]
//! ```
//!
//! A per-user file is read from `~/.config/livegate/config.yaml` when the
//! CLI is not given `--config`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::POINT_TOLERANCE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f64),
    #[error("max_micro_rounds must be at least 1")]
    InvalidRoundLimit,
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGateConfig {
    /// L1 distance below which two wire vertices are the same location.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Callbacks one timestep may run before the simulator gives up.
    /// Counted per callback, not per ready/inactive round.
    #[serde(default = "default_max_micro_rounds")]
    pub max_micro_rounds: usize,
    #[serde(default)]
    pub markers: MarkerConfig,
}

/// Attribute names used to recognise cells and pins in the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_role_attr")]
    pub role_attr: String,
    #[serde(default = "default_cell_role")]
    pub cell_role: String,
    #[serde(default = "default_behavior_attr")]
    pub behavior_attr: String,
    /// Tried in order; the first present attribute labels the pin.
    #[serde(default = "default_pin_attrs")]
    pub pin_attrs: Vec<String>,
    #[serde(default = "default_name_attrs")]
    pub name_attrs: Vec<String>,
}

fn default_tolerance() -> f64 { POINT_TOLERANCE }
fn default_max_micro_rounds() -> usize { 10_000 }
fn default_role_attr() -> String { "data-role".to_string() }
fn default_cell_role() -> String { "cell".to_string() }
fn default_behavior_attr() -> String { "data-behavior".to_string() }
fn default_pin_attrs() -> Vec<String> { vec!["data-pin".to_string(), "inkscape:label".to_string()] }
fn default_name_attrs() -> Vec<String> { vec!["data-name".to_string(), "inkscape:label".to_string()] }

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            role_attr: default_role_attr(),
            cell_role: default_cell_role(),
            behavior_attr: default_behavior_attr(),
            pin_attrs: default_pin_attrs(),
            name_attrs: default_name_attrs(),
        }
    }
}

impl Default for LiveGateConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_micro_rounds: default_max_micro_rounds(),
            markers: MarkerConfig::default(),
        }
    }
}

impl LiveGateConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // serde_yaml reads an empty document as null, not as an empty map.
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        if !(config.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(config.tolerance));
        }
        if config.max_micro_rounds == 0 {
            return Err(ConfigError::InvalidRoundLimit);
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Return the LiveGate config directory: `~/.config/livegate/`.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("livegate"))
}

/// Load `~/.config/livegate/config.yaml`.
///
/// A missing file is not an error; most users won't have one.
pub fn load_user_config() -> Result<Option<LiveGateConfig>, ConfigError> {
    let Some(dir) = config_dir() else {
        return Ok(None);
    };
    let path = dir.join("config.yaml");
    if !path.exists() {
        return Ok(None);
    }
    LiveGateConfig::load(path).map(Some)
}
