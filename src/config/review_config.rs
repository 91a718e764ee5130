//! Review Configuration - operator-tunable knobs for a review pass
//!
//! Every struct implements `Default` with the values the operations team
//! runs with, so a missing config file changes nothing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::classifier::MarkerSet;
use crate::duration::BOGOTA_UTC_OFFSET_HOURS;
use crate::input::InputOptions;
use crate::reconcile::ReconcileOptions;
use crate::report::OutputFormat;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "DESVIO_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "desvio_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the detour review.
///
/// Load with `ReviewConfig::load()` which searches:
/// 1. `$DESVIO_CONFIG` env var
/// 2. `./desvio_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Timezone used to capture the reference "now"
    #[serde(default)]
    pub clock: ClockConfig,

    /// Action-log reader behaviour
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl ReviewConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DESVIO_CONFIG` environment variable
    /// 2. `./desvio_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded review config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./desvio_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded review config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; out-of-range values are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            markers: self.classifier.markers,
            retain_uncoded_rows: self.input.retain_uncoded_rows,
        }
    }

    pub fn input_options(&self) -> InputOptions {
        InputOptions {
            action_filter: self.input.action_filter.clone(),
            delimiter: self.input.delimiter,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// `"exact"` or `"with_uppercase"`
    #[serde(default)]
    pub markers: MarkerSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Civil-time offset from UTC, in hours (America/Bogota = -5)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_utc_offset_hours() -> i32 {
    BOGOTA_UTC_OFFSET_HOURS
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Action description rows must match; empty keeps every row
    #[serde(default = "default_action_filter")]
    pub action_filter: String,

    /// Keep rows without a detour code in the output
    #[serde(default = "default_true")]
    pub retain_uncoded_rows: bool,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_action_filter() -> String {
    "Desvio".to_string()
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            action_filter: default_action_filter(),
            retain_uncoded_rows: true,
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file name prefix; the reference date and extension are appended
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_file_prefix() -> String {
    "Revision de desvios".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            file_prefix: default_file_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_operations() {
        let config = ReviewConfig::default();
        assert_eq!(config.classifier.markers, MarkerSet::WithUppercase);
        assert_eq!(config.clock.utc_offset_hours, -5);
        assert_eq!(config.input.action_filter, "Desvio");
        assert!(config.input.retain_uncoded_rows);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ReviewConfig::from_toml_str("[classifier]\nmarkers = \"exact\"\n").unwrap();
        assert_eq!(config.classifier.markers, MarkerSet::Exact);
        assert_eq!(config.clock.utc_offset_hours, -5);
        assert_eq!(config.output.file_prefix, "Revision de desvios");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ReviewConfig::default();
        let text = config.to_toml().unwrap();
        let back = ReviewConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_load_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[clock\nutc_offset_hours = ").unwrap();
        let err = ReviewConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
    }

    #[test]
    fn test_options_derived_from_config() {
        let mut config = ReviewConfig::default();
        config.input.retain_uncoded_rows = false;
        config.input.delimiter = ';';
        assert!(!config.reconcile_options().retain_uncoded_rows);
        assert_eq!(config.input_options().delimiter, ';');
    }
}
