use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tilt::MappingMode;
use crate::utils::debug_env_enabled;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Courier".into(),
            size: 100.0,
        }
    }
}

/// Mapping mode as written in a config file: either the numeric `tiltMap` code or a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum MappingModeRepr {
    Code(i64),
    Name(String),
}

impl Default for MappingModeRepr {
    fn default() -> Self {
        MappingModeRepr::Code(MappingMode::Linear.code())
    }
}

/// On-disk shape of the run configuration. Everything is optional and falls back to the
/// experiment's published defaults; validation happens in [`RunConfig::from_raw`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRunConfig {
    tilt_map: MappingModeRepr,
    font: FontSpec,
    text_window: f64,
    blur_amount: f64,
    total_iterations: i64,
    invert_control: bool,
    sample_interval_ms: i64,
    texts_per_category: i64,
    viewport_width: f64,
    finished_tutorial: bool,
    debug_mode: bool,
}

impl Default for RawRunConfig {
    fn default() -> Self {
        Self {
            tilt_map: MappingModeRepr::default(),
            font: FontSpec::default(),
            text_window: 5.0,
            blur_amount: 10.0,
            total_iterations: 1,
            invert_control: false,
            sample_interval_ms: 20,
            texts_per_category: 4,
            viewport_width: 1024.0,
            finished_tutorial: false,
            debug_mode: false,
        }
    }
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mapping_mode: MappingMode,
    pub font: FontSpec,
    /// Number of characters meant to stay sharp in the focus window.
    pub text_window: f64,
    /// Blur radius in pixels; zero or less disables the blur mask.
    pub blur_strength: f64,
    /// Passages served after acclimation before the session finishes.
    pub total_iterations: u32,
    /// Flips the sign of the vertical acceleration before mapping.
    pub invert_control: bool,
    pub sample_interval: Duration,
    pub texts_per_category: u32,
    pub viewport_width: f64,
    /// The tutorial has been completed, so the acclimation passage is skipped.
    pub skip_acclimation: bool,
    pub debug_mode: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        // The defaults are valid by construction.
        Self {
            mapping_mode: MappingMode::Linear,
            font: FontSpec::default(),
            text_window: 5.0,
            blur_strength: 10.0,
            total_iterations: 1,
            invert_control: false,
            sample_interval: Duration::from_millis(20),
            texts_per_category: 4,
            viewport_width: 1024.0,
            skip_acclimation: false,
            debug_mode: false,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawRunConfig = serde_json::from_str(contents)?;
        let mut config = Self::from_raw(raw)?;
        config.debug_mode |= debug_env_enabled();
        Ok(config)
    }

    fn from_raw(raw: RawRunConfig) -> Result<Self, ConfigError> {
        let mapping_mode = match raw.tilt_map {
            MappingModeRepr::Code(code) => MappingMode::from_code(code)?,
            MappingModeRepr::Name(name) => name.parse()?,
        };

        if raw.total_iterations <= 0 {
            return Err(ConfigError::NonPositiveIterations(raw.total_iterations));
        }
        let total_iterations = u32::try_from(raw.total_iterations).map_err(|_| {
            ConfigError::InvalidValue {
                field: "totalIterations",
                reason: format!("{} is too large", raw.total_iterations),
            }
        })?;

        let sample_interval_ms = positive_int("sampleIntervalMs", raw.sample_interval_ms)?;
        let texts_per_category = positive_int("textsPerCategory", raw.texts_per_category)?;
        let texts_per_category =
            u32::try_from(texts_per_category).map_err(|_| ConfigError::InvalidValue {
                field: "textsPerCategory",
                reason: format!("{texts_per_category} is too large"),
            })?;

        positive_real("font.size", raw.font.size)?;
        positive_real("textWindow", raw.text_window)?;
        positive_real("viewportWidth", raw.viewport_width)?;
        if !raw.blur_amount.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "blurAmount",
                reason: "must be a finite number".into(),
            });
        }
        if raw.font.family.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "font.family",
                reason: "must not be empty".into(),
            });
        }

        Ok(Self {
            mapping_mode,
            font: raw.font,
            text_window: raw.text_window,
            blur_strength: raw.blur_amount,
            total_iterations,
            invert_control: raw.invert_control,
            sample_interval: Duration::from_millis(sample_interval_ms),
            texts_per_category,
            viewport_width: raw.viewport_width,
            skip_acclimation: raw.finished_tutorial,
            debug_mode: raw.debug_mode,
        })
    }
}

fn positive_int(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(value as u64)
}

fn positive_real(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a positive number, got {value}"),
        });
    }
    Ok(())
}
