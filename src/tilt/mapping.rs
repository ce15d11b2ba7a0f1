use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Deltas smaller than this are treated as sensor noise in `Linear` mode.
pub const LINEAR_DEAD_ZONE: f64 = 2.5e-4;

/// Speed cap for the smoothed strategies, before normalizing by passage length.
const MAX_SPEED_PER_CHAR: f64 = 0.5;

/// Gain applied to the tilt in `Cubic` mode, before normalizing by passage length.
const CUBIC_GAIN: f64 = 10.0;

/// Divisor used by the unnormalized `Impatient` mode.
const IMPATIENT_DIVISOR: f64 = 10.0;

/// How a tilt reading turns into a progress delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MappingMode {
    /// `delta = a / 10`, no normalization. Developer mode.
    Impatient,
    /// Speed proportional to tilt, with a dead zone.
    Linear,
    /// Tilt accelerates a remembered velocity; holding level keeps a constant speed.
    ConstantAccel,
    /// Speed proportional to the cube of the tilt.
    Cubic,
}

impl MappingMode {
    /// Numeric codes used by the experiment's remote configuration (`tiltMap`).
    pub fn from_code(code: i64) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(MappingMode::Impatient),
            1 => Ok(MappingMode::Linear),
            2 => Ok(MappingMode::ConstantAccel),
            3 => Ok(MappingMode::Cubic),
            other => Err(ConfigError::UnknownMappingMode(other.to_string())),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            MappingMode::Impatient => 0,
            MappingMode::Linear => 1,
            MappingMode::ConstantAccel => 2,
            MappingMode::Cubic => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMode::Impatient => "impatient",
            MappingMode::Linear => "linear",
            MappingMode::ConstantAccel => "constantAccel",
            MappingMode::Cubic => "cubic",
        }
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::from_code(code);
        }
        match trimmed.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "impatient" => Ok(MappingMode::Impatient),
            "linear" => Ok(MappingMode::Linear),
            "constantaccel" | "constantacceleration" => Ok(MappingMode::ConstantAccel),
            "cubic" => Ok(MappingMode::Cubic),
            _ => Err(ConfigError::UnknownMappingMode(value.to_string())),
        }
    }
}

/// Boundary behaviour of the `ConstantAccel` strategy.
///
/// At the start of the passage, or at/after `reset_threshold`, the remembered velocity is
/// discarded and the delta restarts from `reset_gain / characters * a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperTuning {
    pub reset_gain: f64,
    pub reset_threshold: f64,
}

impl MapperTuning {
    /// Reading screens: reset only exactly at 0 or 1.
    pub const fn standard() -> Self {
        Self {
            reset_gain: 0.01,
            reset_threshold: 1.0,
        }
    }

    /// Tutorial: a stronger restart as soon as the reader gets within 1% of the end.
    pub const fn tutorial() -> Self {
        Self {
            reset_gain: 0.03,
            reset_threshold: 0.99,
        }
    }
}

impl Default for MapperTuning {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of mapping one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedDelta {
    pub delta: f64,
    pub velocity_memory: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TiltMapper {
    mode: MappingMode,
    tuning: MapperTuning,
}

impl TiltMapper {
    pub fn new(mode: MappingMode) -> Self {
        Self {
            mode,
            tuning: MapperTuning::standard(),
        }
    }

    pub fn with_tuning(mode: MappingMode, tuning: MapperTuning) -> Self {
        Self { mode, tuning }
    }

    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    /// `accel` must already carry the control-inversion sign. `current_offset` is the
    /// progress before this sample is applied.
    pub fn map(
        &self,
        accel: f64,
        characters: usize,
        prior_velocity: f64,
        current_offset: f64,
    ) -> MappedDelta {
        let characters = characters as f64;
        match self.mode {
            MappingMode::Impatient => MappedDelta {
                delta: accel / IMPATIENT_DIVISOR,
                velocity_memory: prior_velocity,
            },
            MappingMode::Linear => {
                let mut delta = accel / characters;
                if delta.abs() < LINEAR_DEAD_ZONE {
                    delta = 0.0;
                }
                MappedDelta {
                    delta,
                    velocity_memory: prior_velocity,
                }
            }
            MappingMode::ConstantAccel => {
                let mut delta =
                    clamp_speed(prior_velocity + 0.01 / characters * accel, characters);
                if current_offset == 0.0 || current_offset >= self.tuning.reset_threshold {
                    delta = self.tuning.reset_gain / characters * accel;
                }
                MappedDelta {
                    delta,
                    velocity_memory: delta,
                }
            }
            MappingMode::Cubic => {
                let delta = clamp_speed(CUBIC_GAIN / characters * accel.powi(3), characters);
                MappedDelta {
                    delta,
                    velocity_memory: delta,
                }
            }
        }
    }
}

/// Free-function form of [`TiltMapper::map`] with standard tuning.
pub fn map_tilt(
    mode: MappingMode,
    accel: f64,
    characters: usize,
    prior_velocity: f64,
    current_offset: f64,
) -> MappedDelta {
    TiltMapper::new(mode).map(accel, characters, prior_velocity, current_offset)
}

fn clamp_speed(delta: f64, characters: f64) -> f64 {
    let max = MAX_SPEED_PER_CHAR / characters;
    if delta.abs() > max {
        max.copysign(delta)
    } else {
        delta
    }
}
