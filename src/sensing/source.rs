use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One accelerometer reading. `timestamp` is in seconds on the sensor's own clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    pub timestamp: f64,
    /// The device's y acceleration with its sign flipped (−y, in g). Tilting the top edge
    /// away from the reader is positive and scrolls forward while control is not
    /// inverted. Raw device readings go through [`SensorSample::from_device_y`].
    pub vertical_acceleration: f64,
}

impl SensorSample {
    pub fn new(timestamp: f64, vertical_acceleration: f64) -> Self {
        Self {
            timestamp,
            vertical_acceleration,
        }
    }

    /// Builds a sample from the raw device y axis.
    pub fn from_device_y(timestamp: f64, device_y: f64) -> Self {
        Self::new(timestamp, -device_y)
    }
}

/// Polled accelerometer. Platforms that push readings instead should feed
/// `SessionController::push_sample` directly.
pub trait SensorSource: Send + 'static {
    fn is_available(&self) -> bool;

    /// Latest reading, or `None` when nothing new arrived since the last poll.
    fn read(&mut self) -> Option<SensorSample>;

    /// True when the source will never produce another reading.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Replays a recorded trace, one sample per poll.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    samples: VecDeque<SensorSample>,
    available: bool,
}

impl ScriptedSensor {
    pub fn new(samples: impl IntoIterator<Item = SensorSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            available: true,
        }
    }

    /// A device without an accelerometer.
    pub fn unavailable() -> Self {
        Self {
            samples: VecDeque::new(),
            available: false,
        }
    }

    /// Evenly spaced readings starting at t = 0.
    pub fn from_accelerations(interval_secs: f64, accelerations: &[f64]) -> Self {
        Self::new(
            accelerations
                .iter()
                .enumerate()
                .map(|(idx, accel)| SensorSample::new(idx as f64 * interval_secs, *accel)),
        )
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SensorSource for ScriptedSensor {
    fn is_available(&self) -> bool {
        self.available
    }

    fn read(&mut self) -> Option<SensorSample> {
        self.samples.pop_front()
    }

    fn is_exhausted(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_sensor_replays_in_order() {
        let mut sensor = ScriptedSensor::from_accelerations(0.02, &[0.1, -0.2]);
        assert!(sensor.is_available());
        assert_eq!(sensor.read(), Some(SensorSample::new(0.0, 0.1)));
        assert_eq!(sensor.read(), Some(SensorSample::new(0.02, -0.2)));
        assert!(sensor.is_exhausted());
        assert_eq!(sensor.read(), None);
    }

    #[test]
    fn test_sample_json_is_camel_case() {
        let sample: SensorSample =
            serde_json::from_str(r#"{"timestamp": 1.5, "verticalAcceleration": -0.25}"#).unwrap();
        assert_eq!(sample, SensorSample::new(1.5, -0.25));
    }

    #[test]
    fn test_device_y_is_negated() {
        let sample = SensorSample::from_device_y(0.5, 0.3);
        assert_eq!(sample.vertical_acceleration, -0.3);
        assert_eq!(SensorSample::from_device_y(0.5, -0.3), SensorSample::new(0.5, 0.3));
    }
}
