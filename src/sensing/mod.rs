pub mod controller;
pub mod loop_worker;
pub mod source;

pub use controller::{SamplingStatus, SensingController};
pub use source::{ScriptedSensor, SensorSample, SensorSource};
