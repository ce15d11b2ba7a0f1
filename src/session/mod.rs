pub mod controller;
pub mod engine;

pub use controller::{EngineCommand, EngineEvent, ProgressSnapshot, SessionController};
pub use engine::{AdvanceResult, PassageView, SampleOutcome, ScrollEngine};
