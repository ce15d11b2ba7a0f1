pub mod corpus;
pub mod error;
pub mod focus;
pub mod progress;
pub mod replay;
pub mod rotation;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod tilt;
pub mod timer;
pub mod tutorial;
pub mod utils;

pub use corpus::{Corpus, JsonCorpus};
pub use error::{ConfigError, EngineError, EngineResult};
pub use focus::{
    FocusWindowCalculator, FocusWindowProfile, MonospaceMetrics, ScrollTrack, TextMeasure,
};
pub use progress::{ProgressLogger, ProgressSample, SessionExport, SessionLog};
pub use replay::{load_trace, parse_trace, replay_session, ReplayOptions, TraceEvent};
pub use rotation::{PassageCategory, PassageId, TextRotationEngine, Variant};
pub use sensing::{SamplingStatus, ScriptedSensor, SensorSample, SensorSource};
pub use session::{
    AdvanceResult, EngineEvent, PassageView, ProgressSnapshot, SampleOutcome, ScrollEngine,
    SessionController,
};
pub use settings::{FontSpec, RunConfig};
pub use tilt::{AdvanceOutcome, MapperTuning, MappingMode, ScrollState, TiltMapper};
pub use timer::Stopwatch;
pub use tutorial::{tutorial_engine, TutorialAction, TutorialFlow, TutorialOutcome, TutorialStep};
pub use utils::init_logging;
