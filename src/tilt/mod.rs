pub mod mapping;
pub mod scroll;

pub use mapping::{map_tilt, MappedDelta, MapperTuning, MappingMode, TiltMapper};
pub use scroll::{AdvanceOutcome, ScrollState};
