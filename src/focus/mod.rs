pub mod metrics;
pub mod window;

pub use metrics::{MonospaceMetrics, TextMeasure};
pub use window::{FocusWindowCalculator, FocusWindowProfile, GradientStop, MaskZone, ScrollTrack};
