pub mod state;
pub use state::{round_secs, Stopwatch};
