pub mod logging;

pub use logging::{debug_env_enabled, init_logging};
