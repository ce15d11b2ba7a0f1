use std::path::PathBuf;

use thiserror::Error;

use crate::rotation::PassageId;

/// Problems with the run configuration, all detected before a session is constructed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read run configuration from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown mapping mode '{0}' (expected 0-3 or impatient/linear/constantAccel/cubic)")]
    UnknownMappingMode(String),

    #[error("totalIterations must be positive, got {0}")]
    NonPositiveIterations(i64),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Engine failures. Everything except `NotStarted`/`AlreadyStarted`/`SessionFinished`
/// means the run cannot continue.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("corpus has no text for passage {0}")]
    MissingPassage(PassageId),

    #[error("passage {0} has empty text")]
    EmptyPassage(PassageId),

    #[error("failed to load corpus from {}: {reason}", path.display())]
    CorpusLoad { path: PathBuf, reason: String },

    #[error("session has not begun")]
    NotStarted,

    #[error("session already begun")]
    AlreadyStarted,

    #[error("session already finished")]
    SessionFinished,
}

pub type EngineResult<T> = Result<T, EngineError>;
