//! Deterministic offline replay of a recorded session trace.
//!
//! A trace is JSON lines, one event per line:
//!
//! ```text
//! {"event":"sample","timestamp":0.00,"verticalAcceleration":0.12}
//! {"event":"advance","timestamp":4.31}
//! ```
//!
//! Elapsed times in the progress log are measured on the trace's own clock from the moment
//! each passage opened, so a replay reproduces the same export for the same trace and seed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::progress::SessionExport;
use crate::sensing::SensorSample;
use crate::session::{AdvanceResult, ScrollEngine};
use crate::timer::round_secs;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEvent {
    #[serde(rename_all = "camelCase")]
    Sample {
        timestamp: f64,
        vertical_acceleration: f64,
    },
    Advance {
        timestamp: f64,
    },
}

impl TraceEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            TraceEvent::Sample { timestamp, .. } | TraceEvent::Advance { timestamp } => *timestamp,
        }
    }
}

pub fn parse_trace(contents: &str) -> Result<Vec<TraceEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("trace line {} is malformed", idx + 1))
        })
        .collect()
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&contents)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Advance as soon as a passage is completed instead of waiting for an advance event.
    pub auto_advance: bool,
}

/// Runs `events` through `engine` from `begin` to the session export. A trace that ends
/// before the final passage is advanced finishes the session early.
pub fn replay_session(
    engine: &mut ScrollEngine,
    events: &[TraceEvent],
    options: ReplayOptions,
) -> Result<SessionExport> {
    engine.begin().context("failed to open the first passage")?;

    let mut passage_origin: Option<f64> = None;
    let mut applied: usize = 0;

    for event in events {
        match *event {
            TraceEvent::Sample {
                timestamp,
                vertical_acceleration,
            } => {
                let origin = *passage_origin.get_or_insert(timestamp);
                let elapsed = round_secs((timestamp - origin).max(0.0));
                let sample = SensorSample::new(timestamp, vertical_acceleration);

                let Some(outcome) = engine.on_sample(sample, elapsed) else {
                    continue;
                };
                applied += 1;

                if options.auto_advance && outcome.completed_now {
                    if let Some(export) = advance(engine)? {
                        return Ok(export);
                    }
                    passage_origin = Some(timestamp);
                }
            }
            TraceEvent::Advance { timestamp } => {
                if let Some(export) = advance(engine)? {
                    log_info!("replay finished after {} applied samples", applied);
                    return Ok(export);
                }
                passage_origin = Some(timestamp);
            }
        }
    }

    log_warn!("trace ended before the final passage, finishing early");
    engine.finish().context("failed to finish the session")
}

fn advance(engine: &mut ScrollEngine) -> Result<Option<SessionExport>> {
    match engine.advance() {
        Ok(AdvanceResult::NextPassage(_)) => Ok(None),
        Ok(AdvanceResult::Finished(export)) => Ok(Some(export)),
        Err(err @ EngineError::MissingPassage(_)) | Err(err @ EngineError::EmptyPassage(_)) => {
            Err(err).context("corpus does not cover the passage schedule")
        }
        Err(err) => Err(err.into()),
    }
}
