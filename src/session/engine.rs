//! Synchronous owner of all engine state for one run.
//!
//! Every transition (open passage, apply sample, flush, finish) happens here; the async
//! [`SessionController`](super::SessionController) only serializes calls onto it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::corpus::Corpus;
use crate::error::{EngineError, EngineResult};
use crate::focus::{
    FocusWindowCalculator, FocusWindowProfile, MonospaceMetrics, ScrollTrack, TextMeasure,
};
use crate::progress::{ProgressLogger, SessionExport, SessionLog};
use crate::rotation::{PassageId, TextRotationEngine};
use crate::sensing::SensorSample;
use crate::settings::RunConfig;
use crate::tilt::{AdvanceOutcome, MapperTuning, ScrollState, TiltMapper};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Everything the UI needs to render the current passage.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassageView {
    pub id: PassageId,
    pub text: String,
    pub characters: usize,
    pub focus: FocusWindowProfile,
    pub track: ScrollTrack,
    /// Advancing past this passage finishes the session.
    pub is_final: bool,
}

/// Result of applying one accepted sensor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub passage: PassageId,
    /// Acceleration after the invert-control sign was applied.
    pub acceleration: f64,
    pub delta: f64,
    pub progress: f64,
    pub outcome: AdvanceOutcome,
    /// True only for the sample that first reached the end of the passage.
    pub completed_now: bool,
}

#[derive(Debug, Clone)]
pub enum AdvanceResult {
    NextPassage(PassageView),
    Finished(SessionExport),
}

struct ActivePassage {
    view: PassageView,
    scroll: ScrollState,
    velocity_memory: f64,
    logger: ProgressLogger,
}

enum EnginePhase {
    Idle,
    Reading(ActivePassage),
    Finished,
}

pub struct ScrollEngine {
    config: RunConfig,
    mapper: TiltMapper,
    rotation: TextRotationEngine,
    corpus: Box<dyn Corpus>,
    metrics: Box<dyn TextMeasure>,
    focus: FocusWindowCalculator,
    log: SessionLog,
    phase: EnginePhase,
    /// Non-acclimation passages opened so far.
    served: u32,
    started_at: Option<DateTime<Utc>>,
    last_timestamp: Option<f64>,
}

impl ScrollEngine {
    /// Monospace metrics derived from the configured font.
    pub fn new<R: Rng + ?Sized>(config: RunConfig, corpus: Box<dyn Corpus>, rng: &mut R) -> Self {
        let metrics = Box::new(MonospaceMetrics::from_font(&config.font));
        Self::with_measure(config, corpus, metrics, rng)
    }

    pub fn with_measure<R: Rng + ?Sized>(
        config: RunConfig,
        corpus: Box<dyn Corpus>,
        metrics: Box<dyn TextMeasure>,
        rng: &mut R,
    ) -> Self {
        let rotation = if config.skip_acclimation {
            TextRotationEngine::skipping_acclimation(config.texts_per_category, rng)
        } else {
            TextRotationEngine::new(config.texts_per_category, rng)
        };
        Self::with_rotation(config, corpus, metrics, rotation)
    }

    /// Full control over the passage schedule, mainly for replays with a fixed cursor.
    pub fn with_rotation(
        config: RunConfig,
        corpus: Box<dyn Corpus>,
        metrics: Box<dyn TextMeasure>,
        rotation: TextRotationEngine,
    ) -> Self {
        Self {
            mapper: TiltMapper::new(config.mapping_mode),
            focus: FocusWindowCalculator::new(config.text_window, config.blur_strength),
            config,
            rotation,
            corpus,
            metrics,
            log: SessionLog::new(),
            phase: EnginePhase::Idle,
            served: 0,
            started_at: None,
            last_timestamp: None,
        }
    }

    /// Swaps the mapper's reset tuning, e.g. for the tutorial.
    pub fn with_tuning(mut self, tuning: MapperTuning) -> Self {
        self.mapper = TiltMapper::with_tuning(self.config.mapping_mode, tuning);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.phase, EnginePhase::Idle)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, EnginePhase::Finished)
    }

    pub fn current(&self) -> Option<&PassageView> {
        match &self.phase {
            EnginePhase::Reading(active) => Some(&active.view),
            _ => None,
        }
    }

    pub fn progress(&self) -> f64 {
        match &self.phase {
            EnginePhase::Reading(active) => active.scroll.progress(),
            _ => 0.0,
        }
    }

    pub fn is_passage_completed(&self) -> bool {
        match &self.phase {
            EnginePhase::Reading(active) => active.scroll.is_completed(),
            _ => false,
        }
    }

    /// Samples logged so far for the passage on screen.
    pub fn pending_samples(&self) -> usize {
        match &self.phase {
            EnginePhase::Reading(active) => active.logger.len(),
            _ => 0,
        }
    }

    pub fn invert_control(&self) -> bool {
        self.config.invert_control
    }

    /// The control switch may be flipped while reading; it takes effect on the next sample.
    pub fn set_invert_control(&mut self, invert: bool) {
        if self.config.invert_control != invert {
            log_info!("invert control set to {}", invert);
        }
        self.config.invert_control = invert;
    }

    /// Opens the first passage.
    pub fn begin(&mut self) -> EngineResult<PassageView> {
        match self.phase {
            EnginePhase::Idle => {}
            EnginePhase::Reading(_) => return Err(EngineError::AlreadyStarted),
            EnginePhase::Finished => return Err(EngineError::SessionFinished),
        }

        self.started_at = Some(Utc::now());
        log_info!(
            "session begun: mode={} invert={} iterations={}",
            self.config.mapping_mode,
            self.config.invert_control,
            self.config.total_iterations
        );
        let (rotation, id, text) = self.resolve_next()?;
        Ok(self.open(rotation, id, text))
    }

    /// Maps one reading onto the active passage. Returns `None` when the sample is
    /// dropped: no passage open, out of timestamp order, or not a finite reading.
    pub fn on_sample(&mut self, sample: SensorSample, elapsed_secs: f64) -> Option<SampleOutcome> {
        let EnginePhase::Reading(active) = &mut self.phase else {
            log_debug!("sample at {:.4}s dropped: no passage open", sample.timestamp);
            return None;
        };

        if !sample.vertical_acceleration.is_finite() || !sample.timestamp.is_finite() {
            log_warn!("dropping non-finite sample {:?}", sample);
            return None;
        }
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                log_warn!(
                    "dropping out-of-order sample at {:.4}s (last {:.4}s)",
                    sample.timestamp,
                    last
                );
                return None;
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let acceleration = if self.config.invert_control {
            -sample.vertical_acceleration
        } else {
            sample.vertical_acceleration
        };

        let mapped = self.mapper.map(
            acceleration,
            active.view.characters,
            active.velocity_memory,
            active.scroll.progress(),
        );
        active.velocity_memory = mapped.velocity_memory;

        let outcome = active.scroll.apply(mapped.delta);
        let progress = active.scroll.progress();
        active.logger.record(elapsed_secs, progress, mapped.delta);

        let completed_now = matches!(
            outcome,
            AdvanceOutcome::ReachedUpperBound {
                first_arrival: true
            }
        );
        if completed_now {
            log_info!("passage {} completed at {:.4}s", active.view.id, elapsed_secs);
        }

        if self.config.debug_mode {
            log_debug!(
                "Time: {:.4}  Accel: {:.3}  Progress: {:.0}%",
                elapsed_secs,
                acceleration,
                progress * 100.0
            );
        }

        Some(SampleOutcome {
            passage: active.view.id,
            acceleration,
            delta: mapped.delta,
            progress,
            outcome,
            completed_now,
        })
    }

    /// Resets progress on the open passage without re-arming completion. Logged samples
    /// are kept.
    pub fn rewind(&mut self) -> EngineResult<()> {
        match &mut self.phase {
            EnginePhase::Reading(active) => {
                active.scroll.rewind();
                active.velocity_memory = 0.0;
                Ok(())
            }
            EnginePhase::Idle => Err(EngineError::NotStarted),
            EnginePhase::Finished => Err(EngineError::SessionFinished),
        }
    }

    /// Flushes the open passage and opens the next one, or finishes the session when the
    /// open passage was the final one. A next passage that cannot be resolved leaves the
    /// open passage and its pending samples untouched.
    pub fn advance(&mut self) -> EngineResult<AdvanceResult> {
        let is_final = match &self.phase {
            EnginePhase::Reading(active) => active.view.is_final,
            EnginePhase::Idle => return Err(EngineError::NotStarted),
            EnginePhase::Finished => return Err(EngineError::SessionFinished),
        };

        if is_final {
            return self.finish().map(AdvanceResult::Finished);
        }

        let (rotation, id, text) = self.resolve_next()?;
        self.flush_active();
        Ok(AdvanceResult::NextPassage(self.open(rotation, id, text)))
    }

    /// Ends the session now, flushing whatever passage is open.
    pub fn finish(&mut self) -> EngineResult<SessionExport> {
        match self.phase {
            EnginePhase::Reading(_) => {}
            EnginePhase::Idle => return Err(EngineError::NotStarted),
            EnginePhase::Finished => return Err(EngineError::SessionFinished),
        }

        self.flush_active();
        self.phase = EnginePhase::Finished;

        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let export = SessionExport::new(
            started_at,
            self.config.mapping_mode,
            self.config.invert_control,
            &self.log,
        );
        log_info!(
            "session {} finished with {} passages",
            export.session_id,
            self.log.len()
        );
        Ok(export)
    }

    fn flush_active(&mut self) {
        if let EnginePhase::Reading(active) = &mut self.phase {
            let id = active.view.id;
            let series = active.logger.flush(id, &mut self.log);
            log_info!("passage {} flushed with {} samples", id, series.len());
        }
    }

    /// Looks up the next passage on a copy of the rotation so a failed lookup consumes
    /// nothing.
    fn resolve_next(&self) -> EngineResult<(TextRotationEngine, PassageId, String)> {
        let mut rotation = self.rotation.clone();
        let id = rotation.next();
        let text = self.corpus.text_for(&id)?.to_owned();
        if text.is_empty() {
            return Err(EngineError::EmptyPassage(id));
        }
        Ok((rotation, id, text))
    }

    fn open(&mut self, rotation: TextRotationEngine, id: PassageId, text: String) -> PassageView {
        self.rotation = rotation;
        if !id.is_acclimation() {
            self.served += 1;
        }
        let is_final = !id.is_acclimation() && self.served >= self.config.total_iterations;

        let focus = self
            .focus
            .compute(&text, self.metrics.as_ref(), self.config.viewport_width);
        let track = ScrollTrack::new(self.metrics.measure(&text), &focus);

        let view = PassageView {
            id,
            characters: text.chars().count(),
            text,
            focus,
            track,
            is_final,
        };
        log_info!(
            "passage {} opened ({} chars, final={})",
            view.id,
            view.characters,
            view.is_final
        );

        self.phase = EnginePhase::Reading(ActivePassage {
            view: view.clone(),
            scroll: ScrollState::new(),
            velocity_memory: 0.0,
            logger: ProgressLogger::new(),
        });
        view
    }
}
