//! Guided tutorial run before the first real passage.
//!
//! [`TutorialFlow`] is a small state machine driven by two inputs: "next" button presses
//! and progress snapshots from a [`SessionController`](crate::session::SessionController)
//! running a [`tutorial_engine`]. Button presses return a [`TutorialAction`] the caller
//! carries out (rewinding progress, revealing the control switch, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::corpus::Corpus;
use crate::focus::MonospaceMetrics;
use crate::rotation::{TextRotationEngine, Variant};
use crate::session::{ProgressSnapshot, ScrollEngine};
use crate::settings::RunConfig;
use crate::tilt::{MapperTuning, MappingMode};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

const TILT_RIGHT_DONE: f64 = 0.9;
const TILT_LEFT_DONE: f64 = 0.7;
const REVERSE_TILT_RIGHT_DONE: f64 = 0.8;
const REVERSE_TILT_LEFT_DONE: f64 = 0.6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum TutorialStep {
    ShowLabel,
    TiltRight,
    TiltLeft,
    ShowSwitch,
    ReverseTiltRight,
    ReverseTiltLeft,
    FreePlay,
    Finish,
    Done,
}

/// What the caller has to do in response to a button press.
#[derive(Debug, Clone, PartialEq)]
pub enum TutorialAction {
    None,
    RevealPassage,
    /// Start feeding sensor samples.
    StartMotion,
    /// Rewind progress to 0 and show the control switch.
    RewindAndRevealSwitch,
    UnlockSwitch,
    Finished(TutorialOutcome),
}

/// Choices carried from the tutorial into the reading session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TutorialOutcome {
    pub invert_control: bool,
    pub mapping_mode: MappingMode,
    pub skip_acclimation: bool,
}

impl TutorialOutcome {
    pub fn apply_to(&self, config: &mut RunConfig) {
        config.invert_control = self.invert_control;
        config.mapping_mode = self.mapping_mode;
        config.skip_acclimation = self.skip_acclimation;
    }
}

#[derive(Debug, Clone)]
pub struct TutorialFlow {
    step: TutorialStep,
    mapping_mode: MappingMode,
    motion_started: bool,
    switch_revealed: bool,
    switch_locked: bool,
    switch_on: bool,
    instructions: &'static str,
}

impl TutorialFlow {
    pub fn new(mapping_mode: MappingMode) -> Self {
        Self {
            step: TutorialStep::ShowLabel,
            mapping_mode,
            motion_started: false,
            switch_revealed: false,
            switch_locked: false,
            switch_on: false,
            instructions: "",
        }
    }

    pub fn step(&self) -> TutorialStep {
        self.step
    }

    pub fn instructions(&self) -> &'static str {
        self.instructions
    }

    pub fn is_done(&self) -> bool {
        self.step == TutorialStep::Done
    }

    /// Whether the UI should let the user flip the control switch right now.
    pub fn switch_enabled(&self) -> bool {
        self.switch_revealed && !self.switch_locked
    }

    pub fn on_next_pressed(&mut self) -> TutorialAction {
        let constant_accel = self.mapping_mode == MappingMode::ConstantAccel;
        match self.step {
            TutorialStep::ShowLabel => {
                self.enter(TutorialStep::TiltRight, "This is where the text will appear.");
                TutorialAction::RevealPassage
            }
            TutorialStep::TiltRight if !self.motion_started => {
                self.motion_started = true;
                self.instructions = if constant_accel {
                    "Gently tilt the device right to increase the text's scroll speed\n\
                     Hold the device level once you are at a comfortable speed"
                } else {
                    "Tilt the device right to let the text scroll into view"
                };
                TutorialAction::StartMotion
            }
            TutorialStep::ShowSwitch if !self.switch_revealed => {
                self.switch_revealed = true;
                self.instructions =
                    "Great! Now try the reverse by tapping the switch on the lower right.";
                TutorialAction::RewindAndRevealSwitch
            }
            TutorialStep::FreePlay => {
                self.switch_locked = false;
                self.enter(
                    TutorialStep::Finish,
                    "Free play!\n\
                     Adjust the switch to the tilt configuration that is most comfortable for you.\n\
                     You can still change this setting in the first passage after this tutorial.",
                );
                TutorialAction::UnlockSwitch
            }
            TutorialStep::Finish => {
                self.step = TutorialStep::Done;
                let outcome = TutorialOutcome {
                    invert_control: self.switch_on,
                    mapping_mode: self.mapping_mode,
                    skip_acclimation: true,
                };
                log_info!("tutorial finished: {:?}", outcome);
                TutorialAction::Finished(outcome)
            }
            _ => TutorialAction::None,
        }
    }

    /// Feeds one progress observation. Returns true when the step changed. At most one
    /// step is taken per observation.
    pub fn observe(&mut self, progress: f64, switch_on: bool) -> bool {
        if !self.switch_locked {
            self.switch_on = switch_on;
        }
        if !self.motion_started {
            return false;
        }

        let constant_accel = self.mapping_mode == MappingMode::ConstantAccel;
        match self.step {
            TutorialStep::TiltRight if progress >= TILT_RIGHT_DONE => {
                let text = if constant_accel {
                    "Tilt the device right to speed up the text ✓\n\
                     Tilt the device left to slow down or scroll backwards\n\
                     Hold the device level once you are at a comfortable speed"
                } else {
                    "Tilt the device right to let the text scroll into view ✓\n\
                     Tilt the device left to scroll backwards"
                };
                self.enter(TutorialStep::TiltLeft, text);
                true
            }
            TutorialStep::TiltLeft if progress <= TILT_LEFT_DONE => {
                let text = if constant_accel {
                    "Tilt the device right to speed up the text ✓\n\
                     Tilt the device left to slow down or scroll backwards ✓\n\
                     Hold the device level when you are at a comfortable speed"
                } else {
                    "Tilt the device right to let the text scroll into view ✓\n\
                     Tilt the device left to scroll backwards ✓"
                };
                self.enter(TutorialStep::ShowSwitch, text);
                true
            }
            TutorialStep::ShowSwitch if self.switch_revealed && self.switch_on => {
                self.switch_locked = true;
                self.enter(
                    TutorialStep::ReverseTiltRight,
                    "Tilt the device left to scroll forwards",
                );
                true
            }
            TutorialStep::ReverseTiltRight if progress >= REVERSE_TILT_RIGHT_DONE => {
                self.enter(
                    TutorialStep::ReverseTiltLeft,
                    "Tilt the device left to scroll forwards ✓\n\
                     Tilt the device right to scroll backwards",
                );
                true
            }
            TutorialStep::ReverseTiltLeft if progress <= REVERSE_TILT_LEFT_DONE => {
                self.enter(
                    TutorialStep::FreePlay,
                    "Tilt the device left to scroll forwards ✓\n\
                     Tilt the device right to scroll backwards ✓",
                );
                true
            }
            _ => false,
        }
    }

    pub fn observe_snapshot(&mut self, snapshot: &ProgressSnapshot) -> bool {
        self.observe(snapshot.progress, snapshot.invert_control)
    }

    /// Follows the progress stream until the flow reaches `target` (or any later step).
    pub async fn follow_until(
        &mut self,
        progress: &mut watch::Receiver<ProgressSnapshot>,
        target: TutorialStep,
    ) -> Result<()> {
        loop {
            let snapshot = progress.borrow_and_update().clone();
            self.observe_snapshot(&snapshot);
            if self.step >= target {
                return Ok(());
            }
            progress
                .changed()
                .await
                .context("progress stream closed before the tutorial step was reached")?;
        }
    }

    fn enter(&mut self, step: TutorialStep, instructions: &'static str) {
        log_info!("tutorial step {:?} -> {:?}", self.step, step);
        self.step = step;
        self.instructions = instructions;
    }
}

/// Engine for the tutorial: the acclimation passage only, non-inverted control, and the
/// softer reset tuning for constant acceleration.
pub fn tutorial_engine(config: &RunConfig, corpus: Box<dyn Corpus>) -> ScrollEngine {
    let config = RunConfig {
        invert_control: false,
        skip_acclimation: false,
        total_iterations: 1,
        ..config.clone()
    };
    let metrics = Box::new(MonospaceMetrics::from_font(&config.font));
    let rotation = TextRotationEngine::with_cursor(config.texts_per_category, Variant::A);
    ScrollEngine::with_rotation(config, corpus, metrics, rotation)
        .with_tuning(MapperTuning::tutorial())
}
