use serde::{Deserialize, Serialize};

/// What happened to progress when a delta was applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AdvanceOutcome {
    Continued,
    /// Progress is pinned at 1. `first_arrival` is true only for the apply that fired the
    /// passage's completion signal.
    ReachedUpperBound { first_arrival: bool },
    /// Progress is pinned at 0. Carries no completion semantics.
    ReachedLowerBound,
}

/// Bounded reading position for one passage.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    progress: f64,
    completed: bool,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// True once the end of the passage has been reached at least once.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn apply(&mut self, delta: f64) -> AdvanceOutcome {
        let next = self.progress + delta;

        if next >= 1.0 {
            self.progress = 1.0;
            let first_arrival = !self.completed;
            self.completed = true;
            AdvanceOutcome::ReachedUpperBound { first_arrival }
        } else if next <= 0.0 {
            self.progress = 0.0;
            AdvanceOutcome::ReachedLowerBound
        } else if next.is_nan() {
            AdvanceOutcome::Continued
        } else {
            self.progress = next;
            AdvanceOutcome::Continued
        }
    }

    /// Moves progress back to the start without re-arming the completion signal.
    pub fn rewind(&mut self) {
        self.progress = 0.0;
    }

    /// Fresh passage: progress and the completion signal both reset.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.completed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_progress_stays_in_unit_interval() {
        let mut state = ScrollState::new();
        let deltas = [0.3, 0.5, 0.4, -2.0, 0.01, -0.005, 7.5, -0.2, f64::MAX, f64::MIN, 0.0];
        for delta in deltas {
            state.apply(delta);
            assert!((0.0..=1.0).contains(&state.progress()), "delta {delta}");
        }
    }

    #[test]
    fn test_completion_fires_once_while_pinned() {
        let mut state = ScrollState::new();
        assert_eq!(state.apply(0.6), AdvanceOutcome::Continued);
        assert_eq!(
            state.apply(0.6),
            AdvanceOutcome::ReachedUpperBound {
                first_arrival: true
            }
        );
        for _ in 0..5 {
            assert_eq!(
                state.apply(0.1),
                AdvanceOutcome::ReachedUpperBound {
                    first_arrival: false
                }
            );
        }
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_completion_does_not_rearm_after_backing_off() {
        let mut state = ScrollState::new();
        state.apply(1.0);
        state.apply(-0.5);
        assert_relative_eq!(state.progress(), 0.5, epsilon = 1e-12);
        assert_eq!(
            state.apply(0.5),
            AdvanceOutcome::ReachedUpperBound {
                first_arrival: false
            }
        );
    }

    #[test]
    fn test_lower_bound_pins_to_zero() {
        let mut state = ScrollState::new();
        state.apply(0.2);
        assert_eq!(state.apply(-0.5), AdvanceOutcome::ReachedLowerBound);
        assert_eq!(state.progress(), 0.0);
        assert!(!state.is_completed());
    }

    #[test]
    fn test_reset_rearms_completion() {
        let mut state = ScrollState::new();
        state.apply(2.0);
        state.reset();
        assert_eq!(state.progress(), 0.0);
        assert_eq!(
            state.apply(1.0),
            AdvanceOutcome::ReachedUpperBound {
                first_arrival: true
            }
        );
    }

    #[test]
    fn test_nan_delta_leaves_progress_untouched() {
        let mut state = ScrollState::new();
        state.apply(0.25);
        assert_eq!(state.apply(f64::NAN), AdvanceOutcome::Continued);
        assert_relative_eq!(state.progress(), 0.25, epsilon = 1e-12);
    }
}
