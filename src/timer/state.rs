use std::time::{Duration, Instant};

/// Decimal places kept on reported elapsed times.
pub const ELAPSED_DECIMALS: i32 = 4;

/// Monotonic passage stopwatch. Restarted whenever a passage opens and stopped when the
/// session ends; readings feed the progress log.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    running_anchor: Option<Instant>,
    /// Reading held after `stop`.
    frozen: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    /// Zeroes the reading and starts counting from now.
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, now: Instant) {
        self.running_anchor = Some(now);
        self.frozen = Duration::ZERO;
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.frozen = now.saturating_duration_since(anchor);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match self.running_anchor {
            Some(anchor) => now.saturating_duration_since(anchor),
            None => self.frozen,
        }
    }

    /// Elapsed seconds rounded to [`ELAPSED_DECIMALS`] places.
    pub fn round_time(&self) -> f64 {
        round_secs(self.elapsed().as_secs_f64())
    }
}

pub fn round_secs(secs: f64) -> f64 {
    let scale = 10f64.powi(ELAPSED_DECIMALS);
    (secs * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stopwatch_reports_zero() {
        let watch = Stopwatch::new();
        assert_eq!(watch.elapsed(), Duration::ZERO);
        assert!(!watch.is_running());
        assert_eq!(watch.round_time(), 0.0);
    }

    #[test]
    fn test_restart_counts_from_the_new_passage() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.restart_at(t0);
        assert_eq!(
            watch.elapsed_at(t0 + Duration::from_millis(1500)),
            Duration::from_millis(1500)
        );

        watch.restart_at(t0 + Duration::from_secs(10));
        assert!(watch.is_running());
        assert_eq!(
            watch.elapsed_at(t0 + Duration::from_millis(10_250)),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_stopped_stopwatch_is_frozen() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.restart_at(t0);
        watch.stop_at(t0 + Duration::from_secs(2));
        assert!(!watch.is_running());
        assert_eq!(
            watch.elapsed_at(t0 + Duration::from_secs(60)),
            Duration::from_secs(2)
        );

        // A second stop keeps the first reading.
        watch.stop_at(t0 + Duration::from_secs(30));
        assert_eq!(watch.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_restart_after_stop_clears_the_reading() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.restart_at(t0);
        watch.stop_at(t0 + Duration::from_secs(3));
        watch.restart_at(t0 + Duration::from_secs(5));
        assert_eq!(watch.elapsed_at(t0 + Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_round_secs_keeps_four_decimals() {
        assert_eq!(round_secs(1.234_567), 1.2346);
        assert_eq!(round_secs(0.000_04), 0.0);
    }
}
