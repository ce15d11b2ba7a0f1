use serde::{Deserialize, Serialize};

use super::metrics::TextMeasure;

/// Factor applied to the configured window size when choosing the measurement sample.
const SAMPLE_WIDTH_FACTOR: f64 = 1.5;

/// Fraction of each blur zone over which the mask fades.
const FEATHER: f64 = 0.9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MaskZone {
    Blurred,
    Sharp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradientStop {
    /// Position along the viewport width, 0 = left edge, 1 = right edge.
    pub location: f64,
    pub zone: MaskZone,
}

/// Blur mask description for the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FocusWindowProfile {
    /// The sharp window covers the viewport (or blur is disabled): render everything sharp.
    Sharp {
        window_width: f64,
        blur_margin_px: f64,
    },
    Blurred {
        window_width: f64,
        blur_margin_px: f64,
        /// Width of each side blur zone as a fraction of the viewport.
        clear_fraction: f64,
        stops: [GradientStop; 6],
    },
}

impl FocusWindowProfile {
    pub fn blur_margin_px(&self) -> f64 {
        match self {
            FocusWindowProfile::Sharp { blur_margin_px, .. }
            | FocusWindowProfile::Blurred { blur_margin_px, .. } => *blur_margin_px,
        }
    }

    pub fn window_width(&self) -> f64 {
        match self {
            FocusWindowProfile::Sharp { window_width, .. }
            | FocusWindowProfile::Blurred { window_width, .. } => *window_width,
        }
    }

    pub fn is_blurred(&self) -> bool {
        matches!(self, FocusWindowProfile::Blurred { .. })
    }
}

/// Computes the sharp focus window. Holds configuration only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusWindowCalculator {
    pub sample_char_count: f64,
    pub blur_strength: f64,
}

impl FocusWindowCalculator {
    pub fn new(sample_char_count: f64, blur_strength: f64) -> Self {
        Self {
            sample_char_count,
            blur_strength,
        }
    }

    pub fn compute(
        &self,
        text: &str,
        metrics: &dyn TextMeasure,
        viewport_width: f64,
    ) -> FocusWindowProfile {
        let sample = leading_chars(text, sample_len(self.sample_char_count));
        self.compute_for_width(metrics.measure(sample), viewport_width)
    }

    /// Same as [`FocusWindowCalculator::compute`] once the sample has been measured.
    pub fn compute_for_width(&self, window_width: f64, viewport_width: f64) -> FocusWindowProfile {
        let blur_margin_px = (viewport_width - window_width) / 2.0;
        let clear_fraction = (1.0 - window_width / viewport_width) / 2.0;

        if !(clear_fraction > 0.0) || self.blur_strength <= 0.0 {
            return FocusWindowProfile::Sharp {
                window_width,
                blur_margin_px,
            };
        }

        let stop = |location: f64, zone: MaskZone| GradientStop { location, zone };
        FocusWindowProfile::Blurred {
            window_width,
            blur_margin_px,
            clear_fraction,
            stops: [
                stop(0.0, MaskZone::Blurred),
                stop(clear_fraction * FEATHER, MaskZone::Blurred),
                stop(clear_fraction, MaskZone::Sharp),
                stop((1.0 - clear_fraction) * FEATHER, MaskZone::Sharp),
                stop(1.0 - clear_fraction, MaskZone::Blurred),
                stop(1.0, MaskZone::Blurred),
            ],
        }
    }
}

/// Horizontal travel of the text strip. Progress is the animation time offset, so the
/// strip moves linearly from 0 to `-travel_px` as progress goes from 0 to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrollTrack {
    pub text_width: f64,
    pub travel_px: f64,
}

impl ScrollTrack {
    /// The strip is `text_width + viewport` wide and must travel far enough for the last
    /// characters to clear the right blur zone.
    pub fn new(text_width: f64, profile: &FocusWindowProfile) -> Self {
        Self {
            text_width,
            travel_px: text_width + profile.blur_margin_px(),
        }
    }

    pub fn offset_x(&self, progress: f64) -> f64 {
        -progress.clamp(0.0, 1.0) * self.travel_px
    }
}

fn sample_len(sample_char_count: f64) -> usize {
    let len = (sample_char_count * SAMPLE_WIDTH_FACTOR).ceil();
    if len.is_finite() && len > 0.0 {
        len as usize
    } else {
        0
    }
}

fn leading_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::MonospaceMetrics;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_filling_viewport_is_sharp() {
        let calculator = FocusWindowCalculator::new(5.0, 10.0);
        let profile = calculator.compute_for_width(800.0, 800.0);
        assert_eq!(
            profile,
            FocusWindowProfile::Sharp {
                window_width: 800.0,
                blur_margin_px: 0.0
            }
        );
    }

    #[test]
    fn test_measures_first_ceil_one_and_a_half_window_chars() {
        // ceil(5 * 1.5) = 8 characters at 100pt advance = 800pt.
        let metrics = MonospaceMetrics::new("Courier", 100.0, 1.0);
        let calculator = FocusWindowCalculator::new(5.0, 10.0);
        let profile = calculator.compute("the quick brown fox", &metrics, 800.0);
        assert!(!profile.is_blurred());
        assert_relative_eq!(profile.window_width(), 800.0);
    }

    #[test]
    fn test_blurred_profile_has_symmetric_stops() {
        let calculator = FocusWindowCalculator::new(5.0, 10.0);
        let profile = calculator.compute_for_width(200.0, 1000.0);

        let FocusWindowProfile::Blurred {
            blur_margin_px,
            clear_fraction,
            stops,
            ..
        } = profile
        else {
            panic!("expected blurred profile, got {profile:?}");
        };

        assert_relative_eq!(blur_margin_px, 400.0);
        assert_relative_eq!(clear_fraction, 0.4);
        let locations: Vec<f64> = stops.iter().map(|s| s.location).collect();
        let expected = [0.0, 0.36, 0.4, 0.54, 0.6, 1.0];
        for (got, want) in locations.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        let zones: Vec<MaskZone> = stops.iter().map(|s| s.zone).collect();
        assert_eq!(
            zones,
            vec![
                MaskZone::Blurred,
                MaskZone::Blurred,
                MaskZone::Sharp,
                MaskZone::Sharp,
                MaskZone::Blurred,
                MaskZone::Blurred,
            ]
        );
    }

    #[test]
    fn test_zero_blur_strength_disables_mask() {
        let calculator = FocusWindowCalculator::new(5.0, 0.0);
        let profile = calculator.compute_for_width(200.0, 1000.0);
        assert!(!profile.is_blurred());
        assert_relative_eq!(profile.blur_margin_px(), 400.0);
    }

    #[test]
    fn test_short_text_is_measured_whole() {
        let metrics = MonospaceMetrics::new("Courier", 10.0, 1.0);
        let calculator = FocusWindowCalculator::new(5.0, 10.0);
        let profile = calculator.compute("abc", &metrics, 1000.0);
        assert_relative_eq!(profile.window_width(), 30.0);
    }

    #[test]
    fn test_scroll_track_travels_past_blur_zone() {
        let calculator = FocusWindowCalculator::new(5.0, 10.0);
        let profile = calculator.compute_for_width(200.0, 1000.0);
        let track = ScrollTrack::new(3000.0, &profile);
        assert_relative_eq!(track.travel_px, 3400.0);
        assert_relative_eq!(track.offset_x(0.5), -1700.0);
        assert_eq!(track.offset_x(0.0), 0.0);
    }
}
