use crate::settings::FontSpec;

/// Measures the rendered width of a run of text, in points.
pub trait TextMeasure: Send {
    fn measure(&self, text: &str) -> f64;
}

/// Fixed-advance metrics: every character is `size * advance_ratio` wide.
#[derive(Debug, Clone, PartialEq)]
pub struct MonospaceMetrics {
    pub family: String,
    pub size: f64,
    pub advance_ratio: f64,
}

impl MonospaceMetrics {
    /// Advance ratio used for families we have no table for.
    pub const DEFAULT_ADVANCE_RATIO: f64 = 0.6;

    pub fn new(family: impl Into<String>, size: f64, advance_ratio: f64) -> Self {
        Self {
            family: family.into(),
            size,
            advance_ratio,
        }
    }

    pub fn from_font(font: &FontSpec) -> Self {
        let ratio = match font.family.to_ascii_lowercase().as_str() {
            "courier" | "courier new" | "menlo" => 0.6,
            "monaco" => 0.6002,
            _ => Self::DEFAULT_ADVANCE_RATIO,
        };
        Self::new(font.family.clone(), font.size, ratio)
    }

    pub fn advance(&self) -> f64 {
        self.size * self.advance_ratio
    }
}

impl TextMeasure for MonospaceMetrics {
    fn measure(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.advance()
    }
}
