//! Passage identity and the rotation schedule that picks which passage comes next.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassageCategory {
    Acclimation,
    Semantics,
    Syntactic,
    Lexical,
}

impl PassageCategory {
    /// Categories served after acclimation, in schedule order.
    pub const ROTATION: [PassageCategory; 3] = [
        PassageCategory::Semantics,
        PassageCategory::Syntactic,
        PassageCategory::Lexical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PassageCategory::Acclimation => "Acclimation",
            PassageCategory::Semantics => "Semantics",
            PassageCategory::Syntactic => "Syntactic",
            PassageCategory::Lexical => "Lexical",
        }
    }
}

impl fmt::Display for PassageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    pub fn flipped(self) -> Self {
        match self {
            Variant::A => Variant::B,
            Variant::B => Variant::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one passage. Displays as `"<ordinal><variant><category>"`, e.g. `2BSyntactic`,
/// which is also the key used in the session export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PassageId {
    pub category: PassageCategory,
    pub ordinal: u32,
    pub variant: Variant,
}

impl PassageId {
    pub fn new(category: PassageCategory, ordinal: u32, variant: Variant) -> Self {
        Self {
            category,
            ordinal,
            variant,
        }
    }

    pub fn acclimation() -> Self {
        Self::new(PassageCategory::Acclimation, 1, Variant::A)
    }

    pub fn is_acclimation(&self) -> bool {
        self.category == PassageCategory::Acclimation
    }

    /// Key of this passage inside its category's corpus table, e.g. `"3A"`.
    pub fn corpus_key(&self) -> String {
        format!("{}{}", self.ordinal, self.variant)
    }
}

impl fmt::Display for PassageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ordinal, self.variant, self.category)
    }
}

/// Deterministic passage schedule with a randomized starting variant.
///
/// `iteration_counter == -1` means the acclimation passage is next. The schedule has no
/// upper bound: past the last category it wraps back to the first.
#[derive(Debug, Clone)]
pub struct TextRotationEngine {
    iteration_counter: i64,
    variant_cursor: Variant,
    texts_per_category: u32,
}

impl TextRotationEngine {
    /// Draws the starting variant from `rng`; the rest of the schedule is deterministic.
    pub fn new<R: Rng + ?Sized>(texts_per_category: u32, rng: &mut R) -> Self {
        let variant_cursor = if rng.gen_bool(0.5) {
            Variant::A
        } else {
            Variant::B
        };
        Self::with_cursor(texts_per_category, variant_cursor)
    }

    /// Same as [`TextRotationEngine::new`] but the acclimation passage is never served.
    pub fn skipping_acclimation<R: Rng + ?Sized>(texts_per_category: u32, rng: &mut R) -> Self {
        let mut engine = Self::new(texts_per_category, rng);
        engine.iteration_counter = 0;
        engine
    }

    pub fn with_cursor(texts_per_category: u32, variant_cursor: Variant) -> Self {
        Self {
            iteration_counter: -1,
            variant_cursor,
            texts_per_category: texts_per_category.max(1),
        }
    }

    pub fn iteration_counter(&self) -> i64 {
        self.iteration_counter
    }

    pub fn variant_cursor(&self) -> Variant {
        self.variant_cursor
    }

    pub fn next(&mut self) -> PassageId {
        let id = if self.iteration_counter < 0 {
            PassageId::acclimation()
        } else {
            let per_category = i64::from(self.texts_per_category);
            let block = (self.iteration_counter / per_category) as usize;
            let category = PassageCategory::ROTATION[block % PassageCategory::ROTATION.len()];
            let ordinal = (self.iteration_counter % per_category) as u32 + 1;
            PassageId::new(category, ordinal, self.variant_cursor)
        };

        self.variant_cursor = self.variant_cursor.flipped();
        self.iteration_counter += 1;
        id
    }
}
