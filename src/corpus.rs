//! Passage text lookup.
//!
//! A missing entry is a build/configuration problem, never something to paper over with a
//! substitute passage, so lookups fail with [`EngineError::MissingPassage`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::rotation::{PassageCategory, PassageId, Variant};

pub trait Corpus: Send {
    fn lookup(
        &self,
        category: PassageCategory,
        ordinal: u32,
        variant: Variant,
    ) -> EngineResult<&str>;

    fn text_for(&self, passage: &PassageId) -> EngineResult<&str> {
        self.lookup(passage.category, passage.ordinal, passage.variant)
    }
}

/// One table per category keyed by `"<ordinal><variant>"`, the layout of the experiment's
/// per-category text files:
///
/// ```json
/// { "Acclimation": { "1A": "..." }, "Semantics": { "1A": "...", "1B": "..." } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct JsonCorpus {
    tables: HashMap<PassageCategory, HashMap<String, String>>,
}

impl JsonCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| EngineError::CorpusLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|err| EngineError::CorpusLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn insert(&mut self, passage: PassageId, text: impl Into<String>) {
        self.tables
            .entry(passage.category)
            .or_default()
            .insert(passage.corpus_key(), text.into());
    }

    pub fn with_passage(mut self, passage: PassageId, text: impl Into<String>) -> Self {
        self.insert(passage, text);
        self
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Corpus for JsonCorpus {
    fn lookup(
        &self,
        category: PassageCategory,
        ordinal: u32,
        variant: Variant,
    ) -> EngineResult<&str> {
        let passage = PassageId::new(category, ordinal, variant);
        self.tables
            .get(&category)
            .and_then(|table| table.get(&passage.corpus_key()))
            .map(String::as_str)
            .ok_or(EngineError::MissingPassage(passage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_reads_category_tables() {
        let corpus: JsonCorpus = serde_json::from_str(
            r#"{
                "Acclimation": { "1A": "warm up text" },
                "Semantics": { "1A": "first a", "1B": "first b" }
            }"#,
        )
        .unwrap();

        assert_eq!(corpus.len(), 3);
        assert_eq!(
            corpus.lookup(PassageCategory::Semantics, 1, Variant::B).unwrap(),
            "first b"
        );
        assert_eq!(corpus.text_for(&PassageId::acclimation()).unwrap(), "warm up text");
    }

    #[test]
    fn test_missing_entry_is_fatal() {
        let corpus = JsonCorpus::new().with_passage(PassageId::acclimation(), "hello");
        let err = corpus
            .lookup(PassageCategory::Lexical, 2, Variant::A)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingPassage(id) if id.to_string() == "2ALexical"
        ));
    }

    #[test]
    fn test_unknown_category_fails_to_parse() {
        let parsed: Result<JsonCorpus, _> = serde_json::from_str(r#"{ "Poetry": { "1A": "x" } }"#);
        assert!(parsed.is_err());
    }
}
