//! Per-passage progress traces and the session-wide log they are flushed into.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rotation::PassageId;
use crate::tilt::MappingMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub elapsed_secs: f64,
    /// Position after the sample was applied, clamped to `[0, 1]`.
    pub progress: f64,
    /// Mapped per-sample step before clamping. This is the value the reference traces
    /// carry under their progress column.
    pub delta: f64,
}

/// Accumulates the active passage's series. Performs no timing of its own.
#[derive(Debug, Clone, Default)]
pub struct ProgressLogger {
    series: Vec<ProgressSample>,
}

impl ProgressLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. An elapsed time earlier than the previous sample's is clamped to
    /// it so the series never goes backwards in time.
    pub fn record(&mut self, elapsed_secs: f64, progress: f64, delta: f64) {
        let elapsed_secs = match self.series.last() {
            Some(last) if elapsed_secs < last.elapsed_secs => last.elapsed_secs,
            _ => elapsed_secs,
        };
        self.series.push(ProgressSample {
            elapsed_secs,
            progress,
            delta,
        });
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn samples(&self) -> &[ProgressSample] {
        &self.series
    }

    /// Moves the active series into `log` under `passage` and starts a new, empty one.
    /// Returns the flushed series.
    pub fn flush(&mut self, passage: PassageId, log: &mut SessionLog) -> Vec<ProgressSample> {
        let series = std::mem::take(&mut self.series);
        log.insert(passage, series.clone());
        series
    }
}

/// Every flushed passage of the run. A second flush under the same id replaces the first.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: BTreeMap<PassageId, Vec<ProgressSample>>,
    /// Flush order, kept so exports can list passages as visited.
    visit_order: Vec<PassageId>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the series that was replaced, if any.
    pub fn insert(
        &mut self,
        passage: PassageId,
        series: Vec<ProgressSample>,
    ) -> Option<Vec<ProgressSample>> {
        let replaced = self.entries.insert(passage, series);
        if replaced.is_some() {
            self.visit_order.retain(|visited| *visited != passage);
        }
        self.visit_order.push(passage);
        replaced
    }

    pub fn get(&self, passage: &PassageId) -> Option<&[ProgressSample]> {
        self.entries.get(passage).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passages(&self) -> &[PassageId] {
        &self.visit_order
    }

    /// Passage keys rendered as `"<ordinal><variant><category>"`.
    pub fn to_export_map(&self) -> BTreeMap<String, Vec<ProgressSample>> {
        self.entries
            .iter()
            .map(|(passage, series)| (passage.to_string(), series.clone()))
            .collect()
    }
}

/// What gets handed to the metrics/export collaborator at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mapping_mode: MappingMode,
    pub invert_control: bool,
    pub passage_order: Vec<String>,
    pub passages: BTreeMap<String, Vec<ProgressSample>>,
}

impl SessionExport {
    pub fn new(
        started_at: DateTime<Utc>,
        mapping_mode: MappingMode,
        invert_control: bool,
        log: &SessionLog,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            mapping_mode,
            invert_control,
            passage_order: log.passages().iter().map(ToString::to_string).collect(),
            passages: log.to_export_map(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{PassageCategory, Variant};

    fn semantics(ordinal: u32, variant: Variant) -> PassageId {
        PassageId::new(PassageCategory::Semantics, ordinal, variant)
    }

    #[test]
    fn test_flush_moves_series_into_log() {
        let mut logger = ProgressLogger::new();
        let mut log = SessionLog::new();
        logger.record(0.02, 0.1, 0.1);
        logger.record(0.04, 0.2, 0.1);

        let flushed = logger.flush(semantics(1, Variant::A), &mut log);
        assert_eq!(flushed.len(), 2);
        assert!(logger.is_empty());
        assert_eq!(log.get(&semantics(1, Variant::A)).unwrap(), flushed.as_slice());
    }

    #[test]
    fn test_duplicate_flush_keeps_last_series() {
        let mut logger = ProgressLogger::new();
        let mut log = SessionLog::new();
        let passage = semantics(2, Variant::B);

        logger.record(0.1, 0.3, 0.3);
        logger.flush(passage, &mut log);

        logger.record(0.5, 0.9, 0.9);
        logger.record(0.6, 1.0, 0.4);
        logger.flush(passage, &mut log);

        assert_eq!(log.len(), 1);
        assert_eq!(
            log.get(&passage).unwrap(),
            &[
                ProgressSample {
                    elapsed_secs: 0.5,
                    progress: 0.9,
                    delta: 0.9
                },
                ProgressSample {
                    elapsed_secs: 0.6,
                    progress: 1.0,
                    delta: 0.4
                },
            ]
        );
        assert_eq!(log.passages(), &[passage]);
    }

    #[test]
    fn test_record_never_goes_back_in_time() {
        let mut logger = ProgressLogger::new();
        logger.record(1.0, 0.1, 0.1);
        logger.record(0.5, 0.2, 0.1);
        let times: Vec<f64> = logger.samples().iter().map(|s| s.elapsed_secs).collect();
        assert_eq!(times, vec![1.0, 1.0]);
    }

    #[test]
    fn test_export_keys_use_passage_labels() {
        let mut log = SessionLog::new();
        log.insert(PassageId::acclimation(), vec![]);
        log.insert(PassageId::new(PassageCategory::Lexical, 4, Variant::B), vec![]);

        let map = log.to_export_map();
        assert!(map.contains_key("1AAcclimation"));
        assert!(map.contains_key("4BLexical"));

        let export = SessionExport::new(Utc::now(), MappingMode::Linear, false, &log);
        assert_eq!(export.passage_order, vec!["1AAcclimation", "4BLexical"]);
        let json = export.to_json_pretty().unwrap();
        assert!(json.contains("\"mappingMode\": \"linear\""));
    }
}
