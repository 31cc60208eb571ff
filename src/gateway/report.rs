//! Result normalization
//!
//! The analysis service answers in two families: a newer detection shape
//! (nested statistics, per-verse breakdown) and a legacy shape (flat word
//! error rate plus an ordered operation list). Both arrive through one wire
//! struct with every field optional, and `normalize` folds them into a single
//! `Report` so downstream rendering never branches on which family produced
//! the data.

use serde::Deserialize;

// ============================================================================
// Wire shape — exactly what the service sends, everything optional
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReport {
    pub status: Option<String>,
    pub detection_method: Option<String>,
    #[serde(rename = "starting_ayah")]
    pub starting_verse: Option<String>,
    pub detection_confidence: Option<String>,
    pub hypothesis: Option<String>,
    pub detected_range: Option<RawRange>,
    pub overall_statistics: Option<RawStats>,
    #[serde(rename = "per_ayah_results")]
    pub per_verse_results: Option<Vec<RawVerseResult>>,
    pub processing_time: Option<f64>,
    pub error: Option<String>,
    pub suggestion: Option<String>,
    pub transcript: Option<String>,
    pub transcript_length: Option<i64>,
    // Legacy family
    pub wer: Option<f64>,
    pub ops: Option<Vec<RawOp>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRange {
    #[serde(rename = "start_ayah")]
    pub start: String,
    #[serde(rename = "end_ayah")]
    pub end: String,
    #[serde(rename = "total_ayahs", default)]
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStats {
    #[serde(default)]
    pub total_words: i64,
    #[serde(default)]
    pub correct: i64,
    #[serde(default)]
    pub substitutions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub insertions: i64,
    #[serde(default)]
    pub wer: f64,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVerseResult {
    #[serde(rename = "ayah_id", default)]
    pub locator: String,
    #[serde(rename = "surah", default)]
    pub passage_label: String,
    #[serde(rename = "ayah", default)]
    pub verse_label: String,
    #[serde(default)]
    pub words: i64,
    #[serde(default)]
    pub correct: i64,
    #[serde(default)]
    pub substitutions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub insertions: i64,
    #[serde(default)]
    pub wer: f64,
    #[serde(default)]
    pub reference_text: String,
    #[serde(default)]
    pub errors: Vec<RawVerseError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVerseError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "ref_word", default)]
    pub reference: String,
    #[serde(rename = "hyp_word", default)]
    pub hypothesis: String,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOp {
    #[serde(rename = "ref_ar", default)]
    pub reference: String,
    #[serde(rename = "hyp_ar", default)]
    pub hypothesis: String,
    #[serde(rename = "op", default)]
    pub code: String,
    #[serde(rename = "t_start", default)]
    pub start: f64,
    #[serde(rename = "t_end", default)]
    pub end: f64,
}

// ============================================================================
// Canonical shape
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    #[default]
    FixedTarget,
    AutoDetect,
}

/// Classification of one word-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Correct,
    Substitution,
    Deletion,
    Insertion,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordOp {
    pub reference: String,
    pub hypothesis: String,
    /// Operation code as sent by the service ("C", "S", "D", "I")
    pub code: String,
    pub start: f64,
    pub end: f64,
}

impl WordOp {
    pub fn kind(&self) -> OpKind {
        match self.code.as_str() {
            "C" => OpKind::Correct,
            "S" => OpKind::Substitution,
            "D" => OpKind::Deletion,
            "I" => OpKind::Insertion,
            _ => OpKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedRange {
    pub start: String,
    pub end: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallStats {
    pub total_words: i64,
    pub correct: i64,
    pub substitutions: i64,
    pub deletions: i64,
    pub insertions: i64,
    pub error_rate: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerseError {
    pub kind: String,
    pub reference: String,
    pub hypothesis: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerseResult {
    pub locator: String,
    pub passage_label: String,
    pub verse_label: String,
    pub words: i64,
    pub correct: i64,
    pub substitutions: i64,
    pub deletions: i64,
    pub insertions: i64,
    pub error_rate: f64,
    pub reference_text: String,
    pub errors: Vec<VerseError>,
}

/// The one internal result representation. Absence of data is `None` (or an
/// empty `match_status`), never a sentinel number, so "no data yet" stays
/// distinguishable from a measured zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub mode: ReportMode,
    /// "matched", "no_match", or "" while unknown/pending
    pub match_status: String,
    pub confidence: Option<String>,
    pub starting_verse: Option<String>,
    pub detected_range: Option<DetectedRange>,
    pub overall: Option<OverallStats>,
    /// `Some(vec![])` is a valid empty breakdown; `None` means the service
    /// sent no breakdown at all.
    pub per_verse: Option<Vec<VerseResult>>,
    pub hypothesis: Option<String>,
    pub transcript: Option<String>,
    pub processing_time: Option<f64>,
    pub error: Option<String>,
    pub suggestion: Option<String>,
    // Legacy family
    pub error_rate: Option<f64>,
    pub operations: Option<Vec<WordOp>>,
}

impl Report {
    /// True when the service has not produced any result content yet.
    pub fn is_pending(&self) -> bool {
        self.match_status.is_empty()
            && self.overall.is_none()
            && self.per_verse.is_none()
            && self.operations.is_none()
            && self.error_rate.is_none()
            && self.error.is_none()
    }

    /// Overall error rate regardless of which family supplied it.
    pub fn headline_error_rate(&self) -> Option<f64> {
        self.overall
            .as_ref()
            .map(|s| s.error_rate)
            .or(self.error_rate)
    }
}

/// Fold either response family into the canonical report. Pure and
/// deterministic; never fails — an empty input is a valid pending report.
pub fn normalize(raw: &RawReport) -> Report {
    let detection = raw.detection_method.is_some() || raw.starting_verse.is_some();
    let legacy = raw.wer.is_some() || raw.ops.is_some();

    let mode = if detection {
        ReportMode::AutoDetect
    } else if legacy {
        ReportMode::FixedTarget
    } else {
        ReportMode::default()
    };

    Report {
        mode,
        match_status: raw.status.clone().unwrap_or_default(),
        confidence: raw.detection_confidence.clone(),
        starting_verse: raw.starting_verse.clone(),
        detected_range: raw.detected_range.as_ref().map(|r| DetectedRange {
            start: r.start.clone(),
            end: r.end.clone(),
            total: r.total,
        }),
        overall: raw.overall_statistics.as_ref().map(|s| OverallStats {
            total_words: s.total_words,
            correct: s.correct,
            substitutions: s.substitutions,
            deletions: s.deletions,
            insertions: s.insertions,
            error_rate: s.wer,
            accuracy: s.accuracy,
        }),
        per_verse: raw
            .per_verse_results
            .as_ref()
            .map(|rs| rs.iter().map(normalize_verse).collect()),
        hypothesis: raw.hypothesis.clone(),
        transcript: raw.transcript.clone(),
        processing_time: raw.processing_time,
        error: raw.error.clone(),
        suggestion: raw.suggestion.clone(),
        error_rate: raw.wer,
        operations: raw.ops.as_ref().map(|ops| {
            ops.iter()
                .map(|op| WordOp {
                    reference: op.reference.clone(),
                    hypothesis: op.hypothesis.clone(),
                    code: op.code.clone(),
                    start: op.start,
                    end: op.end,
                })
                .collect()
        }),
    }
}

fn normalize_verse(raw: &RawVerseResult) -> VerseResult {
    VerseResult {
        locator: raw.locator.clone(),
        passage_label: raw.passage_label.clone(),
        verse_label: raw.verse_label.clone(),
        words: raw.words,
        correct: raw.correct,
        substitutions: raw.substitutions,
        deletions: raw.deletions,
        insertions: raw.insertions,
        error_rate: raw.wer,
        reference_text: raw.reference_text.clone(),
        errors: raw
            .errors
            .iter()
            .map(|e| VerseError {
                kind: e.kind.clone(),
                reference: e.reference.clone(),
                hypothesis: e.hypothesis.clone(),
                position: e.position,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawReport {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn legacy_only_response_maps_to_fixed_target() {
        let report = normalize(&raw(json!({
            "wer": 0.0,
            "ops": [
                {"ref_ar": "بسم", "hyp_ar": "بسم", "op": "C", "t_start": 0.0, "t_end": 0.4},
                {"ref_ar": "الله", "hyp_ar": "", "op": "D", "t_start": 0.4, "t_end": 0.9},
            ]
        })));

        assert_eq!(report.mode, ReportMode::FixedTarget);
        assert!(report.overall.is_none());
        assert_eq!(report.error_rate, Some(0.0));

        let ops = report.operations.as_ref().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind(), OpKind::Correct);
        assert_eq!(ops[1].kind(), OpKind::Deletion);
        assert_eq!(ops[1].reference, "الله");
        assert_eq!(ops[1].start, 0.4);
        assert_eq!(ops[1].end, 0.9);
    }

    #[test]
    fn detection_response_with_empty_breakdown() {
        let report = normalize(&raw(json!({
            "status": "no_match",
            "detection_method": "auto",
            "per_ayah_results": []
        })));

        assert_eq!(report.mode, ReportMode::AutoDetect);
        assert_eq!(report.match_status, "no_match");
        // Empty breakdown is a valid empty sequence, not "absent".
        assert_eq!(report.per_verse.as_deref(), Some(&[][..]));
        assert!(!report.is_pending());
    }

    #[test]
    fn full_detection_response() {
        let report = normalize(&raw(json!({
            "status": "matched",
            "detection_method": "auto",
            "starting_ayah": "110001",
            "detection_confidence": "high",
            "hypothesis": "نص",
            "detected_range": {"start_ayah": "110001", "end_ayah": "110003", "total_ayahs": 3},
            "overall_statistics": {
                "total_words": 19, "correct": 18, "substitutions": 1,
                "deletions": 0, "insertions": 0, "wer": 0.052, "accuracy": 0.947
            },
            "per_ayah_results": [{
                "ayah_id": "110001", "surah": "110", "ayah": "1",
                "words": 7, "correct": 6, "substitutions": 1,
                "deletions": 0, "insertions": 0, "wer": 0.142,
                "reference_text": "إذا جاء نصر الله والفتح",
                "errors": [{"type": "substitution", "ref_word": "نصر", "hyp_word": "نسر", "position": 2}]
            }],
            "processing_time": 12.8
        })));

        assert_eq!(report.mode, ReportMode::AutoDetect);
        assert_eq!(report.match_status, "matched");
        assert_eq!(report.confidence.as_deref(), Some("high"));
        assert_eq!(report.starting_verse.as_deref(), Some("110001"));

        let range = report.detected_range.as_ref().unwrap();
        assert_eq!((range.start.as_str(), range.end.as_str(), range.total), ("110001", "110003", 3));

        let overall = report.overall.as_ref().unwrap();
        assert_eq!(overall.total_words, 19);
        assert_eq!(overall.error_rate, 0.052);

        let verses = report.per_verse.as_ref().unwrap();
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].errors[0].kind, "substitution");
        assert_eq!(verses[0].errors[0].position, 2);
        assert_eq!(report.headline_error_rate(), Some(0.052));
    }

    #[test]
    fn empty_response_is_pending_not_an_error() {
        let report = normalize(&raw(json!({})));

        assert_eq!(report.match_status, "");
        assert!(report.is_pending());
        assert!(report.overall.is_none());
        assert!(report.per_verse.is_none());
        assert!(report.operations.is_none());
        assert!(report.error_rate.is_none());
        assert!(report.headline_error_rate().is_none());
    }

    #[test]
    fn measured_zero_is_distinguishable_from_absent() {
        let zero = normalize(&raw(json!({"wer": 0.0})));
        let absent = normalize(&raw(json!({})));
        assert_eq!(zero.error_rate, Some(0.0));
        assert_eq!(absent.error_rate, None);
        assert!(!zero.is_pending());
        assert!(absent.is_pending());
    }

    #[test]
    fn failed_analysis_carries_error_and_suggestion() {
        let report = normalize(&raw(json!({
            "status": "no_match",
            "detection_method": "auto",
            "error": "audio too short",
            "suggestion": "record at least two seconds"
        })));
        assert_eq!(report.error.as_deref(), Some("audio too short"));
        assert_eq!(report.suggestion.as_deref(), Some("record at least two seconds"));
        assert!(!report.is_pending());
    }

    proptest! {
        // Shape priority: any response with detection markers is auto-detect,
        // legacy markers alone are fixed-target, neither is a pending report.
        #[test]
        fn mode_follows_shape_priority(
            has_method in any::<bool>(),
            has_start in any::<bool>(),
            has_wer in any::<bool>(),
            has_ops in any::<bool>(),
        ) {
            let mut value = serde_json::Map::new();
            if has_method {
                value.insert("detection_method".into(), json!("auto"));
            }
            if has_start {
                value.insert("starting_ayah".into(), json!("001001"));
            }
            if has_wer {
                value.insert("wer".into(), json!(0.25));
            }
            if has_ops {
                value.insert("ops".into(), json!([]));
            }

            let report = normalize(&raw(serde_json::Value::Object(value)));
            if has_method || has_start {
                prop_assert_eq!(report.mode, ReportMode::AutoDetect);
            } else if has_wer || has_ops {
                prop_assert_eq!(report.mode, ReportMode::FixedTarget);
            } else {
                prop_assert!(report.is_pending());
            }
        }
    }
}
