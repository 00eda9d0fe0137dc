use ngscan_core::{AcceptedIds, Candidate, Scope, Strictness};
use serde::Serialize;

/// Outcome of scanning a single source image.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageReport {
    /// File path or label the source was read from.
    pub source: String,
    /// Non-empty OCR lines pooled from every pass.
    pub lines: usize,
    /// Lines that normalized into a candidate.
    pub candidates: usize,
    pub failed_passes: usize,
    /// Dominant prefix of this image's own consensus (per-image scope only).
    pub dominant_prefix: Option<String>,
    /// Accepted identifiers (per-image scope only; batch scope decides once for all).
    pub ids: Vec<Candidate>,
    /// Why the source contributed nothing, if it could not be read.
    pub error: Option<String>,
}

impl ImageReport {
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lines: 0,
            candidates: 0,
            failed_passes: 0,
            dominant_prefix: None,
            ids: vec![],
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchReport {
    pub scope: Scope,
    pub strictness: Strictness,
    pub images: Vec<ImageReport>,
    /// Dominant prefix of the pooled decision (batch scope only).
    pub dominant_prefix: Option<String>,
    /// Sorted, deduplicated identifiers for the whole batch.
    pub ids: AcceptedIds,
}

impl BatchReport {
    pub fn failed_sources(&self) -> usize {
        self.images.iter().filter(|i| i.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_carries_error_only() {
        let r = ImageReport::failed("scan-01.txt", "No such file");
        assert!(r.is_error());
        assert_eq!(r.lines, 0);
        assert!(r.ids.is_empty());
        assert_eq!(r.error.as_deref(), Some("No such file"));
    }

    #[test]
    fn batch_counts_failed_sources() {
        let ok = ImageReport {
            source: "a".into(),
            lines: 3,
            candidates: 2,
            failed_passes: 0,
            dominant_prefix: None,
            ids: vec![],
            error: None,
        };
        let batch = BatchReport {
            scope: Scope::PerImage,
            strictness: Strictness::Relaxed,
            images: vec![ok, ImageReport::failed("b", "boom")],
            dominant_prefix: None,
            ids: AcceptedIds::default(),
        };
        assert_eq!(batch.failed_sources(), 1);
    }

    #[test]
    fn batch_report_serializes_ids_as_strings() {
        let ids: AcceptedIds = ["NG0130002", "NG0130001"]
            .iter()
            .map(|s| s.parse::<Candidate>().unwrap())
            .collect();
        let batch = BatchReport {
            scope: Scope::Batch,
            strictness: Strictness::Strict,
            images: vec![],
            dominant_prefix: Some("NG013".into()),
            ids,
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["scope"], "batch");
        assert_eq!(json["strictness"], "strict");
        assert_eq!(json["ids"], serde_json::json!(["NG0130001", "NG0130002"]));
    }
}
