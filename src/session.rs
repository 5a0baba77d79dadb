use std::collections::BTreeMap;

use serde::Serialize;

use crate::backend::BackendRole;
use crate::error::InspectError;
use crate::inspector::InspectionResult;

/// Running totals over consecutive inspections.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub frames: usize,
    /// Inspections that produced no verdict.
    pub failed: usize,
    pub detections: usize,
    pub frames_with_person: usize,
    pub compliant_frames: usize,
    pub validation_errors: usize,
    /// Frames in which the primary failed and the secondary answered.
    pub failovers: usize,
    pub primary_used: usize,
    pub secondary_used: usize,
    pub diagnosed_frames: usize,
    pub detections_by_class: BTreeMap<String, usize>,
}

impl SessionSummary {
    pub fn record(&mut self, outcome: &Result<InspectionResult, InspectError>) {
        self.frames += 1;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                self.failed += 1;
                return;
            }
        };

        match result.backend {
            BackendRole::Primary => self.primary_used += 1,
            BackendRole::Secondary => self.secondary_used += 1,
        }
        if result.failover.is_some() {
            self.failovers += 1;
        }
        if result.diagnostics.is_some() {
            self.diagnosed_frames += 1;
        }

        let verdict = &result.verdict;
        self.detections += verdict.total_detections;
        self.validation_errors += result.validation_errors.len();
        if verdict.has_person {
            self.frames_with_person += 1;
        }
        if verdict.is_compliant {
            self.compliant_frames += 1;
        }
        for (class, stats) in &verdict.classes {
            *self.detections_by_class.entry(class.clone()).or_default() += stats.count;
        }
    }

    /// Share of inspected frames that were compliant, 0 to 100.
    pub fn compliance_rate(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.compliant_frames as f64 * 100.0 / self.frames as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceEngine;
    use crate::detect::{CanonicalDetection, ComplianceCategory};
    use crate::error::{BackendError, ExhaustedError};

    fn detection(class: &str) -> CanonicalDetection {
        CanonicalDetection {
            x: 1.0,
            y: 1.0,
            width: 1.0,
            height: 1.0,
            confidence: 0.9,
            class: class.to_string(),
            category: ComplianceCategory::Other,
            class_id: None,
            detection_id: None,
        }
    }

    fn result(backend: BackendRole, classes: &[&str]) -> InspectionResult {
        let detections: Vec<_> = classes.iter().map(|c| detection(c)).collect();
        InspectionResult {
            backend,
            failover: (backend == BackendRole::Secondary)
                .then(|| BackendError::transport(BackendRole::Primary, "timed out")),
            image: None,
            verdict: ComplianceEngine::default().aggregate(&detections, 0.4),
            diagnostics: None,
            validation_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = SessionSummary::default();
        summary.record(&Ok(result(
            BackendRole::Primary,
            &["person", "hardhat", "gloves", "vest"],
        )));
        summary.record(&Ok(result(BackendRole::Secondary, &["person", "hardhat"])));
        summary.record(&Err(InspectError::Exhausted(ExhaustedError {
            primary: BackendError::transport(BackendRole::Primary, "refused"),
            secondary: BackendError::transport(BackendRole::Secondary, "refused"),
        })));

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.detections, 6);
        assert_eq!(summary.frames_with_person, 2);
        assert_eq!(summary.compliant_frames, 1);
        assert_eq!(summary.primary_used, 1);
        assert_eq!(summary.secondary_used, 1);
        assert_eq!(summary.failovers, 1);
        assert_eq!(summary.detections_by_class["person"], 2);
        assert_eq!(summary.detections_by_class["vest"], 1);
        assert!((summary.compliance_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_session_has_zero_rate() {
        assert_eq!(SessionSummary::default().compliance_rate(), 0.0);
    }
}
