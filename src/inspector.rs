//! Frame-to-verdict pipeline.
//!
//! `route -> normalize -> gate + classify -> verdict`, with a quality
//! diagnosis attached when the detector returned too few usable detections.
//! Each call is independent; an inspector can be shared across threads.

use serde::Serialize;

use crate::backend::{BackendRole, FailoverRouter};
use crate::compliance::{ComplianceEngine, ComplianceVerdict};
use crate::config::InspectorConfig;
use crate::detect::{DetectionNormalizer, ImageDims, Taxonomy};
use crate::error::{BackendError, InspectError, ValidationError, ValidationWarning};
use crate::frame::Frame;
use crate::quality::{DiagnosticReport, FrameQualityAnalyzer};

/// Outcome of one successful inspection.
#[derive(Clone, Debug, Serialize)]
pub struct InspectionResult {
    /// Backend that produced the detections.
    pub backend: BackendRole,
    /// Primary failure, when the secondary answered instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover: Option<BackendError>,
    /// Image size as reported by the backend.
    pub image: Option<ImageDims>,
    pub verdict: ComplianceVerdict,
    pub diagnostics: Option<DiagnosticReport>,
    pub validation_errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

pub struct PpeInspector {
    router: FailoverRouter,
    taxonomy: Taxonomy,
    normalizer: DetectionNormalizer,
}

impl PpeInspector {
    pub fn new(router: FailoverRouter) -> Self {
        Self::with_taxonomy(router, Taxonomy::default())
    }

    pub fn with_taxonomy(router: FailoverRouter, taxonomy: Taxonomy) -> Self {
        Self {
            router,
            normalizer: DetectionNormalizer::new(taxonomy.clone()),
            taxonomy,
        }
    }

    /// Inspector over the HTTP primary and cloud endpoints, sharing one
    /// connection pool.
    #[cfg(feature = "http-backend")]
    pub fn http() -> Self {
        use crate::backend::HttpBackendClient;

        let agent = ureq::AgentBuilder::new().build();
        Self::new(FailoverRouter::new(
            HttpBackendClient::with_agent(BackendRole::Primary, agent.clone()),
            HttpBackendClient::with_agent(BackendRole::Secondary, agent),
        ))
    }

    pub fn inspect(
        &self,
        frame: &Frame,
        config: &InspectorConfig,
    ) -> Result<InspectionResult, InspectError> {
        config.validate()?;

        let routed = self.router.detect(frame, &config.backend)?;
        let normalized = self.normalizer.normalize(&routed.response.predictions);

        let engine = ComplianceEngine::new(self.taxonomy.clone(), config.policy.clone());
        let verdict = engine.aggregate(&normalized.detections, config.backend.confidence);

        let diagnostics = if normalized.detections.len() <= config.diagnostic_floor {
            let report = FrameQualityAnalyzer::new(config.quality.clone()).analyze(frame);
            log::warn!(
                "{} usable detections (floor {}); attaching frame diagnosis: {}",
                normalized.detections.len(),
                config.diagnostic_floor,
                describe_flags(&report)
            );
            Some(report)
        } else {
            None
        };

        log::info!(
            "{} backend: {} detections, {} rejected, person={}, compliant={}",
            routed.backend,
            verdict.total_detections,
            normalized.rejected(),
            verdict.has_person,
            verdict.is_compliant
        );

        Ok(InspectionResult {
            backend: routed.backend,
            failover: routed.primary_error,
            image: routed.response.image,
            verdict,
            diagnostics,
            validation_errors: normalized.errors,
            warnings: normalized.warnings,
        })
    }

    /// Decode compressed image bytes and inspect them.
    pub fn inspect_bytes(
        &self,
        bytes: &[u8],
        config: &InspectorConfig,
    ) -> Result<InspectionResult, InspectError> {
        config.validate()?;
        let frame = Frame::decode(bytes)?;
        self.inspect(&frame, config)
    }
}

fn describe_flags(report: &DiagnosticReport) -> String {
    if report.flags.is_empty() {
        return "frame looks fine".to_string();
    }
    report
        .flags
        .iter()
        .map(|flag| flag.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StubBackend;
    use crate::detect::{BackendResponse, ComplianceCategory};
    use serde_json::json;

    fn config() -> InspectorConfig {
        let mut config = InspectorConfig::default();
        config.backend.api_key = "test-key".to_string();
        config
    }

    fn frame() -> Frame {
        Frame::from_rgb(8, 8, vec![90u8; 8 * 8 * 3]).unwrap()
    }

    fn inspector(primary: StubBackend, secondary: StubBackend) -> PpeInspector {
        PpeInspector::new(FailoverRouter::new(primary, secondary))
    }

    #[test]
    fn person_with_hardhat_only_is_not_compliant() {
        let response = BackendResponse::from_predictions(vec![
            json!({"x": 320, "y": 240, "width": 100, "height": 300, "confidence": 0.9, "class": "person"}),
            json!({"x": 320, "y": 110, "width": 60, "height": 40, "confidence": 0.8, "class": "hardhat"}),
        ])
        .with_image(640, 480);
        let result = inspector(
            StubBackend::succeeding(response),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect(&frame(), &config())
        .unwrap();

        assert_eq!(result.backend, BackendRole::Primary);
        assert!(result.failover.is_none());
        assert_eq!(result.image, Some(ImageDims { width: 640, height: 480 }));
        let verdict = &result.verdict;
        assert!(verdict.has_person);
        assert!(verdict.coverage.head);
        assert!(!verdict.coverage.hand);
        assert!(!verdict.coverage.body);
        assert!(!verdict.is_compliant);
        assert!(result.diagnostics.is_none());
    }

    #[test]
    fn empty_result_attaches_diagnostics() {
        let result = inspector(
            StubBackend::succeeding(BackendResponse::default()),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect(&frame(), &config())
        .unwrap();

        assert_eq!(result.verdict.total_detections, 0);
        assert!(!result.verdict.is_compliant);
        let report = result.diagnostics.expect("diagnostic report");
        assert_eq!((report.width, report.height), (8, 8));
    }

    #[test]
    fn secondary_answers_when_primary_fails() {
        let secondary = StubBackend::succeeding(BackendResponse::from_predictions(vec![json!({
            "x": 1, "y": 1, "width": 1, "height": 1, "confidence": 0.95, "class": "person"
        })]));
        let result = inspector(
            StubBackend::failing(BackendError::transport(BackendRole::Primary, "timed out")),
            secondary,
        )
        .inspect(&frame(), &config())
        .unwrap();

        assert_eq!(result.backend, BackendRole::Secondary);
        assert!(result.verdict.has_person);
        assert_eq!(result.failover.unwrap().message, "timed out");
        assert_eq!(
            serde_json::to_value(result.backend).unwrap(),
            json!("secondary")
        );
    }

    #[test]
    fn exhausted_backends_yield_no_result() {
        let err = inspector(
            StubBackend::unreachable(BackendRole::Primary),
            StubBackend::failing(BackendError::http(BackendRole::Secondary, 500, "boom")),
        )
        .inspect(&frame(), &config())
        .unwrap_err();

        match err {
            InspectError::Exhausted(e) => {
                assert_eq!(e.primary.role, BackendRole::Primary);
                assert_eq!(e.secondary.status, Some(500));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_api_key_fails_before_any_backend_call() {
        let primary = StubBackend::succeeding(BackendResponse::default());
        let calls = primary.clone();
        let err = inspector(primary, StubBackend::unreachable(BackendRole::Secondary))
            .inspect(&frame(), &InspectorConfig::default())
            .unwrap_err();

        assert!(matches!(err, InspectError::Config(_)));
        assert_eq!(calls.calls(), 0);
    }

    #[test]
    fn malformed_records_are_reported_but_do_not_block_the_verdict() {
        let response = BackendResponse::from_predictions(vec![
            json!({"x": 1, "y": 1, "width": 1, "height": 1, "confidence": 0.9, "class": "person"}),
            json!({"x": 1, "y": 1, "width": 1, "height": 1, "confidence": 1.2, "class": "vest"}),
            json!({"x": 1, "y": 1, "width": 1, "height": 1, "confidence": 0.7, "class": "gloves", "class_id": [1]}),
        ]);
        let result = inspector(
            StubBackend::succeeding(response),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect(&frame(), &config())
        .unwrap();

        assert_eq!(result.verdict.total_detections, 2);
        assert_eq!(result.validation_errors.len(), 1);
        assert_eq!(result.validation_errors[0].index, 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.verdict.count(ComplianceCategory::Hand), 1);
        assert!(!result.verdict.coverage.body);
    }

    #[test]
    fn floor_counts_usable_detections_before_the_gate() {
        let response = BackendResponse::from_predictions(vec![json!({
            "x": 1, "y": 1, "width": 1, "height": 1, "confidence": 0.1, "class": "person"
        })]);
        let result = inspector(
            StubBackend::succeeding(response.clone()),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect(&frame(), &config())
        .unwrap();
        assert_eq!(result.verdict.gated_out, 1);
        assert!(result.diagnostics.is_none());

        let mut raised = config();
        raised.diagnostic_floor = 1;
        let result = inspector(
            StubBackend::succeeding(response),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect(&frame(), &raised)
        .unwrap();
        assert!(result.diagnostics.is_some());
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let err = inspector(
            StubBackend::succeeding(BackendResponse::default()),
            StubBackend::unreachable(BackendRole::Secondary),
        )
        .inspect_bytes(b"\x00\x01garbage", &config())
        .unwrap_err();
        assert!(matches!(err, InspectError::Decode(_)));
    }
}
