use serde::Serialize;

use super::taxonomy::ComplianceCategory;

/// Pass-through identifier from the backend (`class_id`, `detection_id`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarId {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

/// A validated detection. Box is center-form in backend pixel coordinates.
///
/// Only the normalizer constructs these from backend output, so
/// `confidence` is always within `[0, 1]` and `class` is never empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalDetection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    pub class: String,
    pub category: ComplianceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ScalarId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<ScalarId>,
}
