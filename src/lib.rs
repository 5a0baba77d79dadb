//! PPE Inspector
//!
//! Turns a single camera frame into a personal-protective-equipment
//! compliance verdict: is a person present, and were the required protective
//! items (head, hand, body) detected with sufficient confidence.
//!
//! # Pipeline
//!
//! 1. **Routing**: the frame goes to the primary detection backend; on any
//!    failure it goes to the secondary backend exactly once.
//! 2. **Normalization**: untrusted predictions are validated record by
//!    record. Malformed records are dropped and reported, never fatal.
//! 3. **Classification**: an ordered keyword taxonomy maps class names to
//!    protection categories; first match wins.
//! 4. **Compliance**: detections below the confidence gate are discarded and
//!    the remaining coverage is checked against the required categories.
//! 5. **Diagnosis**: when too few detections survive, frame-quality
//!    statistics explain whether the scene is empty or the frame is unusable.
//!
//! # Module Structure
//!
//! - `frame`: RGB frame container, decoding and JPEG encoding
//! - `backend`: BackendClient trait, HTTP client, failover router
//! - `detect`: wire shapes, normalizer, category taxonomy
//! - `compliance`: policy, confidence gate, verdict
//! - `quality`: frame-quality analyzer and diagnostic report
//! - `inspector`: the orchestrating `PpeInspector`
//! - `session`: totals over consecutive inspections
//! - `config`: file and environment configuration

pub mod backend;
pub mod compliance;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod inspector;
pub mod quality;
pub mod session;

#[cfg(feature = "http-backend")]
pub use backend::HttpBackendClient;
pub use backend::{BackendClient, BackendRole, FailoverRouter, Routed, StubBackend};
pub use compliance::{
    ComplianceEngine, CompliancePolicy, ComplianceVerdict, ConfidenceStats, Coverage,
};
pub use config::{BackendConfig, InspectorConfig};
pub use detect::{
    BackendResponse, CanonicalDetection, ComplianceCategory, DetectionNormalizer, ImageDims,
    Normalized, RawDetection, Taxonomy, TaxonomyRule,
};
pub use error::{
    BackendError, ConfigError, DecodeError, ExhaustedError, InspectError, ValidationError,
    ValidationWarning,
};
pub use frame::Frame;
pub use inspector::{InspectionResult, PpeInspector};
pub use quality::{DiagnosticReport, FrameQualityAnalyzer, QualityFlag, QualityThresholds};
pub use session::SessionSummary;
