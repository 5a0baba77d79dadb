//! Error taxonomy for an inspection.
//!
//! Only `ConfigError`, `ExhaustedError` and `DecodeError` are fatal to an
//! inspection; they meet in `InspectError`. A single `BackendError` is
//! recovered by the failover router, and validation problems are values that
//! travel alongside the verdict.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendRole;

/// Required configuration is missing or out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// One failed detection request.
///
/// `status` is set only when the backend answered with a non-2xx status;
/// transport failures, timeouts and unusable bodies carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{role} backend failed{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct BackendError {
    pub role: BackendRole,
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn transport(role: BackendRole, message: impl Into<String>) -> Self {
        Self {
            role,
            status: None,
            message: message.into(),
        }
    }

    pub fn http(role: BackendRole, status: u16, message: impl Into<String>) -> Self {
        Self {
            role,
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Both backends failed. Carries each cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("all detection backends failed; {primary}; {secondary}")]
pub struct ExhaustedError {
    pub primary: BackendError,
    pub secondary: BackendError,
}

/// A frame could not be decoded or its buffer does not match its size.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    Dimensions {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("frame has zero width or height")]
    Empty,
}

/// Top-level failure of a single inspection. No verdict exists when this is returned.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exhausted(#[from] ExhaustedError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// A raw detection record that was rejected by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("prediction {index}: {message}")]
pub struct ValidationError {
    /// Position of the record in the backend's prediction list.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// An optional field that was dropped; the record itself was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub index: usize,
    pub field: String,
    pub message: String,
}
