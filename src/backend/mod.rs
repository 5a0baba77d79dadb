//! Detection backends and failover routing.
//!
//! A `BackendClient` performs exactly one detection request per call and
//! never retries. `FailoverRouter` owns the retry policy: one primary
//! attempt, then at most one secondary attempt.

use std::fmt;

use serde::Serialize;

use crate::config::BackendConfig;
use crate::detect::BackendResponse;
use crate::error::BackendError;
use crate::frame::Frame;

#[cfg(feature = "http-backend")]
mod http;
mod router;
mod stub;

#[cfg(feature = "http-backend")]
pub use http::HttpBackendClient;
pub use router::{FailoverRouter, Routed};
pub use stub::StubBackend;

/// Which endpoint served (or failed) a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    /// Local inference server.
    Primary,
    /// Cloud fallback.
    Secondary,
}

impl BackendRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendRole::Primary => "primary",
            BackendRole::Secondary => "secondary",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection endpoint.
///
/// Implementations must be safe to share across threads: hosts may inspect
/// consecutive frames in parallel through the same client.
pub trait BackendClient: Send + Sync {
    /// Client identifier for logs.
    fn name(&self) -> &str;

    /// Issue one detection request for `frame`.
    ///
    /// Non-2xx responses, transport failures, timeouts and unusable bodies
    /// are all reported as `BackendError`. No retry happens here.
    fn detect(&self, frame: &Frame, config: &BackendConfig)
        -> Result<BackendResponse, BackendError>;
}
