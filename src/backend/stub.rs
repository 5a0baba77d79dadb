use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{BackendClient, BackendRole};
use crate::config::BackendConfig;
use crate::detect::BackendResponse;
use crate::error::BackendError;
use crate::frame::Frame;

/// Scripted backend for tests and offline runs. Returns the same outcome on
/// every call and counts calls.
///
/// Clones share the call counter, so a test can keep a handle after moving
/// the stub into a router.
#[derive(Clone)]
pub struct StubBackend {
    name: String,
    outcome: Arc<Result<BackendResponse, BackendError>>,
    calls: Arc<AtomicUsize>,
}

impl StubBackend {
    pub fn succeeding(response: BackendResponse) -> Self {
        Self::with_outcome("stub", Ok(response))
    }

    pub fn failing(error: BackendError) -> Self {
        Self::with_outcome("stub", Err(error))
    }

    /// Backend that fails the way an unreachable server does.
    pub fn unreachable(role: BackendRole) -> Self {
        Self::failing(BackendError::transport(role, "Connection Failed: connection refused"))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_outcome(name: &str, outcome: Result<BackendResponse, BackendError>) -> Self {
        Self {
            name: name.to_string(),
            outcome: Arc::new(outcome),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BackendClient for StubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(
        &self,
        _frame: &Frame,
        _config: &BackendConfig,
    ) -> Result<BackendResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.outcome).clone()
    }
}
