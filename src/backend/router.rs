use crate::backend::{BackendClient, BackendRole};
use crate::config::BackendConfig;
use crate::detect::BackendResponse;
use crate::error::{BackendError, ExhaustedError};
use crate::frame::Frame;

/// Successful routing outcome.
#[derive(Clone, Debug)]
pub struct Routed {
    /// Backend that produced `response`.
    pub backend: BackendRole,
    pub response: BackendResponse,
    /// Why the primary was skipped, when the secondary answered.
    pub primary_error: Option<BackendError>,
}

enum RouteState {
    TryPrimary,
    TrySecondary { primary_error: BackendError },
}

/// Primary-then-secondary router.
///
/// States: `TryPrimary` -> (`Success` | `TrySecondary`) -> (`Success` | `Exhausted`).
/// At most two backend calls per frame, so the worst case is two request timeouts.
pub struct FailoverRouter {
    primary: Box<dyn BackendClient>,
    secondary: Box<dyn BackendClient>,
}

impl FailoverRouter {
    pub fn new<P, S>(primary: P, secondary: S) -> Self
    where
        P: BackendClient + 'static,
        S: BackendClient + 'static,
    {
        Self {
            primary: Box::new(primary),
            secondary: Box::new(secondary),
        }
    }

    pub fn detect(&self, frame: &Frame, config: &BackendConfig) -> Result<Routed, ExhaustedError> {
        let mut state = RouteState::TryPrimary;
        loop {
            state = match state {
                RouteState::TryPrimary => match self.primary.detect(frame, config) {
                    Ok(response) => {
                        log::info!(
                            "primary backend {} returned {} predictions",
                            self.primary.name(),
                            response.predictions.len()
                        );
                        return Ok(Routed {
                            backend: BackendRole::Primary,
                            response,
                            primary_error: None,
                        });
                    }
                    Err(err) => {
                        let primary_error = with_role(err, BackendRole::Primary);
                        log::warn!("{}; failing over to {}", primary_error, self.secondary.name());
                        RouteState::TrySecondary { primary_error }
                    }
                },
                RouteState::TrySecondary { primary_error } => {
                    return match self.secondary.detect(frame, config) {
                        Ok(response) => {
                            log::info!(
                                "secondary backend {} returned {} predictions",
                                self.secondary.name(),
                                response.predictions.len()
                            );
                            Ok(Routed {
                                backend: BackendRole::Secondary,
                                response,
                                primary_error: Some(primary_error),
                            })
                        }
                        Err(err) => {
                            let secondary = with_role(err, BackendRole::Secondary);
                            log::error!("{}; no backend left", secondary);
                            Err(ExhaustedError {
                                primary: primary_error,
                                secondary,
                            })
                        }
                    };
                }
            };
        }
    }
}

// Errors are attributed to the slot that produced them, whatever the client reported.
fn with_role(err: BackendError, role: BackendRole) -> BackendError {
    BackendError { role, ..err }
}
