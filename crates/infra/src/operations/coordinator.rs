//! Status coordinator: the polling / backoff / redirect state machine.
//!
//! ```text
//! CHECKING ──present──────────────────────────────▶ RESOLVED (redirect | inline)
//!    │
//!    ├─absent, Immediate──────────────────────────▶ ACKNOWLEDGED_PENDING (202)
//!    │
//!    └─absent, Blocking──▶ PENDING_WAIT ──sleep──▶ RECHECK ─present─▶ RESOLVED
//!                              ▲                      │
//!                              └────absent, double────┘
//!                                      │ delay >= ceiling
//!                                      ▼
//!                                  TIMED_OUT (404)
//! ```
//!
//! Store failures while checking are retried with the same delays. If the
//! schedule runs out and the last check failed, the outcome is
//! `StoreUnavailable`, never `TimedOut`.
//!
//! Nothing here is shared between invocations. When a client disconnects the
//! HTTP layer drops the future returned by [`StatusCoordinator::check`], which
//! cancels any pending sleep; the job itself is unaffected.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use asyncreply_auth::{DelegatedAccessToken, DelegationIssuer};
use asyncreply_core::{ObjectKey, OperationId, StatusEndpoint};

use crate::backoff::{BackoffSchedule, Delays};
use crate::store::{ObjectStore, StoreError};

/// Default `Retry-After` suggested with a pending response.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// How a resolved result is handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Redirect to a delegated read URI (valet key); no result bytes pass
    /// through the coordinator.
    #[default]
    Redirect,
    /// Read the whole object into memory and return it as the body.
    /// Unsuitable for large results.
    Inline,
}

/// What to do while the result does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingMode {
    /// Answer "accepted" right away with the status location.
    #[default]
    Immediate,
    /// Hold the request and re-check under backoff.
    Blocking,
}

impl CompletionMode {
    pub const PARAM: &'static str = "OnComplete";

    /// Parse an optional query value; absent means the default.
    pub fn from_param(raw: Option<&str>) -> Result<Self, StatusError> {
        raw.map_or(Ok(Self::default()), |s| s.parse())
    }
}

impl FromStr for CompletionMode {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Redirect" => Ok(Self::Redirect),
            "Stream" | "Inline" => Ok(Self::Inline),
            other => Err(StatusError::InvalidMode {
                parameter: Self::PARAM,
                value: other.to_string(),
            }),
        }
    }
}

impl PendingMode {
    pub const PARAM: &'static str = "OnPending";

    /// Parse an optional query value; absent means the default.
    pub fn from_param(raw: Option<&str>) -> Result<Self, StatusError> {
        raw.map_or(Ok(Self::default()), |s| s.parse())
    }
}

impl FromStr for PendingMode {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted" | "Immediate" => Ok(Self::Immediate),
            "Synchronous" | "Blocking" => Ok(Self::Blocking),
            other => Err(StatusError::InvalidMode {
                parameter: Self::PARAM,
                value: other.to_string(),
            }),
        }
    }
}

/// Terminal outcome of one status check.
#[derive(Debug, Clone)]
pub enum StatusOutcome {
    /// Resolved, delivered by redirect to the token URI.
    Redirect(DelegatedAccessToken),
    /// Resolved, delivered inline.
    Inline(Bytes),
    /// Not resolved yet; poll `status_url` again after `retry_after`.
    Pending {
        status_url: String,
        retry_after: Duration,
    },
    /// Blocking wait exhausted its backoff without the result appearing.
    TimedOut { waited: Duration },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusError {
    /// Unrecognized mode value; rejected before the store is touched.
    #[error("invalid {parameter} value '{value}'")]
    InvalidMode {
        parameter: &'static str,
        value: String,
    },

    /// The store could not be reached within the backoff budget.
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),
}

pub struct StatusCoordinator {
    store: Arc<dyn ObjectStore>,
    issuer: Arc<DelegationIssuer>,
    endpoint: StatusEndpoint,
    backoff: BackoffSchedule,
    retry_after: Duration,
}

impl StatusCoordinator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        issuer: Arc<DelegationIssuer>,
        endpoint: StatusEndpoint,
    ) -> Self {
        Self {
            store,
            issuer,
            endpoint,
            backoff: BackoffSchedule::default(),
            retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn backoff(&self) -> BackoffSchedule {
        self.backoff
    }

    /// Run the state machine for one status request.
    #[instrument(skip(self, id), fields(operation_id = %id))]
    pub async fn check(
        &self,
        id: OperationId,
        completion: CompletionMode,
        pending: PendingMode,
    ) -> Result<StatusOutcome, StatusError> {
        let key = ObjectKey::for_result(id);
        let mut delays = self.backoff.delays();

        if self.probe(&key, &mut delays).await? {
            debug!("result present on first check");
            return self.deliver(&key, completion).await;
        }

        match pending {
            PendingMode::Immediate => {
                let status_url = self.endpoint.status_url(id);
                debug!(status_url = %status_url, "result pending; acknowledging");
                Ok(StatusOutcome::Pending {
                    status_url,
                    retry_after: self.retry_after,
                })
            }
            PendingMode::Blocking => self.wait(&key, completion, delays).await,
        }
    }

    /// First existence check. Store failures consume delays from the shared
    /// schedule until a definite answer comes back.
    async fn probe(&self, key: &ObjectKey, delays: &mut Delays) -> Result<bool, StatusError> {
        loop {
            match self.store.exists(key).await {
                Ok(present) => return Ok(present),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "existence check failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(unavailable(e)),
                },
            }
        }
    }

    async fn wait(
        &self,
        key: &ObjectKey,
        completion: CompletionMode,
        delays: Delays,
    ) -> Result<StatusOutcome, StatusError> {
        let mut waited = Duration::ZERO;
        let mut last_error: Option<StoreError> = None;

        for delay in delays {
            debug!(
                delay_ms = delay.as_millis() as u64,
                "result pending; rechecking after delay"
            );
            tokio::time::sleep(delay).await;
            waited += delay;

            match self.store.exists(key).await {
                Ok(true) => {
                    info!(
                        waited_ms = waited.as_millis() as u64,
                        "result appeared while waiting"
                    );
                    return self.deliver(key, completion).await;
                }
                Ok(false) => last_error = None,
                Err(e) => {
                    warn!(error = %e, "existence recheck failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(unavailable(e)),
            None => {
                info!(
                    waited_ms = waited.as_millis() as u64,
                    "result not found before backoff ceiling"
                );
                Ok(StatusOutcome::TimedOut { waited })
            }
        }
    }

    async fn deliver(
        &self,
        key: &ObjectKey,
        completion: CompletionMode,
    ) -> Result<StatusOutcome, StatusError> {
        match completion {
            CompletionMode::Redirect => {
                Ok(StatusOutcome::Redirect(self.issuer.issue_read_token(key)))
            }
            CompletionMode::Inline => {
                let body = self.store.get(key).await.map_err(unavailable)?;
                Ok(StatusOutcome::Inline(body))
            }
        }
    }
}

fn unavailable(e: StoreError) -> StatusError {
    StatusError::StoreUnavailable(e.to_string())
}
