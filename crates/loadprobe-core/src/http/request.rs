use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::LoadprobeError;
use crate::http::client::DEFAULT_REQUEST_TIMEOUT;
use crate::http::transport::{Session, TransportError};

/// Why a request produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Other,
}

impl From<&TransportError> for NetworkErrorKind {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout => NetworkErrorKind::Timeout,
            TransportError::Connect(_) => NetworkErrorKind::Connect,
            TransportError::Other(_) => NetworkErrorKind::Other,
        }
    }
}

/// Classification of a single request. Exactly one variant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestStatus {
    /// The server answered with status 200.
    Success,
    /// The server answered with any other status.
    HttpError { code: u16 },
    /// No response was obtained.
    NetworkError { cause: NetworkErrorKind },
}

/// Result of one timed GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestOutcome {
    pub status: RequestStatus,
    /// Round-trip seconds. `None` for network errors.
    pub duration: Option<f64>,
}

impl RequestOutcome {
    pub fn success(duration: f64) -> Self {
        Self {
            status: RequestStatus::Success,
            duration: Some(duration),
        }
    }

    pub fn http_error(code: u16, duration: f64) -> Self {
        Self {
            status: RequestStatus::HttpError { code },
            duration: Some(duration),
        }
    }

    pub fn network_error(cause: NetworkErrorKind) -> Self {
        Self {
            status: RequestStatus::NetworkError { cause },
            duration: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RequestStatus::Success)
    }
}

// ---------------------------------------------------------------------------
// RequestExecutor
// ---------------------------------------------------------------------------

/// Issues one timed GET through a [`Session`] and classifies the outcome.
///
/// The per-request timeout is enforced here rather than trusted to the
/// transport, so a stalled request always resolves as a network error.
/// No retries are performed.
#[derive(Debug, Clone, Copy)]
pub struct RequestExecutor {
    timeout: Duration,
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RequestExecutor {
    /// A zero timeout would fail every request before it is sent, so it is
    /// rejected.
    pub fn new(timeout: Duration) -> Result<Self, LoadprobeError> {
        if timeout.is_zero() {
            return Err(LoadprobeError::Validation(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self { timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute<S>(&self, session: &S, url: &str) -> RequestOutcome
    where
        S: Session + ?Sized,
    {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, session.get(url)).await {
            Ok(Ok(code)) => {
                let duration = start.elapsed().as_secs_f64();
                if code == 200 {
                    RequestOutcome::success(duration)
                } else {
                    RequestOutcome::http_error(code, duration)
                }
            }
            Ok(Err(err)) => {
                tracing::trace!(url, error = %err, "request failed before a response");
                RequestOutcome::network_error(NetworkErrorKind::from(&err))
            }
            Err(_) => {
                tracing::trace!(
                    url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "request timed out"
                );
                RequestOutcome::network_error(NetworkErrorKind::Timeout)
            }
        }
    }
}
