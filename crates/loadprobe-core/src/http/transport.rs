use async_trait::async_trait;

use crate::error::LoadprobeError;

/// A transport-level failure: no HTTP response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// One round's worth of connection state.
///
/// A session is shared by every concurrent request of a single round and
/// dropped when the round ends, which releases its connection pool.
#[async_trait]
pub trait Session: Send + Sync {
    /// Issue a plain GET to `url` and return the response status code.
    ///
    /// Implementations must not retry.
    async fn get(&self, url: &str) -> Result<u16, TransportError>;
}

/// Factory for per-round [`Session`]s.
pub trait Transport: Send + Sync {
    type Session: Session + 'static;

    /// Open a fresh session for the round at 1-based `round_index`.
    fn open_session(&self, round_index: u32) -> Result<Self::Session, LoadprobeError>;
}
