pub mod client;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ReqwestSession, ReqwestTransport, TransportSettings, DEFAULT_REQUEST_TIMEOUT};
pub use request::{NetworkErrorKind, RequestExecutor, RequestOutcome, RequestStatus};
pub use transport::{Session, Transport, TransportError};
