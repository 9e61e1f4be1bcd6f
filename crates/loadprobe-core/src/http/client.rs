use std::time::Duration;

use async_trait::async_trait;

use crate::error::LoadprobeError;
use crate::http::transport::{Session, Transport, TransportError};

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`ReqwestTransport`], with builder-style setters.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    timeout: Duration,
    pool_max_idle_per_host: usize,
    user_agent: String,
    danger_accept_invalid_certs: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pool_max_idle_per_host: 100,
            user_agent: format!("loadprobe/{}", env!("CARGO_PKG_VERSION")),
            danger_accept_invalid_certs: false,
        }
    }
}

impl TransportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    fn build_client(&self) -> Result<reqwest::Client, LoadprobeError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(client)
    }
}

// ---------------------------------------------------------------------------
// ReqwestTransport
// ---------------------------------------------------------------------------

/// [`Transport`] backed by reqwest. Every round gets its own
/// [`reqwest::Client`] and therefore its own connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: TransportSettings,
}

impl ReqwestTransport {
    /// Create a transport, building one throwaway client up front so that a
    /// broken TLS backend is reported before any round is dispatched.
    pub fn new(settings: TransportSettings) -> Result<Self, LoadprobeError> {
        if settings.timeout.is_zero() {
            return Err(LoadprobeError::Validation(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        settings.build_client()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

impl Transport for ReqwestTransport {
    type Session = ReqwestSession;

    fn open_session(&self, _round_index: u32) -> Result<ReqwestSession, LoadprobeError> {
        Ok(ReqwestSession {
            client: self.settings.build_client()?,
        })
    }
}

pub struct ReqwestSession {
    client: reqwest::Client,
}

#[async_trait]
impl Session for ReqwestSession {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        // The round trip ends once the body has been fully received.
        response.bytes().await.map_err(classify)?;
        Ok(status)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
