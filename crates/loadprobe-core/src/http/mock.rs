//! Scripted in-memory transport for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LoadprobeError;
use crate::http::transport::{Session, Transport, TransportError};

/// What a mock session answers for one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub latency: Duration,
    pub result: Result<u16, TransportError>,
}

impl MockReply {
    pub fn status(code: u16) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Ok(code),
        }
    }

    pub fn error(err: TransportError) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Err(err),
        }
    }

    pub fn after_ms(mut self, ms: u64) -> Self {
        self.latency = Duration::from_millis(ms);
        self
    }
}

type Script = dyn Fn(u32, usize) -> MockReply + Send + Sync;

/// Answers each request via a script called with
/// `(round_index, request_sequence_within_round)`.
#[derive(Clone)]
pub struct MockTransport {
    script: Arc<Script>,
    opened: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    unavailable: bool,
}

impl MockTransport {
    pub fn new(script: impl Fn(u32, usize) -> MockReply + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            opened: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            unavailable: false,
        }
    }

    pub fn always(code: u16) -> Self {
        Self::new(move |_, _| MockReply::status(code))
    }

    pub fn failing(err: TransportError) -> Self {
        Self::new(move |_, _| MockReply::error(err.clone()))
    }

    /// A transport whose sessions can never be opened.
    pub fn unavailable() -> Self {
        let mut transport = Self::always(200);
        transport.unavailable = true;
        transport
    }

    /// Total sessions opened so far (one per dispatched round).
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet dropped.
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn open_session(&self, round_index: u32) -> Result<MockSession, LoadprobeError> {
        if self.unavailable {
            return Err(LoadprobeError::Internal(
                "mock transport unavailable".to_string(),
            ));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            round_index,
            script: Arc::clone(&self.script),
            sequence: AtomicUsize::new(0),
            live: Arc::clone(&self.live),
        })
    }
}

pub struct MockSession {
    round_index: u32,
    script: Arc<Script>,
    sequence: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for MockSession {
    async fn get(&self, _url: &str) -> Result<u16, TransportError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let reply = (self.script)(self.round_index, seq);
        if !reply.latency.is_zero() {
            tokio::time::sleep(reply.latency).await;
        }
        reply.result
    }
}
