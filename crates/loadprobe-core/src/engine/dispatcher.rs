use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::LoadprobeError;
use crate::http::request::{NetworkErrorKind, RequestExecutor, RequestOutcome};
use crate::http::transport::Transport;

/// Fans one round out across `n` concurrent requests.
///
/// Each call to [`RoundDispatcher::dispatch`] opens a fresh session from the
/// transport, shares it between the round's tasks, and drops it before
/// returning.
pub struct RoundDispatcher<T: Transport> {
    transport: T,
    executor: RequestExecutor,
}

impl<T: Transport> RoundDispatcher<T> {
    pub fn new(transport: T, executor: RequestExecutor) -> Self {
        Self {
            transport,
            executor,
        }
    }

    /// Launch `n` requests against `url` at once and wait for every one of
    /// them. The returned vec always has exactly `n` entries, in completion
    /// order.
    ///
    /// Fails only if the round's session cannot be opened, in which case no
    /// request was sent.
    pub async fn dispatch(
        &self,
        round_index: u32,
        url: &str,
        n: u32,
    ) -> Result<Vec<RequestOutcome>, LoadprobeError> {
        let session = Arc::new(self.transport.open_session(round_index)?);
        tracing::debug!(round_index, concurrency = n, "opened round session");

        let url: Arc<str> = Arc::from(url);
        let mut join_set = JoinSet::new();
        for _ in 0..n {
            let session = Arc::clone(&session);
            let url = Arc::clone(&url);
            let executor = self.executor;
            join_set.spawn(async move { executor.execute(session.as_ref(), &url).await });
        }

        let mut outcomes = Vec::with_capacity(n as usize);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    // Keep the round at exactly n outcomes.
                    tracing::warn!(round_index, error = %err, "request task did not complete");
                    outcomes.push(RequestOutcome::network_error(NetworkErrorKind::Other));
                }
            }
        }

        drop(session);
        tracing::debug!(round_index, "released round session");
        Ok(outcomes)
    }
}
