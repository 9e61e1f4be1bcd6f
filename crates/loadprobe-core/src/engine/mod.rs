use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::LoadprobeError;
use crate::http::transport::Transport;
use crate::results::Termination;

pub mod aggregator;
pub mod dispatcher;
pub mod executor;
pub mod load;
pub mod stress;

pub use aggregator::{summarize, RoundAggregator, RoundResult};
pub use dispatcher::RoundDispatcher;
pub use executor::{run_configuration, spawn_test, EngineHandle, StopHandle};
pub use load::LoadTestController;
pub use stress::StressTestController;

/// Current operational status of a background run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Rounds are being dispatched.
    Running,
    /// Cancellation was requested; the current round is still finishing.
    Stopping,
    /// The run produced a `TestRun`.
    Completed,
    /// The run failed before producing a `TestRun`.
    Error,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineStatus::Running => "running",
            EngineStatus::Stopping => "stopping",
            EngineStatus::Completed => "completed",
            EngineStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One-way progress notification emitted by the controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Sent immediately before a round is dispatched.
    RoundStarted { round_index: u32, concurrency: u32 },
    /// Sent once a round has been summarized and recorded.
    RoundCompleted { result: RoundResult },
    /// Sent once, after the last round.
    Finished { termination: Termination },
}

/// Optional collaborators of a controller run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Progress sink. Send failures are ignored.
    pub events: Option<mpsc::Sender<EngineEvent>>,
    /// Checked before each round and raced against the inter-round delay.
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn with_events(mut self, events: mpsc::Sender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) async fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Shared round helpers
// ---------------------------------------------------------------------------

/// Dispatch, summarize and report one round.
pub(crate) async fn run_round<T: Transport>(
    dispatcher: &RoundDispatcher<T>,
    options: &RunOptions,
    url: &str,
    round_index: u32,
    concurrency: u32,
) -> Result<RoundResult, LoadprobeError> {
    options
        .emit(EngineEvent::RoundStarted {
            round_index,
            concurrency,
        })
        .await;

    let started = Instant::now();
    let outcomes = dispatcher.dispatch(round_index, url, concurrency).await?;
    let result = summarize(round_index, concurrency, &outcomes).with_wall_clock(started.elapsed());

    tracing::info!(
        round_index,
        concurrency,
        success_rate = result.success_rate,
        mean_s = result.mean_duration,
        "round completed"
    );
    options
        .emit(EngineEvent::RoundCompleted {
            result: result.clone(),
        })
        .await;
    Ok(result)
}

/// Sleep for `delay` unless cancelled first. Returns `true` when cancelled.
pub(crate) async fn pause_between_rounds(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
