use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ensure_valid, TestConfiguration, TestMode};
use crate::engine::dispatcher::RoundDispatcher;
use crate::engine::load::LoadTestController;
use crate::engine::stress::StressTestController;
use crate::engine::{EngineEvent, EngineStatus, RunOptions};
use crate::error::LoadprobeError;
use crate::http::request::RequestExecutor;
use crate::http::transport::Transport;
use crate::results::TestRun;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A handle to a run executing in a background task.
pub struct EngineHandle {
    /// Cancel token. Cancelling stops the run before its next round.
    pub cancel_token: CancellationToken,
    /// Current engine lifecycle state.
    pub status: Arc<RwLock<EngineStatus>>,
    task: JoinHandle<Result<TestRun, LoadprobeError>>,
}

/// Stop control detached from an [`EngineHandle`], usable while the handle
/// itself is being awaited.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel_token: CancellationToken,
    status: Arc<RwLock<EngineStatus>>,
}

impl StopHandle {
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }

    /// Request a graceful stop. The round in flight, if any, still completes.
    pub async fn stop(&self) {
        {
            let mut s = self.status.write().await;
            if *s == EngineStatus::Running {
                *s = EngineStatus::Stopping;
            }
        }
        self.cancel_token.cancel();
    }
}

impl EngineHandle {
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel_token: self.cancel_token.clone(),
            status: Arc::clone(&self.status),
        }
    }

    /// Request a graceful stop. The round in flight, if any, still completes.
    pub async fn stop(&self) {
        self.stop_handle().stop().await;
    }

    /// Wait for the run to finish and take its record.
    pub async fn wait(self) -> Result<TestRun, LoadprobeError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                *self.status.write().await = EngineStatus::Error;
                Err(LoadprobeError::Engine(format!("run task failed: {e}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `config` to completion with the controller its mode calls for.
pub async fn run_configuration<T: Transport>(
    config: &TestConfiguration,
    transport: T,
    executor: RequestExecutor,
    options: &RunOptions,
) -> Result<TestRun, LoadprobeError> {
    let dispatcher = RoundDispatcher::new(transport, executor);
    match &config.mode {
        TestMode::Load(_) => {
            LoadTestController::new(dispatcher)
                .run_with(config, options)
                .await
        }
        TestMode::Stress(_) => {
            StressTestController::new(dispatcher)
                .run_with(config, options)
                .await
        }
    }
}

/// Start a run asynchronously.
///
/// The configuration is validated up front; on success an [`EngineHandle`]
/// is returned immediately and the run proceeds in a background Tokio task.
pub fn spawn_test<T>(
    config: TestConfiguration,
    transport: T,
    executor: RequestExecutor,
    events: Option<mpsc::Sender<EngineEvent>>,
) -> Result<EngineHandle, LoadprobeError>
where
    T: Transport + 'static,
{
    ensure_valid(&config)?;

    let cancel_token = CancellationToken::new();
    let status = Arc::new(RwLock::new(EngineStatus::Running));

    let mut options = RunOptions::default().with_cancel(cancel_token.clone());
    if let Some(tx) = events {
        options = options.with_events(tx);
    }

    let task_status = Arc::clone(&status);
    let task = tokio::spawn(async move {
        let result = run_configuration(&config, transport, executor, &options).await;
        let final_status = match &result {
            Ok(_) => EngineStatus::Completed,
            Err(e) => {
                tracing::error!(error = %e, "run failed");
                EngineStatus::Error
            }
        };
        *task_status.write().await = final_status;
        result
    });

    Ok(EngineHandle {
        cancel_token,
        status,
        task,
    })
}
