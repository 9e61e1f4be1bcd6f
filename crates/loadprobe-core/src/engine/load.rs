use crate::config::{ensure_valid, LoadSettings, TestConfiguration, TestMode};
use crate::engine::dispatcher::RoundDispatcher;
use crate::engine::{pause_between_rounds, run_round, EngineEvent, RunOptions};
use crate::error::LoadprobeError;
use crate::http::transport::Transport;
use crate::results::{RunRecorder, Termination, TestRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Running { round_index: u32 },
    Completed,
}

/// Runs exactly `group_count` rounds of `group_size` concurrent requests,
/// whatever their success rate.
pub struct LoadTestController<T: Transport> {
    dispatcher: RoundDispatcher<T>,
}

impl<T: Transport> LoadTestController<T> {
    pub fn new(dispatcher: RoundDispatcher<T>) -> Self {
        Self { dispatcher }
    }

    pub async fn run(&self, config: &TestConfiguration) -> Result<TestRun, LoadprobeError> {
        self.run_with(config, &RunOptions::default()).await
    }

    /// Run with progress events and cancellation.
    ///
    /// The configuration is validated before any session is opened.
    pub async fn run_with(
        &self,
        config: &TestConfiguration,
        options: &RunOptions,
    ) -> Result<TestRun, LoadprobeError> {
        ensure_valid(config)?;
        let settings = load_settings(config)?;

        let mut recorder = RunRecorder::new(config.clone());
        tracing::info!(
            run_id = %recorder.run_id(),
            url = %config.target_url,
            group_size = settings.group_size,
            group_count = settings.group_count,
            "starting load test"
        );

        let mut state = LoadState::Running { round_index: 1 };
        let termination = loop {
            match state {
                LoadState::Running { round_index } => {
                    if options.cancel.is_cancelled() {
                        break Termination::Cancelled {
                            completed_rounds: round_index - 1,
                        };
                    }

                    let result = run_round(
                        &self.dispatcher,
                        options,
                        &config.target_url,
                        round_index,
                        settings.group_size,
                    )
                    .await?;
                    recorder.push(result)?;

                    if round_index >= settings.group_count {
                        state = LoadState::Completed;
                        continue;
                    }
                    if pause_between_rounds(settings.inter_round_delay, &options.cancel).await {
                        break Termination::Cancelled {
                            completed_rounds: round_index,
                        };
                    }
                    state = LoadState::Running {
                        round_index: round_index + 1,
                    };
                }
                LoadState::Completed => break Termination::Completed,
            }
        };

        tracing::info!(run_id = %recorder.run_id(), %termination, "load test finished");
        options
            .emit(EngineEvent::Finished {
                termination: termination.clone(),
            })
            .await;
        Ok(recorder.finish(termination))
    }
}

fn load_settings(config: &TestConfiguration) -> Result<&LoadSettings, LoadprobeError> {
    match &config.mode {
        TestMode::Load(settings) => Ok(settings),
        TestMode::Stress(_) => Err(LoadprobeError::Validation(
            "the load controller needs a load configuration, got stress".to_string(),
        )),
    }
}
