use crate::config::{ensure_valid, StressSettings, TestConfiguration, TestMode};
use crate::engine::dispatcher::RoundDispatcher;
use crate::engine::{pause_between_rounds, run_round, EngineEvent, RunOptions};
use crate::error::LoadprobeError;
use crate::http::transport::Transport;
use crate::results::{RunRecorder, Termination, TestRun};

/// Escalation state. `Terminated` is only reachable through the success-rate
/// check; the round cap and cancellation leave the loop directly.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StressState {
    Escalating { round_index: u32, current_size: u32 },
    Terminated { round_index: u32, observed_rate: f64 },
}

/// Grows concurrency by `increment` every round until a round's success
/// rate falls strictly below `failure_threshold`.
pub struct StressTestController<T: Transport> {
    dispatcher: RoundDispatcher<T>,
}

impl<T: Transport> StressTestController<T> {
    pub fn new(dispatcher: RoundDispatcher<T>) -> Self {
        Self { dispatcher }
    }

    pub async fn run(&self, config: &TestConfiguration) -> Result<TestRun, LoadprobeError> {
        self.run_with(config, &RunOptions::default()).await
    }

    /// Run with progress events and cancellation.
    ///
    /// Without `max_rounds` the run only ends on a breach, a cancellation or
    /// an error opening a round's session.
    pub async fn run_with(
        &self,
        config: &TestConfiguration,
        options: &RunOptions,
    ) -> Result<TestRun, LoadprobeError> {
        ensure_valid(config)?;
        let settings = stress_settings(config)?;

        let mut recorder = RunRecorder::new(config.clone());
        tracing::info!(
            run_id = %recorder.run_id(),
            url = %config.target_url,
            initial_group_size = settings.initial_group_size,
            increment = settings.increment,
            failure_threshold = settings.failure_threshold,
            max_rounds = ?settings.max_rounds,
            "starting stress test"
        );

        let mut state = StressState::Escalating {
            round_index: 1,
            current_size: settings.initial_group_size,
        };
        let termination = loop {
            match state {
                StressState::Escalating {
                    round_index,
                    current_size,
                } => {
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
                        current_size,
                    )
                    .await?;
                    let observed_rate = result.success_rate;
                    recorder.push(result)?;

                    if observed_rate < settings.failure_threshold {
                        tracing::warn!(
                            round_index,
                            concurrency = current_size,
                            observed_rate,
                            threshold = settings.failure_threshold,
                            "success rate fell below threshold"
                        );
                        state = StressState::Terminated {
                            round_index,
                            observed_rate,
                        };
                        continue;
                    }

                    if settings.max_rounds.is_some_and(|max| round_index >= max) {
                        break Termination::RoundLimitReached {
                            rounds: round_index,
                        };
                    }

                    state = StressState::Escalating {
                        round_index: round_index + 1,
                        current_size: settings.group_size_for_round(round_index + 1),
                    };
                    if pause_between_rounds(settings.inter_round_delay, &options.cancel).await {
                        break Termination::Cancelled {
                            completed_rounds: round_index,
                        };
                    }
                }
                StressState::Terminated {
                    round_index,
                    observed_rate,
                } => {
                    break Termination::ThresholdBreached {
                        round_index,
                        observed_rate,
                    }
                }
            }
        };

        tracing::info!(run_id = %recorder.run_id(), %termination, "stress test finished");
        options
            .emit(EngineEvent::Finished {
                termination: termination.clone(),
            })
            .await;
        Ok(recorder.finish(termination))
    }
}

fn stress_settings(config: &TestConfiguration) -> Result<&StressSettings, LoadprobeError> {
    match &config.mode {
        TestMode::Stress(settings) => Ok(settings),
        TestMode::Load(_) => Err(LoadprobeError::Validation(
            "the stress controller needs a stress configuration, got load".to_string(),
        )),
    }
}
