pub mod analysis;
pub mod export;
pub mod io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TestConfiguration;
use crate::engine::aggregator::RoundResult;
use crate::error::LoadprobeError;

pub use analysis::{Consistency, LatencyClass, RunAnalysis, SuccessBand};

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// A load test ran its full round budget.
    Completed,
    /// A stress round's success rate fell strictly below the threshold.
    ThresholdBreached { round_index: u32, observed_rate: f64 },
    /// A stress test hit its configured `max_rounds` without breaching.
    RoundLimitReached { rounds: u32 },
    /// Cancelled between rounds.
    Cancelled { completed_rounds: u32 },
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed all rounds"),
            Termination::ThresholdBreached {
                round_index,
                observed_rate,
            } => write!(
                f,
                "success rate fell to {:.2}% in round {round_index}",
                observed_rate * 100.0
            ),
            Termination::RoundLimitReached { rounds } => {
                write!(f, "reached the limit of {rounds} rounds without breaching")
            }
            Termination::Cancelled { completed_rounds } => {
                write!(f, "cancelled after {completed_rounds} rounds")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TestRun
// ---------------------------------------------------------------------------

/// The complete, immutable record of one execution.
///
/// Only [`RunRecorder::finish`] creates one; consumers read it through the
/// accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TestRun {
    run_id: Uuid,
    configuration: TestConfiguration,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    rounds: Vec<RoundResult>,
    termination: Termination,
}

impl TestRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn configuration(&self) -> &TestConfiguration {
        &self.configuration
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Rounds in `round_index` order.
    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    pub fn total_requests(&self) -> u64 {
        self.rounds.iter().map(|r| r.requested_count as u64).sum()
    }

    pub fn total_successes(&self) -> u64 {
        self.rounds.iter().map(|r| r.success_count as u64).sum()
    }

    pub fn analysis(&self) -> RunAnalysis {
        RunAnalysis::from_run(self)
    }
}

// ---------------------------------------------------------------------------
// RunRecorder
// ---------------------------------------------------------------------------

/// Accumulating handle owned by a controller while a run is in progress.
pub struct RunRecorder {
    run_id: Uuid,
    configuration: TestConfiguration,
    started_at: DateTime<Utc>,
    rounds: Vec<RoundResult>,
}

impl RunRecorder {
    pub fn new(configuration: TestConfiguration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            configuration,
            started_at: Utc::now(),
            rounds: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Index the next appended round must carry.
    pub fn next_round_index(&self) -> u32 {
        self.rounds.len() as u32 + 1
    }

    /// Append a completed round. Rounds must arrive as 1, 2, 3, ...
    pub fn push(&mut self, round: RoundResult) -> Result<(), LoadprobeError> {
        let expected = self.next_round_index();
        if round.round_index != expected {
            return Err(LoadprobeError::Internal(format!(
                "round {} recorded out of order (expected {expected})",
                round.round_index
            )));
        }
        self.rounds.push(round);
        Ok(())
    }

    /// Seal the record.
    pub fn finish(self, termination: Termination) -> TestRun {
        TestRun {
            run_id: self.run_id,
            configuration: self.configuration,
            started_at: self.started_at,
            finished_at: Utc::now(),
            rounds: self.rounds,
            termination,
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::{LoadSettings, StressSettings};
    use crate::engine::aggregator::summarize;
    use crate::http::request::{NetworkErrorKind, RequestOutcome};

    /// A round of `requested` requests of which `succeeded` took `latency`
    /// seconds and the rest failed at the network level.
    pub fn round(index: u32, requested: u32, succeeded: u32, latency: f64) -> RoundResult {
        let mut outcomes: Vec<_> = (0..succeeded)
            .map(|_| RequestOutcome::success(latency))
            .collect();
        outcomes.extend(
            (succeeded..requested)
                .map(|_| RequestOutcome::network_error(NetworkErrorKind::Timeout)),
        );
        summarize(index, requested, &outcomes)
    }

    pub fn load_run(rounds: Vec<RoundResult>) -> TestRun {
        let group_size = rounds.first().map(|r| r.requested_count).unwrap_or(1);
        let config = TestConfiguration::load(
            "http://example.com/api",
            LoadSettings::new(group_size, rounds.len().max(1) as u32),
        );
        let mut recorder = RunRecorder::new(config);
        for r in rounds {
            recorder.push(r).expect("fixture rounds are ordered");
        }
        recorder.finish(Termination::Completed)
    }

    pub fn stress_run(rounds: Vec<RoundResult>, termination: Termination) -> TestRun {
        let config =
            TestConfiguration::stress("http://example.com/api", StressSettings::new(10, 10));
        let mut recorder = RunRecorder::new(config);
        for r in rounds {
            recorder.push(r).expect("fixture rounds are ordered");
        }
        recorder.finish(termination)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
