use serde::{Deserialize, Serialize};

use super::TestRun;

/// Mean latency at or above which a run counts as moderate (seconds).
pub const MODERATE_LATENCY_SECS: f64 = 0.5;
/// Mean latency at or above which a run counts as high (seconds).
pub const HIGH_LATENCY_SECS: f64 = 1.0;
/// Largest mean standard deviation still considered stable (seconds).
pub const STABLE_STD_DEV_SECS: f64 = 0.1;
/// Rounds at or above this success rate are healthy.
pub const HEALTHY_SUCCESS_RATE: f64 = 0.8;
/// Rounds below this success rate are failing.
pub const FAILING_SUCCESS_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    Low,
    Moderate,
    High,
}

impl LatencyClass {
    pub fn classify(mean_secs: f64) -> Self {
        if mean_secs < MODERATE_LATENCY_SECS {
            LatencyClass::Low
        } else if mean_secs < HIGH_LATENCY_SECS {
            LatencyClass::Moderate
        } else {
            LatencyClass::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Stable,
    Unstable,
}

impl Consistency {
    pub fn classify(mean_std_dev_secs: f64) -> Self {
        if mean_std_dev_secs <= STABLE_STD_DEV_SECS {
            Consistency::Stable
        } else {
            Consistency::Unstable
        }
    }
}

/// Verdict over every round's success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessBand {
    /// Every round at or above 80%.
    AllHealthy,
    /// Every round below 50%.
    AllFailing,
    /// At least one round below 50%.
    SomeFailing,
    /// Every round between 50% and 80%.
    AllDegraded,
    /// At least one round between 50% and 80%, none below.
    SomeDegraded,
}

impl SuccessBand {
    /// Checked in order: all healthy, all failing, some failing, all
    /// degraded, some degraded.
    pub fn classify(rates: &[f64]) -> Self {
        let degraded = |r: f64| (FAILING_SUCCESS_RATE..HEALTHY_SUCCESS_RATE).contains(&r);
        let failing = |r: f64| r < FAILING_SUCCESS_RATE;

        if rates.iter().all(|&r| r >= HEALTHY_SUCCESS_RATE) {
            SuccessBand::AllHealthy
        } else if rates.iter().all(|&r| failing(r)) {
            SuccessBand::AllFailing
        } else if rates.iter().any(|&r| failing(r)) {
            SuccessBand::SomeFailing
        } else if rates.iter().all(|&r| degraded(r)) {
            SuccessBand::AllDegraded
        } else {
            SuccessBand::SomeDegraded
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SuccessBand::AllHealthy => "all rounds succeeded for at least 80% of requests",
            SuccessBand::AllFailing => "all rounds succeeded for under 50% of requests",
            SuccessBand::SomeFailing => "some rounds succeeded for under 50% of requests",
            SuccessBand::AllDegraded => {
                "all rounds succeeded for between 50% and 80% of requests"
            }
            SuccessBand::SomeDegraded => {
                "some rounds succeeded for between 50% and 80% of requests"
            }
        }
    }
}

/// Run-level verdicts derived from a finished [`TestRun`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunAnalysis {
    pub rounds: u32,
    pub total_requests: u64,
    pub total_successes: u64,
    /// Mean of the per-round mean durations.
    pub overall_mean_duration: f64,
    /// Mean of the per-round standard deviations.
    pub overall_std_dev: f64,
    pub latency: LatencyClass,
    pub consistency: Consistency,
    pub success_band: SuccessBand,
    /// First round whose success rate was below 100%.
    pub first_degraded_round: Option<u32>,
    /// Running total of successes after each round.
    pub cumulative_successes: Vec<u64>,
}

impl RunAnalysis {
    pub fn from_run(run: &TestRun) -> Self {
        let rounds = run.rounds();
        let n = rounds.len();

        let (overall_mean_duration, overall_std_dev) = if n == 0 {
            (0.0, 0.0)
        } else {
            let means: f64 = rounds.iter().map(|r| r.mean_duration).sum();
            let devs: f64 = rounds.iter().map(|r| r.std_dev_duration).sum();
            (means / n as f64, devs / n as f64)
        };

        let rates: Vec<f64> = rounds.iter().map(|r| r.success_rate).collect();

        let cumulative_successes = rounds
            .iter()
            .scan(0u64, |total, r| {
                *total += r.success_count as u64;
                Some(*total)
            })
            .collect();

        Self {
            rounds: n as u32,
            total_requests: run.total_requests(),
            total_successes: run.total_successes(),
            overall_mean_duration,
            overall_std_dev,
            latency: LatencyClass::classify(overall_mean_duration),
            consistency: Consistency::classify(overall_std_dev),
            success_band: SuccessBand::classify(&rates),
            first_degraded_round: rounds
                .iter()
                .find(|r| r.success_rate < 1.0)
                .map(|r| r.round_index),
            cumulative_successes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::fixtures::{load_run, round, stress_run};
    use crate::results::Termination;

    #[test]
    fn latency_boundaries() {
        assert_eq!(LatencyClass::classify(0.0), LatencyClass::Low);
        assert_eq!(LatencyClass::classify(0.499), LatencyClass::Low);
        assert_eq!(LatencyClass::classify(0.5), LatencyClass::Moderate);
        assert_eq!(LatencyClass::classify(0.999), LatencyClass::Moderate);
        assert_eq!(LatencyClass::classify(1.0), LatencyClass::High);
    }

    #[test]
    fn consistency_boundary_is_inclusive() {
        assert_eq!(Consistency::classify(0.1), Consistency::Stable);
        assert_eq!(Consistency::classify(0.1001), Consistency::Unstable);
    }

    #[test]
    fn success_band_verdicts() {
        assert_eq!(SuccessBand::classify(&[1.0, 0.8, 0.95]), SuccessBand::AllHealthy);
        assert_eq!(SuccessBand::classify(&[0.1, 0.0]), SuccessBand::AllFailing);
        assert_eq!(SuccessBand::classify(&[1.0, 0.6, 0.2]), SuccessBand::SomeFailing);
        assert_eq!(SuccessBand::classify(&[0.5, 0.79]), SuccessBand::AllDegraded);
        assert_eq!(SuccessBand::classify(&[1.0, 0.7]), SuccessBand::SomeDegraded);
    }

    #[test]
    fn success_band_of_no_rounds_is_healthy() {
        assert_eq!(SuccessBand::classify(&[]), SuccessBand::AllHealthy);
    }

    #[test]
    fn analysis_of_empty_run() {
        let a = load_run(Vec::new()).analysis();
        assert_eq!(a.rounds, 0);
        assert_eq!(a.overall_mean_duration, 0.0);
        assert_eq!(a.latency, LatencyClass::Low);
        assert_eq!(a.consistency, Consistency::Stable);
        assert_eq!(a.success_band, SuccessBand::AllHealthy);
        assert!(a.first_degraded_round.is_none());
        assert!(a.cumulative_successes.is_empty());
    }

    #[test]
    fn analysis_averages_round_means() {
        let run = load_run(vec![
            round(1, 4, 4, 0.25),
            round(2, 4, 4, 0.5),
            round(3, 4, 4, 0.75),
        ]);
        let a = RunAnalysis::from_run(&run);
        assert_eq!(a.overall_mean_duration, 0.5);
        assert_eq!(a.latency, LatencyClass::Moderate);
        assert_eq!(a.overall_std_dev, 0.0);
        assert_eq!(a.consistency, Consistency::Stable);
        assert_eq!(a.total_requests, 12);
        assert_eq!(a.total_successes, 12);
    }

    #[test]
    fn analysis_tracks_first_degraded_round_and_cumulative_successes() {
        let run = stress_run(
            vec![
                round(1, 10, 10, 0.1),
                round(2, 20, 20, 0.1),
                round(3, 30, 27, 0.1),
                round(4, 40, 10, 0.1),
            ],
            Termination::ThresholdBreached {
                round_index: 4,
                observed_rate: 0.25,
            },
        );
        let a = run.analysis();
        assert_eq!(a.first_degraded_round, Some(3));
        assert_eq!(a.cumulative_successes, vec![10, 30, 57, 67]);
        assert_eq!(a.success_band, SuccessBand::SomeFailing);
    }
}
