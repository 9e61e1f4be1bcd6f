use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::request::{RequestOutcome, RequestStatus};

// ---------------------------------------------------------------------------
// RoundResult
// ---------------------------------------------------------------------------

/// Aggregated outcome of one round. All durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoundResult {
    /// 1-based, strictly increasing within a run.
    pub round_index: u32,
    /// Concurrency configured for this round.
    pub requested_count: u32,
    /// Durations of the requests that obtained a response.
    pub completed_durations: Vec<f64>,
    pub success_count: u32,
    pub http_error_count: u32,
    pub network_error_count: u32,
    /// `success_count / requested_count`.
    pub success_rate: f64,
    /// Sum of `completed_durations`.
    pub total_duration: f64,
    pub mean_duration: f64,
    /// Population standard deviation of `completed_durations`.
    pub std_dev_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Wall-clock span of the whole round, when measured by a controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_clock_duration: Option<f64>,
}

impl RoundResult {
    /// Attach the wall-clock span of the round.
    pub fn with_wall_clock(mut self, elapsed: Duration) -> Self {
        self.wall_clock_duration = Some(elapsed.as_secs_f64());
        self
    }

    /// Requests that did not succeed, whatever the reason.
    pub fn failure_count(&self) -> u32 {
        self.requested_count - self.success_count
    }

    /// Nearest-rank p-th percentile of `completed_durations`.
    ///
    /// `p` must be in the range (0.0, 100.0]. Returns 0 when nothing completed.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.completed_durations.is_empty() {
            return 0.0;
        }
        let mut sorted = self.completed_durations.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let idx = idx.saturating_sub(1).min(sorted.len() - 1);
        sorted[idx]
    }
}

// ---------------------------------------------------------------------------
// RoundAggregator
// ---------------------------------------------------------------------------

/// Accumulates the outcomes of a single round.
///
/// A fresh aggregator is created per round so nothing carries over between
/// rounds.
#[derive(Debug)]
pub struct RoundAggregator {
    round_index: u32,
    requested_count: u32,
    recorded: u32,
    success_count: u32,
    http_error_count: u32,
    network_error_count: u32,
    durations: Vec<f64>,
}

impl RoundAggregator {
    pub fn new(round_index: u32, requested_count: u32) -> Self {
        Self {
            round_index,
            requested_count,
            recorded: 0,
            success_count: 0,
            http_error_count: 0,
            network_error_count: 0,
            durations: Vec::with_capacity(requested_count as usize),
        }
    }

    /// Record one outcome. Outcomes beyond `requested_count` are ignored.
    pub fn record(&mut self, outcome: &RequestOutcome) {
        if self.recorded >= self.requested_count {
            tracing::warn!(
                round_index = self.round_index,
                requested = self.requested_count,
                "ignoring outcome beyond the requested count"
            );
            return;
        }
        self.recorded += 1;

        match outcome.status {
            RequestStatus::Success => self.success_count += 1,
            RequestStatus::HttpError { .. } => self.http_error_count += 1,
            RequestStatus::NetworkError { .. } => self.network_error_count += 1,
        }
        if let Some(duration) = outcome.duration {
            self.durations.push(duration);
        }
    }

    /// Reduce everything recorded into a [`RoundResult`].
    pub fn finish(self) -> RoundResult {
        let success_rate = if self.requested_count > 0 {
            self.success_count as f64 / self.requested_count as f64
        } else {
            0.0
        };

        let total: f64 = self.durations.iter().sum();
        let (mean, std_dev, min, max) = if self.durations.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = self.durations.len() as f64;
            let mean = total / n;
            let variance = self
                .durations
                .iter()
                .map(|d| (d - mean).powi(2))
                .sum::<f64>()
                / n;
            let min = self.durations.iter().copied().fold(f64::INFINITY, f64::min);
            let max = self.durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (mean, variance.sqrt(), min, max)
        };

        RoundResult {
            round_index: self.round_index,
            requested_count: self.requested_count,
            completed_durations: self.durations,
            success_count: self.success_count,
            http_error_count: self.http_error_count,
            network_error_count: self.network_error_count,
            success_rate,
            total_duration: total,
            mean_duration: mean,
            std_dev_duration: std_dev,
            min_duration: min,
            max_duration: max,
            wall_clock_duration: None,
        }
    }
}

/// Reduce a round's raw outcomes into a [`RoundResult`]. Pure.
pub fn summarize(
    round_index: u32,
    requested_count: u32,
    outcomes: &[RequestOutcome],
) -> RoundResult {
    let mut agg = RoundAggregator::new(round_index, requested_count);
    for outcome in outcomes {
        agg.record(outcome);
    }
    agg.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::NetworkErrorKind;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -----------------------------------------------------------------------
    // summarize
    // -----------------------------------------------------------------------

    #[test]
    fn all_successes_give_full_rate() {
        let outcomes: Vec<_> = (0..5).map(|_| RequestOutcome::success(0.1)).collect();
        let r = summarize(1, 5, &outcomes);

        assert_eq!(r.round_index, 1);
        assert_eq!(r.requested_count, 5);
        assert_eq!(r.success_count, 5);
        assert_eq!(r.success_rate, 1.0);
        assert_eq!(r.completed_durations.len(), 5);
        assert!(approx(r.total_duration, 0.5));
        assert!(approx(r.mean_duration, 0.1));
        assert!(approx(r.std_dev_duration, 0.0));
    }

    #[test]
    fn mixed_outcomes_are_counted_per_class() {
        let outcomes = vec![
            RequestOutcome::success(0.2),
            RequestOutcome::http_error(503, 0.4),
            RequestOutcome::network_error(NetworkErrorKind::Connect),
            RequestOutcome::success(0.6),
        ];
        let r = summarize(3, 4, &outcomes);

        assert_eq!(r.success_count, 2);
        assert_eq!(r.http_error_count, 1);
        assert_eq!(r.network_error_count, 1);
        assert_eq!(r.failure_count(), 2);
        assert_eq!(r.success_rate, 0.5);
        // The network error contributes no duration.
        assert_eq!(r.completed_durations, vec![0.2, 0.4, 0.6]);
        assert!(approx(r.total_duration, 1.2));
        assert!(approx(r.mean_duration, 0.4));
        assert!(approx(r.min_duration, 0.2));
        assert!(approx(r.max_duration, 0.6));
    }

    #[test]
    fn std_dev_is_population_not_sample() {
        // Population std dev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
        let outcomes: Vec<_> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .map(RequestOutcome::success)
            .collect();
        let r = summarize(1, 8, &outcomes);
        assert!(approx(r.mean_duration, 5.0));
        assert!(approx(r.std_dev_duration, 2.0));
    }

    #[test]
    fn no_durations_gives_zero_stats_not_nan() {
        let outcomes: Vec<_> = (0..10)
            .map(|_| RequestOutcome::network_error(NetworkErrorKind::Timeout))
            .collect();
        let r = summarize(2, 10, &outcomes);

        assert!(r.completed_durations.is_empty());
        assert_eq!(r.success_count, 0);
        assert_eq!(r.success_rate, 0.0);
        assert_eq!(r.total_duration, 0.0);
        assert_eq!(r.mean_duration, 0.0);
        assert_eq!(r.std_dev_duration, 0.0);
        assert_eq!(r.min_duration, 0.0);
        assert_eq!(r.max_duration, 0.0);
        assert!(!r.mean_duration.is_nan());
    }

    #[test]
    fn success_rate_is_exact_ratio() {
        let mut outcomes: Vec<_> = (0..1).map(|_| RequestOutcome::success(0.1)).collect();
        outcomes.extend((0..2).map(|_| RequestOutcome::http_error(500, 0.1)));
        let r = summarize(1, 3, &outcomes);
        assert_eq!(r.success_rate, 1.0 / 3.0);
    }

    #[test]
    fn outcomes_beyond_requested_count_are_ignored() {
        let outcomes: Vec<_> = (0..4).map(|_| RequestOutcome::success(0.1)).collect();
        let r = summarize(1, 2, &outcomes);
        assert_eq!(r.success_count, 2);
        assert_eq!(r.completed_durations.len(), 2);
        assert_eq!(r.success_rate, 1.0);
    }

    #[test]
    fn summarize_leaves_wall_clock_unset() {
        let r = summarize(1, 1, &[RequestOutcome::success(0.1)]);
        assert!(r.wall_clock_duration.is_none());
        let r = r.with_wall_clock(Duration::from_millis(1500));
        assert_eq!(r.wall_clock_duration, Some(1.5));
    }

    // -----------------------------------------------------------------------
    // percentile
    // -----------------------------------------------------------------------

    #[test]
    fn percentile_empty_returns_zero() {
        let r = summarize(1, 1, &[RequestOutcome::network_error(NetworkErrorKind::Other)]);
        assert_eq!(r.percentile(50.0), 0.0);
    }

    #[test]
    fn percentile_is_nearest_rank_and_order_independent() {
        let outcomes: Vec<_> = [0.9, 0.1, 0.5, 0.3, 0.7, 0.2, 0.4, 0.6, 0.8, 1.0]
            .into_iter()
            .map(RequestOutcome::success)
            .collect();
        let r = summarize(1, 10, &outcomes);
        assert_eq!(r.percentile(50.0), 0.5);
        assert_eq!(r.percentile(90.0), 0.9);
        assert_eq!(r.percentile(100.0), 1.0);
    }

    // -----------------------------------------------------------------------
    // serde
    // -----------------------------------------------------------------------

    #[test]
    fn wall_clock_is_omitted_when_unset() {
        let r = summarize(1, 1, &[RequestOutcome::success(0.25)]);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("wall_clock_duration").is_none());
        assert_eq!(json["success_rate"], 1.0);
    }
}
