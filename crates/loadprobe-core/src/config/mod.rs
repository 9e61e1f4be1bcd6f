pub mod io;
pub mod validation;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use io::{read_configuration, write_configuration};
pub use validation::{ensure_valid, validate_configuration};

/// Success-rate fraction below which a stress test stops escalating.
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// TestConfiguration
// ---------------------------------------------------------------------------

/// Immutable input to a single run.
///
/// A copy is stored in the resulting [`crate::results::TestRun`], so the
/// record always describes the exact shape it was produced under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TestConfiguration {
    /// Endpoint every request is sent to with a plain GET.
    pub target_url: String,
    /// Load or stress parameters.
    pub mode: TestMode,
}

/// Which controller a configuration is meant for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestMode {
    /// Fixed concurrency repeated over a fixed number of rounds.
    Load(LoadSettings),
    /// Concurrency escalated round over round until the success rate drops.
    Stress(StressSettings),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadSettings {
    /// Requests dispatched concurrently in every round.
    pub group_size: u32,
    /// Number of rounds to run.
    pub group_count: u32,
    #[serde(rename = "inter_round_delay_ms", with = "duration_ms", default)]
    pub inter_round_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StressSettings {
    /// Concurrency of the first round.
    pub initial_group_size: u32,
    /// Added to the concurrency after every round that stays above threshold.
    pub increment: u32,
    #[serde(rename = "inter_round_delay_ms", with = "duration_ms", default)]
    pub inter_round_delay: Duration,
    /// A round strictly below this success rate ends the run.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    /// Optional safety cap on the number of rounds. `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

fn default_failure_threshold() -> f64 {
    DEFAULT_FAILURE_THRESHOLD
}

impl LoadSettings {
    pub fn new(group_size: u32, group_count: u32) -> Self {
        Self {
            group_size,
            group_count,
            inter_round_delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_round_delay = delay;
        self
    }
}

impl StressSettings {
    pub fn new(initial_group_size: u32, increment: u32) -> Self {
        Self {
            initial_group_size,
            increment,
            inter_round_delay: Duration::ZERO,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            max_rounds: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_round_delay = delay;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Concurrency of the round at 1-based `round_index`.
    ///
    /// Saturates instead of overflowing on absurdly long runs.
    pub fn group_size_for_round(&self, round_index: u32) -> u32 {
        let steps = round_index.saturating_sub(1);
        self.initial_group_size
            .saturating_add(self.increment.saturating_mul(steps))
    }
}

impl TestConfiguration {
    pub fn load(target_url: impl Into<String>, settings: LoadSettings) -> Self {
        Self {
            target_url: target_url.into(),
            mode: TestMode::Load(settings),
        }
    }

    pub fn stress(target_url: impl Into<String>, settings: StressSettings) -> Self {
        Self {
            target_url: target_url.into(),
            mode: TestMode::Stress(settings),
        }
    }

    pub fn inter_round_delay(&self) -> Duration {
        match &self.mode {
            TestMode::Load(s) => s.inter_round_delay,
            TestMode::Stress(s) => s.inter_round_delay,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            TestMode::Load(_) => "load",
            TestMode::Stress(_) => "stress",
        }
    }
}

// ---------------------------------------------------------------------------
// Duration <-> integer milliseconds
// ---------------------------------------------------------------------------

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
