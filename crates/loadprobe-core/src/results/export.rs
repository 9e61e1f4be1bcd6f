use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde::Serialize;

use super::{Consistency, LatencyClass, TestRun};
use crate::config::TestMode;
use crate::error::LoadprobeError;

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Export a run as pretty-printed JSON.
pub fn export_json(run: &TestRun) -> Result<String, LoadprobeError> {
    Ok(serde_json::to_string_pretty(run)?)
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

const CSV_HEADER: [&str; 10] = [
    "round",
    "requested",
    "succeeded",
    "success_rate",
    "total_s",
    "mean_s",
    "std_dev_s",
    "min_s",
    "max_s",
    "wall_clock_s",
];

#[derive(Serialize)]
struct CsvRow {
    round: u32,
    requested: u32,
    succeeded: u32,
    success_rate: f64,
    total_s: f64,
    mean_s: f64,
    std_dev_s: f64,
    min_s: f64,
    max_s: f64,
    wall_clock_s: Option<f64>,
}

/// Export one row per round. The header is always present, even for a run
/// without rounds.
pub fn export_csv(run: &TestRun) -> Result<String, LoadprobeError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for r in run.rounds() {
        writer.serialize(CsvRow {
            round: r.round_index,
            requested: r.requested_count,
            succeeded: r.success_count,
            success_rate: r.success_rate,
            total_s: r.total_duration,
            mean_s: r.mean_duration,
            std_dev_s: r.std_dev_duration,
            min_s: r.min_duration,
            max_s: r.max_duration,
            wall_clock_s: r.wall_clock_duration,
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LoadprobeError::Internal(format!("CSV buffer flush failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| LoadprobeError::Internal(format!("CSV output is not UTF-8: {e}")))
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Render a run as a plain-text report: header, per-round table, outcome
/// and run-level verdicts.
pub fn render_text(run: &TestRun) -> String {
    let config = run.configuration();
    let analysis = run.analysis();
    let mut out = String::new();

    let title = match &config.mode {
        TestMode::Load(s) => format!(
            "Load test: {} rounds of {} requests",
            s.group_count, s.group_size
        ),
        TestMode::Stress(s) => format!(
            "Stress test: from {} requests, +{} per round, stop below {:.0}% success",
            s.initial_group_size,
            s.increment,
            s.failure_threshold * 100.0
        ),
    };
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "Target:   {}", config.target_url);
    let _ = writeln!(out, "Run ID:   {}", run.run_id().hyphenated());
    let _ = writeln!(
        out,
        "Started:  {}",
        run.started_at().to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(
        out,
        "Finished: {}",
        run.finished_at().to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    out.push('\n');

    let _ = writeln!(
        out,
        "{:>5}  {:>9}  {:>9}  {:>8}  {:>9}  {:>11}  {:>9}  {:>11}",
        "Round",
        "Requested",
        "Succeeded",
        "Rate",
        "Mean (s)",
        "Std dev (s)",
        "Total (s)",
        "Elapsed (s)"
    );
    for r in run.rounds() {
        let elapsed = r
            .wall_clock_duration
            .map(|w| format!("{w:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>5}  {:>9}  {:>9}  {:>7.2}%  {:>9.3}  {:>11.3}  {:>9.3}  {:>11}",
            r.round_index,
            r.requested_count,
            r.success_count,
            r.success_rate * 100.0,
            r.mean_duration,
            r.std_dev_duration,
            r.total_duration,
            elapsed,
        );
    }
    out.push('\n');

    let _ = writeln!(out, "Outcome: {}", run.termination());
    let _ = writeln!(
        out,
        "Requests: {} sent, {} succeeded",
        analysis.total_requests, analysis.total_successes
    );
    let latency = match analysis.latency {
        LatencyClass::Low => "low latency",
        LatencyClass::Moderate => "moderate latency",
        LatencyClass::High => "high latency",
    };
    let _ = writeln!(
        out,
        "Mean response time: {:.3} s ({latency})",
        analysis.overall_mean_duration
    );
    let consistency = match analysis.consistency {
        Consistency::Stable => "stable",
        Consistency::Unstable => "unstable",
    };
    let _ = writeln!(
        out,
        "Mean standard deviation: {:.3} s ({consistency})",
        analysis.overall_std_dev
    );
    let _ = writeln!(out, "Success rates: {}", analysis.success_band.describe());
    if let Some(round) = analysis.first_degraded_round {
        let _ = writeln!(out, "First round below 100% success: {round}");
    }

    out
}
