//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use metrics::{counter, histogram};

pub mod names {
    pub const FETCH_ATTEMPT_FAILURES_TOTAL: &str = "meme_fetch_attempt_failures_total";
    pub const CLIPS_FETCHED_TOTAL: &str = "meme_clips_fetched_total";
    pub const CLIPS_DROPPED_TOTAL: &str = "meme_clips_dropped_total";
    pub const GENERATIONS_TOTAL: &str = "meme_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "meme_generation_duration_seconds";
    pub const COMPOSE_DURATION_SECONDS: &str = "meme_compose_duration_seconds";
    pub const CLEANUP_FAILURES_TOTAL: &str = "meme_cleanup_failures_total";
}

/// Record one failed fetch attempt.
pub fn record_fetch_attempt_failed(missing_tool: bool) {
    let reason = if missing_tool { "missing_tool" } else { "download" };
    counter!(names::FETCH_ATTEMPT_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Record how many clips a fetch stage produced and how many it lost.
pub fn record_fetch_stage(fetched: usize, required: usize) {
    counter!(names::CLIPS_FETCHED_TOTAL).increment(fetched as u64);
    counter!(names::CLIPS_DROPPED_TOTAL).increment(required.saturating_sub(fetched) as u64);
}

/// Record a finished job. `outcome` is one of `done`, `aborted` or `failed`.
pub fn record_generation(outcome: &'static str, duration_secs: f64) {
    counter!(names::GENERATIONS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

pub fn record_compose_duration(duration_secs: f64) {
    histogram!(names::COMPOSE_DURATION_SECONDS).record(duration_secs);
}

pub fn record_cleanup_failures(count: usize) {
    if count > 0 {
        counter!(names::CLEANUP_FAILURES_TOTAL).increment(count as u64);
    }
}
