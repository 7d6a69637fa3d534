//! Stage timing diagnostics.

use std::time::{Duration, Instant};

/// One recorded stage boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingEntry {
    pub stage: String,
    /// Seconds since the log was started
    pub absolute_secs: f64,
    /// Seconds since the previous entry (or the start)
    pub relative_secs: f64,
}

/// Append-only record of when each stage of a job finished.
#[derive(Debug, Clone)]
pub struct TimingLog {
    started_at: Instant,
    last_at: Instant,
    entries: Vec<TimingEntry>,
}

impl Default for TimingLog {
    fn default() -> Self {
        Self::start()
    }
}

impl TimingLog {
    /// Start a log at the current instant.
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(started_at: Instant) -> Self {
        Self {
            started_at,
            last_at: started_at,
            entries: Vec::new(),
        }
    }

    /// Record a stage at the current instant.
    pub fn record(&mut self, stage: impl Into<String>) {
        self.record_at(stage, Instant::now());
    }

    pub fn record_at(&mut self, stage: impl Into<String>, at: Instant) {
        // Instants earlier than the previous entry clamp to zero
        let absolute = at.saturating_duration_since(self.started_at);
        let relative = at.saturating_duration_since(self.last_at);

        self.entries.push(TimingEntry {
            stage: stage.into(),
            absolute_secs: absolute.as_secs_f64(),
            relative_secs: relative.as_secs_f64(),
        });
        self.last_at = self.last_at.max(at);
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    /// Time elapsed since the log was started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Render the log as aligned text lines.
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{:<36} - Absolute: {:.2}s, Relative: {:.2}s",
                    e.stage, e.absolute_secs, e.relative_secs
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_and_relative_times() {
        let t0 = Instant::now();
        let mut log = TimingLog::start_at(t0);

        log.record_at("fetched", t0 + Duration::from_millis(1500));
        log.record_at("composed", t0 + Duration::from_millis(4000));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].absolute_secs - 1.5).abs() < 1e-9);
        assert!((entries[0].relative_secs - 1.5).abs() < 1e-9);
        assert!((entries[1].absolute_secs - 4.0).abs() < 1e-9);
        assert!((entries[1].relative_secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut log = TimingLog::start();
        log.record("one");
        log.record("two");
        log.record("three");

        let stages: Vec<_> = log.entries().iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(stages, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_render_format() {
        let t0 = Instant::now();
        let mut log = TimingLog::start_at(t0);
        log.record_at("Finished downloading", t0 + Duration::from_millis(2250));

        let lines = log.render();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Finished downloading"));
        assert!(lines[0].ends_with("Absolute: 2.25s, Relative: 2.25s"));
    }
}
