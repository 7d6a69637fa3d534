//! Per-job structured logging.

use tracing::{error, info, warn, Span};

use meme_models::{JobId, TimingLog};

/// Logs meme job lifecycle events with the job id and stage attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Meme job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Meme job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = %self.operation, "Meme job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, "Meme job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "Meme job completed: {}", message);
    }

    /// Emit the stage timing table, one line per recorded stage.
    pub fn log_timings(&self, timings: &TimingLog) {
        for line in timings.render() {
            info!(job_id = %self.job_id, operation = %self.operation, "{}", line);
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping every event of one job, including those emitted by the
    /// fetch tasks and the encoder.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("meme_job", job_id = %self.job_id, operation = %self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_carries_job_context() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "generate_meme");

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.operation(), "generate_meme");
    }
}
