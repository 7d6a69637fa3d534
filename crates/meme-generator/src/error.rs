//! Generator error types.

use thiserror::Error;

pub type GenerateResult<T> = Result<T, GenerateError>;

/// Failures that end a generation job.
///
/// Per-URL fetch failures and cleanup failures never appear here: they are
/// absorbed and logged inside the pipeline.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Composition failed: {0}")]
    Composition(#[source] meme_media::MediaError),

    #[error("Setup failed: {0}")]
    Setup(#[source] meme_media::MediaError),

    #[error("Could not read output video: {0}")]
    Output(#[source] std::io::Error),

    #[error("Generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GenerateError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the caller sent a bad request, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GenerateError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meme_media::MediaError;

    #[test]
    fn test_composition_error_message_includes_cause() {
        let err = GenerateError::Composition(MediaError::FfmpegNotFound);
        assert_eq!(err.to_string(), "Composition failed: FFmpeg not found in PATH");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_invalid_input_is_client_error() {
        assert!(GenerateError::invalid_input("Exactly 4 URLs are required").is_client_error());
    }
}
