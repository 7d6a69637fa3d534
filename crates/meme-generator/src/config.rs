//! Generator configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use meme_media::compose::EncodeSettings;
use meme_media::download::{ClipWindow, DEFAULT_CLIP_LENGTH_SECS, DEFAULT_CLIP_START_SECS};

/// Concurrent fetches per job.
pub const DEFAULT_FETCH_POOL_SIZE: usize = 4;

/// Attempts per URL before giving up on it.
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;

/// Flat wait between failed attempts.
pub const DEFAULT_FETCH_RETRY_BACKOFF: Duration = Duration::from_secs(2);

pub const DEFAULT_TEMP_AUDIO_DIR: &str = "media/audio/temp_audio";
pub const DEFAULT_BACKGROUND_VIDEO: &str = "media/video/video.mp4";
pub const DEFAULT_OUTPUT_PATH: &str = "media/video/output_meme.mp4";

/// How the fetch stage schedules and retries work.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Maximum fetches in flight
    pub pool_size: usize,
    /// Attempts per URL, including the first
    pub max_attempts: u32,
    /// Wait between failed attempts (flat, not exponential)
    pub retry_backoff: Duration,
    /// Window cut out of each source
    pub clip_window: ClipWindow,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_FETCH_POOL_SIZE,
            max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_FETCH_RETRY_BACKOFF,
            clip_window: ClipWindow::default(),
        }
    }
}

impl FetchPolicy {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Shared directory for fetched clips, emptied after each job
    pub temp_audio_dir: PathBuf,
    /// Fixed background video
    pub background_video_path: PathBuf,
    /// Output file, overwritten by each job
    pub output_path: PathBuf,
    pub fetch: FetchPolicy,
    pub encode: EncodeSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temp_audio_dir: PathBuf::from(DEFAULT_TEMP_AUDIO_DIR),
            background_video_path: PathBuf::from(DEFAULT_BACKGROUND_VIDEO),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            fetch: FetchPolicy::default(),
            encode: EncodeSettings::default(),
        }
    }
}

impl GeneratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            temp_audio_dir: std::env::var("MEME_TEMP_AUDIO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_audio_dir),
            background_video_path: std::env::var("MEME_BACKGROUND_VIDEO")
                .map(PathBuf::from)
                .unwrap_or(defaults.background_video_path),
            output_path: std::env::var("MEME_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            fetch: FetchPolicy {
                clip_window: ClipWindow {
                    start_secs: env_or("MEME_CLIP_START_SECS", DEFAULT_CLIP_START_SECS),
                    length_secs: env_or("MEME_CLIP_LENGTH_SECS", DEFAULT_CLIP_LENGTH_SECS),
                },
                ..FetchPolicy::default()
            }
            .with_pool_size(env_or("MEME_FETCH_POOL_SIZE", DEFAULT_FETCH_POOL_SIZE))
            .with_max_attempts(env_or("MEME_FETCH_MAX_ATTEMPTS", DEFAULT_FETCH_MAX_ATTEMPTS))
            .with_retry_backoff(Duration::from_millis(env_or(
                "MEME_FETCH_RETRY_BACKOFF_MS",
                DEFAULT_FETCH_RETRY_BACKOFF.as_millis() as u64,
            ))),
            encode: EncodeSettings {
                timeout_secs: std::env::var("MEME_ENCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
                ..defaults.encode
            },
        }
    }

    /// Override the temp and output locations, keeping everything else.
    pub fn with_paths(
        mut self,
        temp_audio_dir: impl Into<PathBuf>,
        background_video_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        self.temp_audio_dir = temp_audio_dir.into();
        self.background_video_path = background_video_path.into();
        self.output_path = output_path.into();
        self
    }

    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
