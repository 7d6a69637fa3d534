//! Fetch-and-retry stage.
//!
//! Every URL gets its own task on a bounded pool. Tasks retry independently
//! and report over a completion channel; results are slotted by submission
//! index so the final order never depends on which fetch finished first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use meme_media::download::{download_audio_clip, ClipWindow};
use meme_media::{probe_media, MediaError, MediaResult};
use meme_models::{AudioClip, ClipSlots, FetchRequest, FetchResult, OrderedClipSet};

use crate::config::FetchPolicy;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Source of audio clips. One call is one attempt; retries happen around it.
#[async_trait]
pub trait ClipFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<AudioClip>;
}

/// Fetches clips with yt-dlp into a shared directory and probes them.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    output_dir: PathBuf,
    window: ClipWindow,
}

impl YtDlpFetcher {
    pub fn new(output_dir: impl AsRef<Path>, window: ClipWindow) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            window,
        }
    }
}

#[async_trait]
impl ClipFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<AudioClip> {
        let path =
            download_audio_clip(&request.url, request.index, &self.window, &self.output_dir)
                .await?;

        // A clip that cannot be probed cannot be placed on the timeline
        let info = probe_media(&path).await?;
        if !info.has_audio() {
            return Err(MediaError::invalid_media(format!(
                "{} has no audio stream",
                path.display()
            )));
        }

        Ok(AudioClip::new(path, info.duration))
    }
}

/// Fetch one clip per URL and return the successes in input order.
///
/// Never fails: a URL whose attempts are all exhausted (or whose task
/// panics) simply contributes nothing. Returns once every task has settled.
pub async fn fetch_clips(
    fetcher: Arc<dyn ClipFetcher>,
    urls: &[String],
    policy: &FetchPolicy,
) -> OrderedClipSet {
    let requests = FetchRequest::from_urls(urls);
    let total = requests.len();

    let pool = Arc::new(Semaphore::new(policy.pool_size.max(1)));
    let (tx, mut rx) = mpsc::channel::<FetchResult>(total.max(1));
    let retry = RetryConfig::new("fetch_clip")
        .with_max_attempts(policy.max_attempts)
        .with_backoff(policy.retry_backoff);

    let mut tasks = JoinSet::new();
    for request in requests {
        let fetcher = Arc::clone(&fetcher);
        let pool = Arc::clone(&pool);
        let retry = retry.clone();
        let tx = tx.clone();

        tasks.spawn(async move {
            let index = request.index;
            let result = match pool.acquire().await {
                Ok(_permit) => fetch_with_retry(fetcher.as_ref(), &request, &retry).await,
                Err(_) => FetchResult { index, clip: None },
            };

            if tx.send(result).await.is_err() {
                warn!(index, "Fetch result receiver dropped");
            }
        }
        .in_current_span());
    }
    drop(tx);

    // Completion order; each result lands in its submission slot
    let mut slots = ClipSlots::new(total);
    while let Some(result) = rx.recv().await {
        debug!(index = result.index, fetched = result.clip.is_some(), "Fetch settled");
        slots.fill(result);
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Fetch task aborted: {}", e);
        }
    }

    let missing = slots.missing_indices();
    if !missing.is_empty() {
        warn!(
            fetched = slots.filled(),
            required = total,
            missing = ?missing,
            "Some audio clips failed to download"
        );
    }

    slots.compact()
}

async fn fetch_with_retry(
    fetcher: &dyn ClipFetcher,
    request: &FetchRequest,
    retry: &RetryConfig,
) -> FetchResult {
    let outcome = retry_async(retry, |attempt| async move {
        let result = fetcher.fetch(request).await;
        if let Err(e) = &result {
            metrics::record_fetch_attempt_failed(e.is_missing_tool());
            debug!(index = request.index, attempt, "Fetch attempt failed: {}", e);
        }
        result
    })
    .await;

    match outcome {
        RetryResult::Success { value, attempts } => {
            info!(
                index = request.index,
                attempts,
                duration_secs = value.duration_secs,
                "Fetched audio clip"
            );
            FetchResult {
                index: request.index,
                clip: Some(value),
            }
        }
        RetryResult::Failed { error, attempts } => {
            error!(
                index = request.index,
                url = %request.url,
                attempts,
                "Max retries reached, skipping URL: {}",
                error
            );
            FetchResult {
                index: request.index,
                clip: None,
            }
        }
    }
}
