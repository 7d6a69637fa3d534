//! In-process fetch and composition doubles for pipeline tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use meme_media::{MediaError, MediaResult};
use meme_models::{AudioClip, CompositionJob, FetchRequest};

use crate::compose::Compositor;
use crate::fetch::ClipFetcher;

/// Behaviour of one scripted URL.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    delay: Duration,
    failures_before_success: u32,
    panics: bool,
}

impl Script {
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    pub(crate) fn always_fail() -> Self {
        Self {
            failures_before_success: u32::MAX,
            ..Self::default()
        }
    }

    pub(crate) fn panics() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub(crate) fn fail_first(mut self, n: u32) -> Self {
        self.failures_before_success = n;
        self
    }

    pub(crate) fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

/// Fetcher whose per-URL latency and failures are scripted.
///
/// Successful clips are named `<url>.mp3` and last 2.5 seconds. When an
/// artifact directory is set, every attempt drops a file there the way the
/// real fetcher does.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    artifact_dir: Option<PathBuf>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub(crate) fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub(crate) fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<AudioClip> {
        let script = self.scripts.get(&request.url).cloned().unwrap_or_default();

        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(request.url.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(dir) = &self.artifact_dir {
            let name = format!("{}-{}.mp3", request.index, attempt);
            tokio::fs::write(dir.join(name), b"audio").await?;
        }

        tokio::time::sleep(script.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if script.panics {
            panic!("scripted panic for {}", request.url);
        }

        if attempt <= script.failures_before_success {
            return Err(MediaError::download_failed(format!(
                "scripted failure {} for {}",
                attempt, request.url
            )));
        }

        Ok(AudioClip::new(format!("{}.mp3", request.url), 2.5))
    }
}

/// Compositor that records jobs and writes a stub output file.
///
/// The file holds `video:<first clip path>` so concurrent jobs can tell their
/// outputs apart.
#[derive(Debug, Default)]
pub(crate) struct RecordingCompositor {
    fail: bool,
    jobs: Mutex<Vec<CompositionJob>>,
}

impl RecordingCompositor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn output_for(job: &CompositionJob) -> Vec<u8> {
        let first = job
            .clips
            .timeline()
            .first()
            .map(|p| p.clip.path.display().to_string())
            .unwrap_or_default();
        format!("video:{}", first).into_bytes()
    }

    pub(crate) fn jobs(&self) -> Vec<CompositionJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Compositor for RecordingCompositor {
    async fn compose(&self, job: &CompositionJob) -> MediaResult<()> {
        self.jobs.lock().unwrap().push(job.clone());

        if self.fail {
            return Err(MediaError::ffmpeg_failed("scripted encode failure", None, Some(1)));
        }

        tokio::fs::write(&job.output_path, Self::output_for(job)).await?;
        Ok(())
    }
}
