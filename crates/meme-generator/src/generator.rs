//! Job orchestration: fetch, compose, clean up.
//!
//! One call to [`MemeGenerator::generate`] walks
//! `Start -> Fetching -> (CompleteFetch | PartialFetch)`, then either
//! `Composing -> Done` or `Aborted`, and always finishes with
//! `Cleanup -> End`. Every transition is stamped into the job's
//! [`TimingLog`], which is logged once the job ends.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, Instrument};

use meme_media::{clean_directory, ensure_dir, ensure_parent_dir};
use meme_models::{CompositionJob, JobId, TimingLog, REQUIRED_URL_COUNT};

use crate::compose::{Compositor, FfmpegCompositor};
use crate::config::GeneratorConfig;
use crate::error::{GenerateError, GenerateResult};
use crate::fetch::{fetch_clips, ClipFetcher, YtDlpFetcher};
use crate::logging::JobLogger;
use crate::metrics;

/// Lifecycle states of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Start,
    Fetching,
    CompleteFetch,
    PartialFetch,
    Composing,
    Done,
    Aborted,
    Cleanup,
    End,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Start => "start",
            GenerationState::Fetching => "fetching",
            GenerationState::CompleteFetch => "complete_fetch",
            GenerationState::PartialFetch => "partial_fetch",
            GenerationState::Composing => "composing",
            GenerationState::Done => "done",
            GenerationState::Aborted => "aborted",
            GenerationState::Cleanup => "cleanup",
            GenerationState::End => "end",
        }
    }

    /// Label written to the timing log when the state is entered.
    fn timing_label(&self) -> &'static str {
        match self {
            GenerationState::Start => "Job started",
            GenerationState::Fetching => "Audio fetch started",
            GenerationState::CompleteFetch => "All audio clips downloaded",
            GenerationState::PartialFetch => "Audio fetch incomplete",
            GenerationState::Composing => "Video composition started",
            GenerationState::Done => "Video exported",
            GenerationState::Aborted => "Generation aborted",
            GenerationState::Cleanup => "Cleanup started",
            GenerationState::End => "Job finished",
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a job that ran to the end without a hard failure.
#[derive(Debug, Clone, PartialEq)]
pub enum MemeOutcome {
    /// The output file was written; `video` holds its bytes as read before
    /// the next job could overwrite it.
    Done { output_path: PathBuf, video: Vec<u8> },
    /// Not every clip could be fetched; nothing was composed.
    Aborted { fetched: usize, required: usize },
}

impl MemeOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, MemeOutcome::Done { .. })
    }

    fn metric_label(&self) -> &'static str {
        match self {
            MemeOutcome::Done { .. } => "done",
            MemeOutcome::Aborted { .. } => "aborted",
        }
    }
}

/// Per-job bookkeeping: current state, timings, log context.
struct JobRun {
    state: GenerationState,
    timings: TimingLog,
    logger: JobLogger,
}

impl JobRun {
    fn new(logger: JobLogger) -> Self {
        let mut timings = TimingLog::start();
        timings.record(GenerationState::Start.timing_label());
        Self {
            state: GenerationState::Start,
            timings,
            logger,
        }
    }

    fn enter(&mut self, next: GenerationState) {
        debug!(from = %self.state, to = %next, "Generation state change");
        self.state = next;
        self.timings.record(next.timing_label());
    }
}

/// Runs meme generation jobs one at a time.
///
/// The temp directory and output path are shared between jobs, so jobs are
/// serialized: a second caller waits until the first has finished cleanup.
/// Each job runs on its own task, so a caller that goes away mid-job does
/// not stop cleanup or release the lock early.
pub struct MemeGenerator {
    inner: Arc<GeneratorInner>,
    job_lock: Arc<Mutex<()>>,
}

struct GeneratorInner {
    config: GeneratorConfig,
    fetcher: Arc<dyn ClipFetcher>,
    compositor: Arc<dyn Compositor>,
}

impl MemeGenerator {
    pub fn new(
        config: GeneratorConfig,
        fetcher: Arc<dyn ClipFetcher>,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        Self {
            inner: Arc::new(GeneratorInner {
                config,
                fetcher,
                compositor,
            }),
            job_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Build a generator backed by yt-dlp and FFmpeg.
    pub fn from_config(config: GeneratorConfig) -> Self {
        let fetcher = YtDlpFetcher::new(&config.temp_audio_dir, config.fetch.clip_window);
        let compositor = FfmpegCompositor::new(config.encode.clone());
        Self::new(config, Arc::new(fetcher), Arc::new(compositor))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.inner.config
    }

    /// Generate a meme from exactly [`REQUIRED_URL_COUNT`] source URLs.
    ///
    /// A wrong URL count is rejected before anything is fetched. A partial
    /// fetch is not an error: it yields [`MemeOutcome::Aborted`]. The temp
    /// directory is purged whatever the outcome, even if the returned future
    /// is dropped once the job has started.
    pub async fn generate(&self, urls: &[String]) -> GenerateResult<MemeOutcome> {
        if urls.len() != REQUIRED_URL_COUNT {
            return Err(GenerateError::invalid_input(format!(
                "Exactly {} URLs are required",
                REQUIRED_URL_COUNT
            )));
        }

        let guard = Arc::clone(&self.job_lock).lock_owned().await;

        let logger = JobLogger::new(&JobId::new(), "generate_meme");
        let span = logger.create_span();
        let inner = Arc::clone(&self.inner);
        let urls = urls.to_vec();

        let job = tokio::spawn(
            async move {
                let _guard = guard;
                inner.run_job(&urls, logger).await
            }
            .instrument(span),
        );
        job.await?
    }
}

impl GeneratorInner {
    async fn run_job(&self, urls: &[String], logger: JobLogger) -> GenerateResult<MemeOutcome> {
        let mut run = JobRun::new(logger);
        run.logger.log_start(&format!("{} source URLs", urls.len()));

        let result = self.run_stages(urls, &mut run).await;

        run.enter(GenerationState::Cleanup);
        self.cleanup(&run.logger).await;
        run.enter(GenerationState::End);

        let elapsed = run.timings.elapsed().as_secs_f64();
        match &result {
            Ok(outcome) => {
                metrics::record_generation(outcome.metric_label(), elapsed);
                run.logger
                    .log_completion(&format!("{} in {:.2}s", outcome.metric_label(), elapsed));
            }
            Err(e) => {
                metrics::record_generation("failed", elapsed);
                run.logger.log_error(&e.to_string());
            }
        }
        run.logger.log_timings(&run.timings);

        result
    }

    async fn run_stages(&self, urls: &[String], run: &mut JobRun) -> GenerateResult<MemeOutcome> {
        ensure_dir(&self.config.temp_audio_dir)
            .await
            .map_err(GenerateError::Setup)?;
        ensure_parent_dir(&self.config.output_path)
            .await
            .map_err(GenerateError::Setup)?;

        run.enter(GenerationState::Fetching);
        let clips = fetch_clips(Arc::clone(&self.fetcher), urls, &self.config.fetch).await;

        let required = urls.len();
        let fetched = clips.len();
        metrics::record_fetch_stage(fetched, required);

        if fetched < required {
            run.enter(GenerationState::PartialFetch);
            run.logger.log_warning(&format!(
                "Only {}/{} audio clips were downloaded, aborting meme generation",
                fetched, required
            ));
            run.enter(GenerationState::Aborted);
            return Ok(MemeOutcome::Aborted { fetched, required });
        }

        run.enter(GenerationState::CompleteFetch);
        run.logger.log_progress(&format!(
            "Fetched {} clips, {:.2}s of audio",
            fetched,
            clips.total_duration_secs()
        ));

        run.enter(GenerationState::Composing);
        let job = CompositionJob::new(
            &self.config.background_video_path,
            clips,
            &self.config.output_path,
        );

        let started = Instant::now();
        self.compositor
            .compose(&job)
            .await
            .map_err(GenerateError::Composition)?;
        metrics::record_compose_duration(started.elapsed().as_secs_f64());

        let video = tokio::fs::read(&job.output_path)
            .await
            .map_err(GenerateError::Output)?;

        run.enter(GenerationState::Done);
        Ok(MemeOutcome::Done {
            output_path: job.output_path,
            video,
        })
    }

    async fn cleanup(&self, logger: &JobLogger) {
        let dir = &self.config.temp_audio_dir;
        match clean_directory(dir).await {
            Ok(report) => {
                for (path, reason) in &report.failures {
                    logger.log_warning(&format!("Failed to delete {}: {}", path.display(), reason));
                }
                metrics::record_cleanup_failures(report.failures.len());
                logger.log_progress(&format!(
                    "Purged {} temporary entries from {}",
                    report.removed,
                    dir.display()
                ));
            }
            Err(e) => {
                logger.log_error(&format!("Error cleaning {}: {}", dir.display(), e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchPolicy;
    use crate::test_support::{RecordingCompositor, Script, ScriptedFetcher};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        config: GeneratorConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = GeneratorConfig::default()
                .with_paths(
                    root.path().join("audio/temp_audio"),
                    root.path().join("video/video.mp4"),
                    root.path().join("video/output_meme.mp4"),
                )
                .with_fetch_policy(
                    FetchPolicy::default().with_retry_backoff(Duration::from_millis(1)),
                );
            Self { _root: root, config }
        }

        fn temp_dir(&self) -> &Path {
            &self.config.temp_audio_dir
        }

        fn generator(
            &self,
            fetcher: Arc<ScriptedFetcher>,
            compositor: Arc<RecordingCompositor>,
        ) -> MemeGenerator {
            MemeGenerator::new(self.config.clone(), fetcher, compositor)
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/watch?v={}", i)).collect()
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(GenerationState::PartialFetch.as_str(), "partial_fetch");
        assert_eq!(GenerationState::End.to_string(), "end");
    }

    #[tokio::test]
    async fn test_wrong_url_count_is_rejected_before_fetching() {
        let fixture = Fixture::new();
        let fetcher = Arc::new(ScriptedFetcher::new());
        let generator = fixture.generator(fetcher.clone(), Arc::new(RecordingCompositor::new()));

        for n in [0, 3, 5] {
            let err = generator.generate(&urls(n)).await.unwrap_err();
            assert!(err.is_client_error());
            assert_eq!(err.to_string(), "Invalid input: Exactly 4 URLs are required");
        }
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_complete_fetch_composes_clips_in_input_order() {
        let fixture = Fixture::new();
        let urls = urls(4);
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .script(&urls[0], Script::ok().delay_ms(40))
                .script(&urls[3], Script::ok().fail_first(2))
                .with_artifacts(fixture.temp_dir()),
        );
        let compositor = Arc::new(RecordingCompositor::new());
        let generator = fixture.generator(fetcher.clone(), compositor.clone());

        let outcome = generator.generate(&urls).await.unwrap();

        assert_eq!(
            outcome,
            MemeOutcome::Done {
                output_path: fixture.config.output_path.clone(),
                video: format!("video:{}.mp3", urls[0]).into_bytes(),
            }
        );
        assert!(fixture.config.output_path.exists());

        let jobs = compositor.jobs();
        assert_eq!(jobs.len(), 1);
        let timeline = jobs[0].clips.timeline();
        let paths: Vec<String> = timeline
            .iter()
            .map(|p| p.clip.path.display().to_string())
            .collect();
        assert_eq!(paths, urls.iter().map(|u| format!("{}.mp3", u)).collect::<Vec<_>>());
        assert_eq!(timeline[3].start_secs, 7.5);
        assert_eq!(jobs[0].background_video_path, fixture.config.background_video_path);

        // Artifacts of every attempt, including failed ones, are purged
        assert_eq!(fetcher.calls(&urls[3]), 3);
        assert!(dir_is_empty(fixture.temp_dir()));
    }

    #[tokio::test]
    async fn test_exhausted_fetch_aborts_without_output() {
        let fixture = Fixture::new();
        let urls = urls(4);
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .script(&urls[2], Script::always_fail())
                .with_artifacts(fixture.temp_dir()),
        );
        let compositor = Arc::new(RecordingCompositor::new());
        let generator = fixture.generator(fetcher.clone(), compositor.clone());

        let outcome = generator.generate(&urls).await.unwrap();

        assert_eq!(
            outcome,
            MemeOutcome::Aborted {
                fetched: 3,
                required: 4
            }
        );
        assert!(!outcome.is_done());
        assert_eq!(fetcher.calls(&urls[2]), 3);
        assert!(compositor.jobs().is_empty());
        assert!(!fixture.config.output_path.exists());
        assert!(dir_is_empty(fixture.temp_dir()));
    }

    #[tokio::test]
    async fn test_composition_failure_still_purges_temp_dir() {
        let fixture = Fixture::new();
        let fetcher = Arc::new(ScriptedFetcher::new().with_artifacts(fixture.temp_dir()));
        let generator = fixture.generator(fetcher, Arc::new(RecordingCompositor::failing()));

        let err = generator.generate(&urls(4)).await.unwrap_err();

        assert!(matches!(err, GenerateError::Composition(_)));
        assert!(!err.is_client_error());
        assert!(dir_is_empty(fixture.temp_dir()));
    }

    #[tokio::test]
    async fn test_leftovers_from_earlier_runs_are_purged() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.temp_dir().join("stale/nested")).unwrap();
        std::fs::write(fixture.temp_dir().join("stale.webm"), b"old").unwrap();

        let generator = fixture.generator(
            Arc::new(ScriptedFetcher::new()),
            Arc::new(RecordingCompositor::new()),
        );
        generator.generate(&urls(4)).await.unwrap();

        assert!(dir_is_empty(fixture.temp_dir()));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_serialized() {
        let fixture = Fixture::new();
        let first = urls(4);
        let second: Vec<String> = (4..8).map(|i| format!("https://example.com/watch?v={}", i)).collect();

        let mut fetcher = ScriptedFetcher::new();
        for url in first.iter().chain(second.iter()) {
            fetcher = fetcher.script(url, Script::ok().delay_ms(30));
        }
        let fetcher = Arc::new(fetcher);
        let compositor = Arc::new(RecordingCompositor::new());
        let generator = fixture.generator(fetcher.clone(), compositor.clone());

        let (a, b) = tokio::join!(generator.generate(&first), generator.generate(&second));

        // Each caller gets its own job's video even though both share one output path
        for (outcome, urls) in [(a.unwrap(), &first), (b.unwrap(), &second)] {
            match outcome {
                MemeOutcome::Done { video, .. } => {
                    assert_eq!(video, format!("video:{}.mp3", urls[0]).into_bytes());
                }
                other => panic!("expected done, got {:?}", other),
            }
        }
        assert_eq!(compositor.jobs().len(), 2);
        // Never more than one job's pool in flight
        assert_eq!(fetcher.max_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_stop_cleanup() {
        let fixture = Fixture::new();
        let urls = urls(4);
        let mut fetcher = ScriptedFetcher::new().with_artifacts(fixture.temp_dir());
        for url in &urls {
            fetcher = fetcher.script(url, Script::ok().delay_ms(200));
        }
        let compositor = Arc::new(RecordingCompositor::new());
        let generator = fixture.generator(Arc::new(fetcher), compositor.clone());

        let dropped =
            tokio::time::timeout(Duration::from_millis(50), generator.generate(&urls)).await;
        assert!(dropped.is_err());

        let deadline = Instant::now() + Duration::from_secs(2);
        while !(compositor.jobs().len() == 1 && dir_is_empty(fixture.temp_dir())) {
            assert!(Instant::now() < deadline, "job stopped when its caller went away");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // The lock was released by the finished job
        assert!(generator.generate(&urls).await.unwrap().is_done());
    }
}
