//! Sequenced audio composition over a background video.
//!
//! Clips are placed end to end on one audio track: each input is delayed to
//! its cumulative start offset and the delayed inputs are summed. The mixed
//! track replaces the video's own audio.

use std::path::Path;
use tracing::{debug, info};

use meme_models::{CompositionJob, PositionedClip};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_parent_dir, remove_file_if_exists};
use crate::probe::probe_media;

/// Output label of the mixed audio track in the filter graph.
const MIXED_AUDIO_LABEL: &str = "aout";

/// Encoder settings for the final mux.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub threads: u32,
    /// Kill FFmpeg after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for EncodeSettings {
    /// Fast, low-effort H.264 with AAC audio.
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "ultrafast".to_string(),
            threads: 4,
            timeout_secs: None,
        }
    }
}

/// Build the filter graph that sequences clips on one track.
///
/// Input 0 is the background video, so clip `i` is FFmpeg input `i + 1`.
pub fn build_audio_mix_filter(timeline: &[PositionedClip]) -> String {
    let mut filter = String::new();

    for (i, positioned) in timeline.iter().enumerate() {
        let delay_ms = (positioned.start_secs * 1000.0).round().max(0.0) as u64;
        filter.push_str(&format!(
            "[{}:a]adelay=delays={}:all=1[a{}];",
            i + 1,
            delay_ms,
            i
        ));
    }

    for i in 0..timeline.len() {
        filter.push_str(&format!("[a{}]", i));
    }

    filter.push_str(&format!(
        "amix=inputs={}:duration=longest:dropout_transition=0:normalize=0[{}]",
        timeline.len(),
        MIXED_AUDIO_LABEL
    ));

    filter
}

/// Build the full FFmpeg command for a composition job.
pub fn build_composition_command(
    job: &CompositionJob,
    video_duration: f64,
    settings: &EncodeSettings,
) -> MediaResult<FfmpegCommand> {
    let timeline = job.clips.timeline();
    if timeline.is_empty() {
        return Err(MediaError::internal("Composition requires at least one clip"));
    }

    let cmd = timeline.iter().fold(
        FfmpegCommand::new(&job.output_path).input(&job.background_video_path),
        |cmd, positioned| cmd.input(&positioned.clip.path),
    );

    Ok(cmd
        .filter_complex(build_audio_mix_filter(&timeline))
        .map("0:v")
        .map(format!("[{}]", MIXED_AUDIO_LABEL))
        .video_codec(&settings.video_codec)
        .preset(&settings.preset)
        .audio_codec(&settings.audio_codec)
        .threads(settings.threads)
        .duration(video_duration))
}

/// Lay the job's clips over its background video and write the output file.
pub async fn compose_audio_over_video(
    job: &CompositionJob,
    settings: &EncodeSettings,
) -> MediaResult<()> {
    require_file(&job.background_video_path)?;
    for clip in job.clips.clips() {
        require_file(&clip.path)?;
    }

    // The output path is reused by every job; a leftover must never pass for
    // this job's result
    if remove_file_if_exists(&job.output_path).await? {
        debug!(output = %job.output_path.display(), "Removed previous output");
    }

    let video = probe_media(&job.background_video_path).await?;
    if !video.has_video() {
        return Err(MediaError::invalid_media(format!(
            "{} has no video stream",
            job.background_video_path.display()
        )));
    }

    ensure_parent_dir(&job.output_path).await?;

    let cmd = build_composition_command(job, video.duration, settings)?;

    info!(
        clips = job.clips.len(),
        audio_secs = job.clips.total_duration_secs(),
        video_secs = video.duration,
        output = %job.output_path.display(),
        "Starting video export"
    );

    let mut runner = FfmpegRunner::new();
    if let Some(secs) = settings.timeout_secs {
        runner = runner.with_timeout(secs);
    }

    let total_ms = (video.duration * 1000.0) as i64;
    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(total_ms),
                speed = progress.speed,
                "Export progress"
            );
        })
        .await?;

    if !job.output_path.exists() {
        return Err(MediaError::ffmpeg_failed(
            "FFmpeg reported success but produced no output",
            None,
            Some(0),
        ));
    }

    info!(output = %job.output_path.display(), "Finished video export");
    Ok(())
}

fn require_file(path: &Path) -> MediaResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MediaError::FileNotFound(path.to_path_buf()))
    }
}
