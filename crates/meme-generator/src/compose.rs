//! Composition stage.

use async_trait::async_trait;

use meme_media::compose::{compose_audio_over_video, EncodeSettings};
use meme_media::MediaResult;
use meme_models::CompositionJob;

/// Renders a composition job to its output path.
#[async_trait]
pub trait Compositor: Send + Sync {
    async fn compose(&self, job: &CompositionJob) -> MediaResult<()>;
}

/// Encodes with FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCompositor {
    settings: EncodeSettings,
}

impl FfmpegCompositor {
    pub fn new(settings: EncodeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn compose(&self, job: &CompositionJob) -> MediaResult<()> {
        compose_audio_over_video(job, &self.settings).await
    }
}
