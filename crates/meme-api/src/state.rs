//! Application state.

use std::sync::Arc;

use meme_generator::{GeneratorConfig, MemeGenerator};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub generator: Arc<MemeGenerator>,
}

impl AppState {
    pub fn new(config: ApiConfig, generator: MemeGenerator) -> Self {
        Self {
            config,
            generator: Arc::new(generator),
        }
    }

    /// State backed by yt-dlp and FFmpeg, configured from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        Self::new(config, MemeGenerator::from_config(GeneratorConfig::from_env()))
    }
}
