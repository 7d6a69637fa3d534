//! Meme generation pipeline.
//!
//! This crate provides:
//! - A bounded, retrying fetch stage that keeps results in input order
//! - The composition stage seam and its FFmpeg implementation
//! - The orchestrator that runs fetch, composition and cleanup for one job
//! - Structured job logging and pipeline metrics

pub mod compose;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use compose::{Compositor, FfmpegCompositor};
pub use config::{FetchPolicy, GeneratorConfig};
pub use error::{GenerateError, GenerateResult};
pub use fetch::{fetch_clips, ClipFetcher, YtDlpFetcher};
pub use generator::{GenerationState, MemeGenerator, MemeOutcome};
pub use logging::JobLogger;
pub use retry::{retry_async, RetryConfig, RetryResult};
