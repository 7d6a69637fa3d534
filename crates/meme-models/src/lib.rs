//! Shared data models for the meme generator.
//!
//! This crate provides:
//! - The HTTP request schema and its validation
//! - Fetch requests/results and the index-addressed clip buffer
//! - Audio timeline placement for composition
//! - Per-job timing diagnostics

pub mod clip;
pub mod job;
pub mod request;
pub mod timing;

// Re-export common types
pub use clip::{
    AudioClip, ClipSlots, CompositionJob, FetchRequest, FetchResult, OrderedClipSet,
    PositionedClip,
};
pub use job::JobId;
pub use request::{GenerateMemeRequest, REQUIRED_URL_COUNT};
pub use timing::{TimingEntry, TimingLog};
