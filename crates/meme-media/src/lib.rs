#![deny(unreachable_patterns)]
//! yt-dlp and FFmpeg CLI wrappers.
//!
//! This crate provides:
//! - Short audio clip downloads through yt-dlp
//! - Media probing through FFprobe
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Sequenced audio composition over a background video
//! - Temp directory bootstrap and cleanup

pub mod command;
pub mod compose;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use compose::{build_audio_mix_filter, compose_audio_over_video, EncodeSettings};
pub use download::{download_audio_clip, ClipWindow};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{
    clean_directory, ensure_dir, ensure_parent_dir, remove_file_if_exists, CleanupReport,
};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
