//! Short audio clip downloads using yt-dlp.
//!
//! Only a small time window of each source is fetched (`--download-sections`)
//! and transcoded to MP3. The final path is read back from yt-dlp itself
//! (`--print after_move:filepath`) since the extension changes during
//! post-processing.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Default clip start within the source.
pub const DEFAULT_CLIP_START_SECS: f64 = 60.0;

/// Default clip length.
pub const DEFAULT_CLIP_LENGTH_SECS: f64 = 2.5;

/// Output naming template for the clip at `index`.
///
/// The index suffix keeps the files of concurrent downloads apart even when
/// the same source is requested twice.
pub fn output_template(index: usize) -> String {
    format!("%(id)s-{}.%(ext)s", index)
}

/// Time window to cut out of each source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start_secs: f64,
    pub length_secs: f64,
}

impl Default for ClipWindow {
    fn default() -> Self {
        Self {
            start_secs: DEFAULT_CLIP_START_SECS,
            length_secs: DEFAULT_CLIP_LENGTH_SECS,
        }
    }
}

impl ClipWindow {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.length_secs
    }

    /// Section argument in yt-dlp's `*start-end` format.
    pub fn section_arg(&self) -> String {
        format!("*{}-{}", self.start_secs, self.end_secs())
    }
}

/// Build yt-dlp arguments for one clip download.
///
/// The URL goes after `--` so it can never be parsed as an option.
pub fn build_audio_clip_args(
    url: &str,
    index: usize,
    window: &ClipWindow,
    output_dir: &Path,
) -> Vec<String> {
    let template = output_dir.join(output_template(index));

    vec![
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "-f".to_string(),
        "bestaudio/best".to_string(),
        "--download-sections".to_string(),
        window.section_arg(),
        "--extract-audio".to_string(),
        "--audio-format".to_string(),
        "mp3".to_string(),
        "--audio-quality".to_string(),
        "192K".to_string(),
        "-o".to_string(),
        template.to_string_lossy().to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

/// Download the audio clip for request `index` into `output_dir`, returning
/// the file path.
pub async fn download_audio_clip(
    url: &str,
    index: usize,
    window: &ClipWindow,
    output_dir: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let output_dir = output_dir.as_ref();

    check_ytdlp()?;

    info!(
        url = url,
        index,
        start = window.start_secs,
        end = window.end_secs(),
        output_dir = %output_dir.display(),
        "Downloading audio clip"
    );

    let output = Command::new("yt-dlp")
        .args(build_audio_clip_args(url, index, window, output_dir))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);

        if is_rate_limited(&stderr) {
            warn!(url = %url, "Source rate limit detected");
        }

        let error_msg = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error");

        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            error_msg
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let audio_path = parse_printed_path(&stdout)
        .ok_or_else(|| MediaError::download_failed("yt-dlp did not report an output file"))?;

    if !audio_path.exists() {
        return Err(MediaError::download_failed(format!(
            "Output file not created: {}",
            audio_path.display()
        )));
    }

    let file_size = audio_path.metadata()?.len();
    info!(
        output = %audio_path.display(),
        size_kb = file_size as f64 / 1024.0,
        "Downloaded audio clip"
    );

    Ok(audio_path)
}

/// Last non-empty stdout line is the path printed after post-processing.
fn parse_printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(PathBuf::from)
}

fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let window = ClipWindow::default();
        assert_eq!(window.end_secs(), 62.5);
        assert_eq!(window.section_arg(), "*60-62.5");
    }

    #[test]
    fn test_custom_window_section() {
        let window = ClipWindow {
            start_secs: 12.25,
            length_secs: 3.0,
        };
        assert_eq!(window.section_arg(), "*12.25-15.25");
    }

    #[test]
    fn test_args_put_url_after_separator() {
        let args = build_audio_clip_args(
            "https://youtu.be/abc",
            2,
            &ClipWindow::default(),
            Path::new("/tmp/audio"),
        );

        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(sep, args.len() - 2);
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
        assert!(args.contains(&"/tmp/audio/%(id)s-2.%(ext)s".to_string()));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--download-sections", "*60-62.5"]));
    }

    #[test]
    fn test_same_source_at_two_indices_gets_two_files() {
        let dir = Path::new("/tmp/audio");
        let url = "https://youtu.be/abc";
        let window = ClipWindow::default();

        let template = |index| {
            let args = build_audio_clip_args(url, index, &window, dir);
            let o = args.iter().position(|a| a == "-o").unwrap();
            args[o + 1].clone()
        };

        assert_ne!(template(0), template(1));
    }

    #[test]
    fn test_parse_printed_path() {
        let stdout = "\n/tmp/audio/abc123.mp3\n\n";
        assert_eq!(
            parse_printed_path(stdout),
            Some(PathBuf::from("/tmp/audio/abc123.mp3"))
        );
        assert_eq!(parse_printed_path("  \n"), None);
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited("ERROR: HTTP Error 429: Too Many Requests"));
        assert!(!is_rate_limited("ERROR: Video unavailable"));
    }
}
