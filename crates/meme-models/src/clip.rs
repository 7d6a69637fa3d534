//! Audio clips, fetch bookkeeping and timeline placement.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A fetched and probed audio clip on local disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    /// Local audio file
    pub path: PathBuf,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl AudioClip {
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
        }
    }
}

/// One fetch to perform: a source URL and its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// 0-based submission index
    pub index: usize,
}

impl FetchRequest {
    /// Build one request per URL, indexed by input position.
    pub fn from_urls(urls: &[String]) -> Vec<FetchRequest> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| FetchRequest {
                url: url.clone(),
                index,
            })
            .collect()
    }
}

/// Settled outcome of one [`FetchRequest`]. `clip` is `None` when every
/// attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub index: usize,
    pub clip: Option<AudioClip>,
}

/// Fixed-size result buffer addressed by submission index.
///
/// Results may arrive in any order; the slot layout keeps the final ordering
/// tied to the order the requests were submitted in.
#[derive(Debug)]
pub struct ClipSlots {
    slots: Box<[Option<AudioClip>]>,
}

impl ClipSlots {
    /// Allocate `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store a settled result in its slot.
    ///
    /// Results for an index outside the buffer, or for a slot that is already
    /// filled, are dropped.
    pub fn fill(&mut self, result: FetchResult) {
        let Some(slot) = self.slots.get_mut(result.index) else {
            warn!(
                index = result.index,
                capacity = self.slots.len(),
                "Dropping fetch result with out-of-range index"
            );
            return;
        };

        if slot.is_some() {
            warn!(index = result.index, "Dropping duplicate fetch result");
            return;
        }

        *slot = result.clip;
    }

    /// Number of filled slots.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Indices that never received a clip.
    pub fn missing_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop empty slots, keeping index order.
    pub fn compact(self) -> OrderedClipSet {
        OrderedClipSet {
            clips: self.slots.into_vec().into_iter().flatten().collect(),
        }
    }
}

/// A clip placed on the output audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedClip {
    pub clip: AudioClip,
    /// Start offset on the audio track in seconds
    pub start_secs: f64,
}

/// Successfully fetched clips in original input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedClipSet {
    clips: Vec<AudioClip>,
}

impl OrderedClipSet {
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clips(&self) -> &[AudioClip] {
        &self.clips
    }

    /// Place clips end to end: each starts where the previous one ends.
    pub fn timeline(&self) -> Vec<PositionedClip> {
        let mut start_secs = 0.0;
        self.clips
            .iter()
            .map(|clip| {
                let positioned = PositionedClip {
                    clip: clip.clone(),
                    start_secs,
                };
                start_secs += clip.duration_secs;
                positioned
            })
            .collect()
    }

    /// Total length of the sequenced audio track.
    pub fn total_duration_secs(&self) -> f64 {
        self.clips.iter().map(|c| c.duration_secs).sum()
    }
}

impl From<Vec<AudioClip>> for OrderedClipSet {
    fn from(clips: Vec<AudioClip>) -> Self {
        Self { clips }
    }
}

/// Everything the composition stage needs to render one output file.
#[derive(Debug, Clone)]
pub struct CompositionJob {
    pub background_video_path: PathBuf,
    pub clips: OrderedClipSet,
    pub output_path: PathBuf,
}

impl CompositionJob {
    pub fn new(
        background_video_path: impl AsRef<Path>,
        clips: OrderedClipSet,
        output_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            background_video_path: background_video_path.as_ref().to_path_buf(),
            clips,
            output_path: output_path.as_ref().to_path_buf(),
        }
    }
}
