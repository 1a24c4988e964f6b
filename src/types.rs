use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

// Fallback extension for derived image filenames when the source frame
// path carries none.
pub const DEFAULT_IMAGE_EXT: &str = "png";

/// A single labeled keypoint position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Occluded keypoints are labeled but not visible.
    pub visible: bool,
}

/// One subject instance within a labeled frame.
///
/// Points are indexed by skeleton node; `None` means the node was not
/// labeled in this frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub points: Vec<Option<Point>>,
}

impl Instance {
    /// Number of labeled keypoints in this instance.
    pub fn labeled_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

/// Keypoint schema shared by all instances in a label set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skeleton {
    #[serde(default = "default_skeleton_name")]
    pub name: String,
    pub node_names: Vec<String>,
    /// Edges as pairs of node indices into `node_names`.
    #[serde(default)]
    pub edges: Vec<(usize, usize)>,
}

fn default_skeleton_name() -> String {
    "animal".to_string()
}

impl Skeleton {
    pub fn new(node_names: Vec<String>) -> Self {
        Self {
            name: default_skeleton_name(),
            node_names,
            edges: Vec::new(),
        }
    }
}

/// A logical video reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Video {
    /// A list of per-frame source image paths; a frame index selects one.
    ImageSequence(Vec<PathBuf>),
    /// A single media file containing all frames.
    MediaFile(PathBuf),
}

/// A (video, frame index) pair plus its instance annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledFrame {
    /// Index into `LabelSet::videos`.
    pub video: usize,
    pub frame_idx: usize,
    pub instances: Vec<Instance>,
}

/// In-memory collection of annotated frames loaded from a source
/// annotations file.
///
/// Frame order is significant: it determines the assignment order of
/// derived output filenames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSet {
    pub videos: Vec<Video>,
    pub skeleton: Skeleton,
    pub labeled_frames: Vec<LabeledFrame>,
}

impl LabelSet {
    /// Number of distinct videos referenced by the labeled frames.
    pub fn referenced_video_count(&self) -> usize {
        self.labeled_frames
            .iter()
            .map(|lf| lf.video)
            .collect::<HashSet<_>>()
            .len()
    }
}
