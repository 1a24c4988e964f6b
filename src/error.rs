//! Error types for the annotation conversion pipeline.

use std::path::PathBuf;

const EMPTY_LABELS_MSG: &str = "No annotations could be extracted from the input file. \
     Please check that the input file contains labeled frames.";

const DLC_LAYOUT_HINT: &str = " Ensure that the paths to the labeled frames follow the standard \
     DLC project layout: labeled-data/<video-name>/<filename-with-frame-number>.<extension> \
     and that the frame files exist.";

fn no_annotations_message(dlc: &bool) -> String {
    if *dlc {
        format!("{EMPTY_LABELS_MSG}{DLC_LAYOUT_HINT}")
    } else {
        EMPTY_LABELS_MSG.to_string()
    }
}

/// Errors that can occur while converting annotations to COCO format.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The loaded label set contains no labeled frames.
    #[error("{}", no_annotations_message(.dlc))]
    NoAnnotationsFound {
        /// Whether the source was detected as a native DLC annotations file.
        dlc: bool,
    },

    /// The label set references more than one video.
    #[error(
        "The annotations refer to multiple videos ({count} found); only \
         single-video label sets are supported. Please check the input file."
    )]
    MultipleVideos { count: usize },

    /// The frame-number pattern found no match in an image filename.
    #[error(
        "No frame number could be extracted from filename '{filename}' \
         using regexp pattern '{pattern}'"
    )]
    FrameNumberNotFound { filename: String, pattern: String },

    /// Two or more images resolved to the same frame number.
    #[error(
        "Extracted image IDs are not unique: frame number {frame_number} \
         was extracted from both '{first}' and '{second}'"
    )]
    DuplicateFrameId {
        frame_number: u64,
        first: String,
        second: String,
    },

    /// The number of supplied image filenames does not match the number
    /// of labeled frames.
    #[error("Expected {expected} image filenames (one per labeled frame), got {actual}")]
    FilenameCountMismatch { expected: usize, actual: usize },

    /// A labeled frame's index does not select a source path in its video.
    #[error("Frame index {frame_idx} is out of range for a video with {available} source frames")]
    FrameIndexOutOfRange { frame_idx: usize, available: usize },

    /// A labeled frame references a video absent from the label set.
    #[error("Labeled frame references video {video}, but the label set holds {available}")]
    VideoIndexOutOfRange { video: usize, available: usize },

    /// An annotation references an image id absent from the image list.
    #[error("Annotation references unknown image id {image_id}")]
    UnknownImageId { image_id: u64 },

    /// The source file extension maps to no supported annotation format.
    #[error("Unsupported annotation format for file '{0}'")]
    UnsupportedFormat(PathBuf),

    /// The source file could not be parsed in its inferred format.
    #[error("Failed to parse annotations from '{path}': {message}")]
    InvalidSource { path: PathBuf, message: String },

    /// The supplied frame-number pattern is not a valid regular expression.
    #[error("Invalid frame regexp pattern '{pattern}': {source}")]
    InvalidFrameRegexp {
        pattern: String,
        source: regex::Error,
    },

    /// Failed to read a source file.
    #[error("Failed to read file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the output document.
    #[error("Failed to write file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the output document.
    #[error("Failed to serialize COCO document: {0}")]
    Serialize(#[from] serde_json::Error),
}
