//! Pose annotation to COCO keypoint converter
//!
//! This library converts pose-estimation keypoint annotations (DeepLabCut
//! CSV exports or JSON label sets) into COCO keypoint JSON, remapping
//! image identifiers to the frame numbers embedded in the output image
//! filenames.

pub mod coco;
pub mod config;
pub mod convert;
pub mod error;
pub mod loader;
pub mod types;

// Re-export commonly used types and functions
pub use coco::{Annotation, Category, CocoFile, Image};
pub use config::{Args, ConvertOptions, ImageFilenames, VideoIdentity, VisibilityEncoding};
pub use convert::{
    annotations_to_coco, convert_labels, derive_image_filenames, extract_frame_number,
    update_image_ids, DEFAULT_FRAME_REGEXP,
};
pub use error::ConvertError;
pub use loader::{is_dlc_file, load_file, SourceFormat};
pub use types::{Instance, LabelSet, LabeledFrame, Point, Skeleton, Video};
