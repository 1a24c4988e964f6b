use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::error::ConvertError;

/// Command-line arguments parser for converting pose annotations to
/// COCO keypoint JSON.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Path to the input annotations file (DLC .csv export or .json label set)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Path to save the output COCO JSON file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Encoding scheme for keypoint visibility in the output
    #[arg(long = "visibility", value_enum, default_value = "ternary")]
    pub visibility: VisibilityEncoding,

    /// Subject identifier used in derived image filenames
    #[arg(long = "subject", default_value = "unknown")]
    pub subject: String,

    /// Session identifier used in derived image filenames
    #[arg(long = "session", default_value = "unknown")]
    pub session: String,

    /// View identifier used in derived image filenames
    #[arg(long = "view", default_value = "unknown")]
    pub view: String,

    /// Output image filename to use verbatim, one per labeled frame
    /// in label-set order (repeatable); replaces derived filenames
    #[arg(long = "image-filename")]
    pub image_filenames: Vec<String>,

    /// Override the built-in frame-number extraction pattern
    #[arg(long = "frame-regexp")]
    pub frame_regexp: Option<String>,

    /// Keep converter-assigned image ids instead of remapping them to
    /// the frame numbers embedded in the image filenames
    #[arg(long = "keep-image-ids")]
    pub keep_image_ids: bool,
}

impl Args {
    /// Build conversion options from the parsed arguments.
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            filenames: if self.image_filenames.is_empty() {
                None
            } else {
                Some(ImageFilenames::PerFrame(self.image_filenames.clone()))
            },
            visibility: self.visibility,
            frame_regexp: self.frame_regexp.clone(),
            remap_image_ids: !self.keep_image_ids,
            video_identity: VideoIdentity::new(&self.subject, &self.session, &self.view),
        }
    }
}

// Enumeration for the keypoint visibility encoding in the output
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum VisibilityEncoding {
    /// 0 = not labeled, 1 = labeled but not visible, 2 = labeled and visible
    #[default]
    Ternary,
    /// 0 = not visible (unlabeled keypoints collapse into this), 1 = visible
    Binary,
}

/// Output image filenames supplied by the caller instead of derived ones.
#[derive(Debug, Clone)]
pub enum ImageFilenames {
    /// One filename; valid only for single-frame label sets.
    Single(String),
    /// One filename per labeled frame, in label-set order.
    PerFrame(Vec<String>),
}

impl ImageFilenames {
    /// Expand into one filename per labeled frame, validating the count.
    pub(crate) fn resolve(&self, frame_count: usize) -> Result<Vec<String>, ConvertError> {
        match self {
            ImageFilenames::Single(name) => {
                if frame_count != 1 {
                    return Err(ConvertError::FilenameCountMismatch {
                        expected: frame_count,
                        actual: 1,
                    });
                }
                Ok(vec![name.clone()])
            }
            ImageFilenames::PerFrame(names) => {
                if names.len() != frame_count {
                    return Err(ConvertError::FilenameCountMismatch {
                        expected: frame_count,
                        actual: names.len(),
                    });
                }
                Ok(names.clone())
            }
        }
    }
}

/// Subject, session and view identifiers used to synthesize derived
/// image filenames following the dataset naming convention.
#[derive(Debug, Clone)]
pub struct VideoIdentity {
    pub subject: String,
    pub session: String,
    pub view: String,
}

impl VideoIdentity {
    pub fn new(subject: &str, session: &str, view: &str) -> Self {
        Self {
            subject: subject.to_string(),
            session: session.to_string(),
            view: view.to_string(),
        }
    }

    /// The `sub-{subject}_ses-{session}_view-{view}` filename prefix.
    pub fn video_id(&self) -> String {
        format!(
            "sub-{}_ses-{}_view-{}",
            self.subject, self.session, self.view
        )
    }
}

impl Default for VideoIdentity {
    fn default() -> Self {
        Self::new("unknown", "unknown", "unknown")
    }
}

/// Options controlling a single conversion call.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Filenames to use verbatim in the output instead of derived ones.
    pub filenames: Option<ImageFilenames>,
    pub visibility: VisibilityEncoding,
    /// Overrides the built-in `frame-(\d+)` extraction pattern.
    pub frame_regexp: Option<String>,
    /// Remap output image ids to the frame numbers embedded in the
    /// image filenames.
    pub remap_image_ids: bool,
    /// Identifiers used when filenames are derived.
    pub video_identity: VideoIdentity,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            filenames: None,
            visibility: VisibilityEncoding::Ternary,
            frame_regexp: None,
            remap_image_ids: true,
            video_identity: VideoIdentity::default(),
        }
    }
}
