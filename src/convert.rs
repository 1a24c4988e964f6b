//! Annotation conversion pipeline
//!
//! Validates a loaded label set, derives output image filenames, converts
//! the annotations to the COCO keypoint schema, remaps image ids to the
//! frame numbers embedded in the filenames, and writes the final document.

use log::info;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::coco::{bbox_from_keypoints, Annotation, Category, CocoFile, Image, Info};
use crate::config::{ConvertOptions, VideoIdentity, VisibilityEncoding};
use crate::error::ConvertError;
use crate::loader::{is_dlc_file, load_file};
use crate::types::{Instance, LabelSet, Video, DEFAULT_IMAGE_EXT};

/// Default pattern for extracting the frame number from an image filename.
pub const DEFAULT_FRAME_REGEXP: &str = r"frame-(\d+)";

static DEFAULT_FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_FRAME_REGEXP).expect("valid regex"));

// Matches the last run of digits in a source image stem, e.g.
// "img0042" -> "0042".
static LAST_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Convert a pose annotations file to a COCO keypoint JSON document.
///
/// The source format is inferred from the file extension. Returns the
/// output path on success. Validation and conversion happen fully in
/// memory; nothing is written on failure.
pub fn annotations_to_coco(
    source_path: &Path,
    output_path: &Path,
    options: &ConvertOptions,
) -> Result<PathBuf, ConvertError> {
    let labels = load_file(source_path)?;

    if labels.labeled_frames.is_empty() {
        return Err(ConvertError::NoAnnotationsFound {
            dlc: is_dlc_file(source_path),
        });
    }

    let referenced = labels.referenced_video_count();
    if referenced > 1 {
        return Err(ConvertError::MultipleVideos { count: referenced });
    }

    let filenames = match &options.filenames {
        Some(filenames) => filenames.resolve(labels.labeled_frames.len())?,
        None => derive_image_filenames(&labels, &options.video_identity)?,
    };

    let mut document = convert_labels(&labels, &filenames, options.visibility);
    if options.remap_image_ids {
        document = update_image_ids(document, options.frame_regexp.as_deref())?;
    }

    let json = serde_json::to_vec(&document)?;
    fs::write(output_path, json).map_err(|source| ConvertError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;

    info!(
        "Wrote COCO annotations for {} labeled frames to {}",
        labels.labeled_frames.len(),
        output_path.display()
    );
    Ok(output_path.to_path_buf())
}

/// Derive output image filenames for every labeled frame, in label-set
/// order, following the dataset naming convention
/// `sub-{subject}_ses-{session}_view-{view}_frame-{frameNumber}.{ext}`.
///
/// The frame number of an image-sequence frame is the last digit run in
/// its source image stem, zero-padding preserved, so the output names
/// stay consistent with sibling file-copy operations performed by the
/// caller. Frames of a single-media-file video have no per-frame source
/// path; their stored frame index is used instead.
pub fn derive_image_filenames(
    labels: &LabelSet,
    identity: &VideoIdentity,
) -> Result<Vec<String>, ConvertError> {
    let video_id = identity.video_id();

    labels
        .labeled_frames
        .iter()
        .map(|lf| {
            let video = labels.videos.get(lf.video).ok_or(
                ConvertError::VideoIndexOutOfRange {
                    video: lf.video,
                    available: labels.videos.len(),
                },
            )?;

            match video {
                Video::ImageSequence(paths) => {
                    let source = paths.get(lf.frame_idx).ok_or(
                        ConvertError::FrameIndexOutOfRange {
                            frame_idx: lf.frame_idx,
                            available: paths.len(),
                        },
                    )?;
                    let stem = source
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default();
                    let digits = LAST_DIGITS_RE
                        .find_iter(stem)
                        .last()
                        .map(|m| m.as_str())
                        .ok_or_else(|| ConvertError::FrameNumberNotFound {
                            filename: stem.to_string(),
                            pattern: LAST_DIGITS_RE.as_str().to_string(),
                        })?;
                    let ext = source
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or(DEFAULT_IMAGE_EXT);
                    Ok(format!("{video_id}_frame-{digits}.{ext}"))
                }
                Video::MediaFile(_) => Ok(format!(
                    "{video_id}_frame-{:05}.{DEFAULT_IMAGE_EXT}",
                    lf.frame_idx
                )),
            }
        })
        .collect()
}

/// Convert a label set to the COCO keypoint schema.
///
/// `image_filenames` must hold one filename per labeled frame. Image and
/// annotation ids are assigned sequentially from 1.
pub fn convert_labels(
    labels: &LabelSet,
    image_filenames: &[String],
    visibility: VisibilityEncoding,
) -> CocoFile {
    let category = Category {
        id: 1,
        name: labels.skeleton.name.clone(),
        supercategory: "animal".to_string(),
        keypoints: labels.skeleton.node_names.clone(),
        skeleton: labels
            .skeleton
            .edges
            .iter()
            .map(|&(a, b)| [a as u32 + 1, b as u32 + 1])
            .collect(),
    };

    let mut images = Vec::with_capacity(labels.labeled_frames.len());
    let mut annotations = Vec::new();
    let mut next_annotation_id = 1;

    for (i, (lf, file_name)) in labels
        .labeled_frames
        .iter()
        .zip(image_filenames)
        .enumerate()
    {
        let image_id = i as u64 + 1;
        images.push(Image::new(image_id, file_name.clone()));

        for instance in &lf.instances {
            annotations.push(convert_instance(
                instance,
                next_annotation_id,
                image_id,
                category.id,
                visibility,
            ));
            next_annotation_id += 1;
        }
    }

    CocoFile {
        info: Info::default(),
        images,
        annotations,
        categories: vec![category],
    }
}

fn convert_instance(
    instance: &Instance,
    id: u64,
    image_id: u64,
    category_id: u32,
    visibility: VisibilityEncoding,
) -> Annotation {
    let mut keypoints = Vec::with_capacity(instance.points.len() * 3);
    let mut labeled_positions = Vec::new();

    for point in &instance.points {
        match point {
            Some(point) => {
                let v = match (visibility, point.visible) {
                    (VisibilityEncoding::Ternary, true) => 2.0,
                    (VisibilityEncoding::Ternary, false) => 1.0,
                    (VisibilityEncoding::Binary, true) => 1.0,
                    (VisibilityEncoding::Binary, false) => 0.0,
                };
                keypoints.extend([point.x, point.y, v]);
                labeled_positions.push((point.x, point.y));
            }
            None => keypoints.extend([0.0, 0.0, 0.0]),
        }
    }

    let bbox = bbox_from_keypoints(&labeled_positions);

    Annotation {
        id,
        image_id,
        category_id,
        keypoints,
        num_keypoints: instance.labeled_count() as u32,
        bbox,
        area: bbox[2] * bbox[3],
        iscrowd: 0,
    }
}

/// Extract the integer frame number from a filename using the first
/// capture group of `frame_regexp`.
///
/// Deterministic and side-effect-free; the same filename always yields
/// the same number.
pub fn extract_frame_number(filename: &str, frame_regexp: &Regex) -> Result<u64, ConvertError> {
    frame_regexp
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .and_then(|group| group.as_str().parse::<u64>().ok())
        .ok_or_else(|| ConvertError::FrameNumberNotFound {
            filename: filename.to_string(),
            pattern: frame_regexp.as_str().to_string(),
        })
}

/// Remap every image id to the frame number embedded in its filename,
/// and every annotation's `image_id` through the same mapping.
///
/// Builds a new document rather than patching the input in place. Fails
/// if a filename has no frame number or two images resolve to the same
/// one.
pub fn update_image_ids(
    document: CocoFile,
    frame_regexp: Option<&str>,
) -> Result<CocoFile, ConvertError> {
    let compiled;
    let re = match frame_regexp {
        Some(pattern) => {
            compiled =
                Regex::new(pattern).map_err(|source| ConvertError::InvalidFrameRegexp {
                    pattern: pattern.to_string(),
                    source,
                })?;
            &compiled
        }
        None => &*DEFAULT_FRAME_RE,
    };

    let mut old_to_new: HashMap<u64, u64> = HashMap::with_capacity(document.images.len());
    let mut seen: HashMap<u64, String> = HashMap::with_capacity(document.images.len());
    for image in &document.images {
        let new_id = extract_frame_number(&image.file_name, re)?;
        if let Some(first) = seen.insert(new_id, image.file_name.clone()) {
            return Err(ConvertError::DuplicateFrameId {
                frame_number: new_id,
                first,
                second: image.file_name.clone(),
            });
        }
        old_to_new.insert(image.id, new_id);
    }

    let images = document
        .images
        .iter()
        .map(|image| Image::new(old_to_new[&image.id], image.file_name.clone()))
        .collect();

    let annotations = document
        .annotations
        .iter()
        .map(|annotation| {
            let image_id = *old_to_new.get(&annotation.image_id).ok_or(
                ConvertError::UnknownImageId {
                    image_id: annotation.image_id,
                },
            )?;
            Ok(Annotation {
                image_id,
                ..annotation.clone()
            })
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;

    Ok(CocoFile {
        images,
        annotations,
        ..document
    })
}
