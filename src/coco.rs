//! COCO keypoint format data structures and utilities
//!
//! This module provides the output schema for keypoint annotations in
//! COCO format, with one category describing the keypoint skeleton.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// COCO dataset information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub year: u32,
    pub version: String,
    pub description: String,
    pub contributor: String,
    pub url: String,
    pub date_created: String,
}

impl Default for Info {
    fn default() -> Self {
        let now = chrono::Utc::now();
        Self {
            year: now.year() as u32,
            version: "1.0".to_string(),
            description: "Exported pose keypoint annotations".to_string(),
            contributor: "pose2coco".to_string(),
            url: String::new(),
            date_created: now.date_naive().to_string(),
        }
    }
}

/// COCO keypoint category: the keypoint schema for one object class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
    /// Keypoint names, in skeleton node order.
    pub keypoints: Vec<String>,
    /// Skeleton edges as pairs of 1-based keypoint indices.
    pub skeleton: Vec<[u32; 2]>,
}

/// COCO image information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub file_name: String,
}

impl Image {
    pub fn new(id: u64, file_name: String) -> Self {
        Self { id, file_name }
    }
}

/// COCO keypoint annotation information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// Flat `[x, y, v]` triples, one per category keypoint.
    pub keypoints: Vec<f64>,
    /// Number of labeled keypoints in this annotation.
    pub num_keypoints: u32,
    pub bbox: [f64; 4], // [x, y, width, height]
    pub area: f64,
    pub iscrowd: u32,
}

/// Complete COCO keypoint dataset structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoFile {
    pub info: Info,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

/// Calculate a bounding box from labeled keypoint positions.
///
/// Returns `[x, y, width, height]`, or all zeros when no keypoint is
/// labeled.
pub fn bbox_from_keypoints(points: &[(f64, f64)]) -> [f64; 4] {
    if points.is_empty() {
        return [0.0, 0.0, 0.0, 0.0];
    }

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    );

    [min_x, min_y, max_x - min_x, max_y - min_y]
}
