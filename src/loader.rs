//! Label-set loading
//!
//! Infers the annotation format of a source file from its extension and
//! normalizes every supported format into the internal [`LabelSet`]
//! representation before the converter sees it.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::types::{Instance, LabelSet, LabeledFrame, Point, Skeleton, Video};

/// Source annotation formats supported by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// DeepLabCut `CollectedData_*.csv` export.
    DlcCsv,
    /// JSON serialization of the internal label-set model.
    LabelsJson,
}

impl SourceFormat {
    /// Infer the format from a file extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase()
            .as_str()
        {
            "csv" => Some(Self::DlcCsv),
            "json" => Some(Self::LabelsJson),
            _ => None,
        }
    }
}

/// Load an annotations file, inferring its format from the extension.
pub fn load_file(path: &Path) -> Result<LabelSet, ConvertError> {
    match SourceFormat::from_path(path) {
        Some(SourceFormat::DlcCsv) => load_dlc_csv(path),
        Some(SourceFormat::LabelsJson) => load_labels_json(path),
        None => Err(ConvertError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Whether a path looks like a native DLC annotations file.
///
/// DLC projects store annotations as `CollectedData_<scorer>.csv` (or
/// `.h5`); a renamed CSV is still recognized by its `scorer` header row.
pub fn is_dlc_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    if ext != "csv" && ext != "h5" {
        return false;
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if stem.starts_with("CollectedData") {
        return true;
    }

    if ext == "csv" {
        if let Ok(file) = File::open(path) {
            let mut first_line = String::new();
            if BufReader::new(file).read_line(&mut first_line).is_ok() {
                return first_line.starts_with("scorer");
            }
        }
    }

    false
}

fn load_labels_json(path: &Path) -> Result<LabelSet, ConvertError> {
    let file = File::open(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(file).map_err(|e| ConvertError::InvalidSource {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// Number of leading path columns in a DLC CSV: one for single-index
// files (`labeled-data/<video>/<file>` in one cell) or three for
// multi-index files (the path split across cells).
fn dlc_path_column_count(scorer_row: &[&str]) -> usize {
    1 + scorer_row
        .iter()
        .skip(1)
        .take_while(|cell| cell.is_empty())
        .count()
}

/// Parse a DLC `CollectedData_*.csv` annotations export.
///
/// Data rows whose image path is not in the `labeled-data/<video>/<file>`
/// shape are skipped; a file whose every row is malformed therefore
/// loads as an empty label set.
fn load_dlc_csv(path: &Path) -> Result<LabelSet, ConvertError> {
    let contents = fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |message: &str| ConvertError::InvalidSource {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let rows: Vec<Vec<&str>> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(str::trim).collect())
        .collect();

    let mut rows_iter = rows.iter();
    let scorer_row = rows_iter
        .next()
        .filter(|row| row.first() == Some(&"scorer"))
        .ok_or_else(|| invalid("missing 'scorer' header row"))?;
    let path_cols = dlc_path_column_count(scorer_row);

    let bodyparts_row = rows_iter
        .next()
        .ok_or_else(|| invalid("missing 'bodyparts' header row"))?;
    if bodyparts_row.first() == Some(&"individuals") {
        return Err(invalid(
            "multi-animal DLC files ('individuals' header) are not supported",
        ));
    }
    if bodyparts_row.first() != Some(&"bodyparts") {
        return Err(invalid("missing 'bodyparts' header row"));
    }
    rows_iter
        .next()
        .filter(|row| row.first() == Some(&"coords"))
        .ok_or_else(|| invalid("missing 'coords' header row"))?;

    // Body part names repeat once per coordinate column (x, y)
    let node_names: Vec<String> = bodyparts_row
        .get(path_cols..)
        .unwrap_or_default()
        .iter()
        .step_by(2)
        .map(|name| name.to_string())
        .collect();
    if node_names.is_empty() {
        return Err(invalid("no body parts defined in header"));
    }

    // One video per labeled-data folder, frames in row order
    let mut video_paths: Vec<Vec<PathBuf>> = Vec::new();
    let mut video_index: HashMap<String, usize> = HashMap::new();
    let mut labeled_frames = Vec::new();

    for row in rows_iter {
        let Some((folder, image_name)) = dlc_frame_path(row, path_cols) else {
            warn!(
                "Skipping row with unrecognized frame path in {}: '{}'",
                path.display(),
                row.first().unwrap_or(&"")
            );
            continue;
        };

        let video = *video_index.entry(folder.clone()).or_insert_with(|| {
            video_paths.push(Vec::new());
            video_paths.len() - 1
        });
        let frame_path: PathBuf = ["labeled-data", folder.as_str(), image_name.as_str()]
            .iter()
            .collect();
        let frame_idx = video_paths[video].len();
        video_paths[video].push(frame_path);

        let instance = parse_dlc_instance(&row[path_cols..], node_names.len());
        labeled_frames.push(LabeledFrame {
            video,
            frame_idx,
            instances: vec![instance],
        });
    }

    debug!(
        "Loaded {} labeled frames across {} videos from {}",
        labeled_frames.len(),
        video_paths.len(),
        path.display()
    );

    Ok(LabelSet {
        videos: video_paths.into_iter().map(Video::ImageSequence).collect(),
        skeleton: Skeleton::new(node_names),
        labeled_frames,
    })
}

// Resolve a data row's frame path into (video folder, image filename).
// Single-index rows keep the whole path in the first cell; multi-index
// rows split it across the first three cells.
fn dlc_frame_path(row: &[&str], path_cols: usize) -> Option<(String, String)> {
    if path_cols == 1 {
        // Paths are minimally labeled-data/<video>/<file>; anything
        // before the labeled-data component is ignored
        let parts: Vec<&str> = row.first()?.split('/').collect();
        match parts.as_slice() {
            [.., "labeled-data", folder, image] if !folder.is_empty() && !image.is_empty() => {
                Some((folder.to_string(), image.to_string()))
            }
            _ => None,
        }
    } else {
        match row {
            ["labeled-data", folder, image, ..] if !folder.is_empty() && !image.is_empty() => {
                Some((folder.to_string(), image.to_string()))
            }
            _ => None,
        }
    }
}

// DLC stores one (x, y) column pair per body part; empty or NaN cells
// mean the keypoint was not labeled. DLC has no occlusion flag, so
// every labeled keypoint is visible.
fn parse_dlc_instance(coord_cells: &[&str], node_count: usize) -> Instance {
    let points = (0..node_count)
        .map(|node| {
            let x = coord_cells.get(node * 2).and_then(|cell| parse_coord(cell));
            let y = coord_cells
                .get(node * 2 + 1)
                .and_then(|cell| parse_coord(cell));
            match (x, y) {
                (Some(x), Some(y)) => Some(Point {
                    x,
                    y,
                    visible: true,
                }),
                _ => None,
            }
        })
        .collect();

    Instance { points }
}

fn parse_coord(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|value| !value.is_nan())
}
