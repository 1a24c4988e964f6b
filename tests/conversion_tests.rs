//! Integration tests for the annotation conversion pipeline, driving it
//! end-to-end over on-disk DLC projects and JSON label sets.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use pose2coco::{
    annotations_to_coco, ConvertError, ConvertOptions, ImageFilenames, Instance, LabelSet,
    LabeledFrame, Point, Skeleton, Video, VideoIdentity, VisibilityEncoding,
};

const SINGLE_INDEX_FRAMES: &[&str] = &[
    "img0000.png",
    "img0001.png",
    "img0002.png",
    "img0003.png",
    "img0004.png",
];

const MULTI_INDEX_FRAMES: &[&str] = &[
    "img006825.png",
    "img020465.png",
    "img028360.png",
    "img053600.png",
    "img081960.png",
];

#[derive(Clone, Copy)]
enum CsvFormat {
    // Image path in one column
    SingleIndex,
    // Image path split across three columns
    MultiIndex,
}

#[derive(Clone, Copy)]
enum CsvLocation {
    VideoFolder,
    ProjectRoot,
}

fn single_index_csv(video: &str) -> String {
    let mut csv = String::from(
        "scorer,Pranav,Pranav,Pranav,Pranav\n\
         bodyparts,snout,snout,leftear,leftear\n\
         coords,x,y,x,y\n",
    );
    for (i, frame) in SINGLE_INDEX_FRAMES.iter().enumerate() {
        csv.push_str(&format!(
            "labeled-data/{video}/{frame},{}.0,{}.5,{}.0,\n",
            100 + i,
            50 + i,
            10 + i
        ));
    }
    csv
}

fn multi_index_csv(video: &str) -> String {
    let mut csv = String::from(
        "scorer,,,Shailaja,Shailaja,Shailaja,Shailaja\n\
         bodyparts,,,nose,nose,earL,earL\n\
         coords,,,x,y,x,y\n",
    );
    for (i, frame) in MULTI_INDEX_FRAMES.iter().enumerate() {
        csv.push_str(&format!(
            "labeled-data,{video},{frame},{}.0,{}.0,{}.5,{}.5\n",
            17 + i,
            23 + i,
            40 + i,
            18 + i
        ));
    }
    csv
}

/// Create a mock DLC project with a CSV and dummy frame files, returning
/// the CSV path.
fn create_dlc_project(root: &Path, format: CsvFormat, location: CsvLocation) -> PathBuf {
    let (video, frames, csv_name, contents) = match format {
        CsvFormat::SingleIndex => (
            "m4s1",
            SINGLE_INDEX_FRAMES,
            "CollectedData_Pranav.csv",
            single_index_csv("m4s1"),
        ),
        CsvFormat::MultiIndex => (
            "1052533639_530862_20200924.face",
            MULTI_INDEX_FRAMES,
            "CollectedData_Shailaja.csv",
            multi_index_csv("1052533639_530862_20200924.face"),
        ),
    };

    let video_dir = root.join("labeled-data").join(video);
    fs::create_dir_all(&video_dir).unwrap();
    for frame in frames {
        // Minimal PNG stand-in; the converter never reads pixels
        fs::write(video_dir.join(frame), b"\x89PNG\r\n\x1a\n").unwrap();
    }

    let csv_path = match location {
        CsvLocation::VideoFolder => video_dir.join(csv_name),
        CsvLocation::ProjectRoot => root.join(csv_name),
    };
    fs::write(&csv_path, contents).unwrap();
    csv_path
}

fn write_labels_json(path: &Path, labels: &LabelSet) {
    fs::write(path, serde_json::to_string(labels).unwrap()).unwrap();
}

fn two_frame_labels() -> LabelSet {
    LabelSet {
        videos: vec![Video::ImageSequence(vec![
            PathBuf::from("labeled-data/m4s1/img0000.png"),
            PathBuf::from("labeled-data/m4s1/img0001.png"),
        ])],
        skeleton: Skeleton::new(vec!["snout".to_string(), "leftear".to_string()]),
        labeled_frames: (0..2)
            .map(|i| LabeledFrame {
                video: 0,
                frame_idx: i,
                instances: vec![Instance {
                    points: vec![
                        Some(Point {
                            x: 10.0 + i as f64,
                            y: 20.0,
                            visible: true,
                        }),
                        Some(Point {
                            x: 30.0,
                            y: 40.0,
                            visible: false,
                        }),
                    ],
                }],
            })
            .collect(),
    }
}

fn read_document(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn image_ids(document: &serde_json::Value) -> Vec<u64> {
    document["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|img| img["id"].as_u64().unwrap())
        .collect()
}

#[test]
fn test_convert_dlc_projects_in_all_layouts() {
    for format in [CsvFormat::SingleIndex, CsvFormat::MultiIndex] {
        for location in [CsvLocation::VideoFolder, CsvLocation::ProjectRoot] {
            let dir = tempfile::tempdir().unwrap();
            let csv_path = create_dlc_project(dir.path(), format, location);
            let output_path = dir.path().join("output.json");

            let result =
                annotations_to_coco(&csv_path, &output_path, &ConvertOptions::default());
            assert_eq!(result.unwrap(), output_path);
            assert!(output_path.exists());

            let document = read_document(&output_path);
            assert_eq!(document["images"].as_array().unwrap().len(), 5);
            assert_eq!(document["annotations"].as_array().unwrap().len(), 5);
            assert_eq!(document["categories"].as_array().unwrap().len(), 1);
        }
    }
}

#[test]
fn test_image_ids_equal_frame_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = create_dlc_project(dir.path(), CsvFormat::MultiIndex, CsvLocation::VideoFolder);
    let output_path = dir.path().join("output.json");

    annotations_to_coco(&csv_path, &output_path, &ConvertOptions::default()).unwrap();

    let document = read_document(&output_path);
    assert_eq!(image_ids(&document), vec![6825, 20465, 28360, 53600, 81960]);
}

#[test]
fn test_referential_integrity_and_derived_filenames() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = create_dlc_project(dir.path(), CsvFormat::SingleIndex, CsvLocation::VideoFolder);
    let output_path = dir.path().join("output.json");

    let options = ConvertOptions {
        video_identity: VideoIdentity::new("M708149", "20200317", "topdown"),
        ..ConvertOptions::default()
    };
    annotations_to_coco(&csv_path, &output_path, &options).unwrap();

    let document = read_document(&output_path);
    let ids: HashSet<u64> = image_ids(&document).into_iter().collect();
    assert_eq!(ids.len(), 5);
    for annotation in document["annotations"].as_array().unwrap() {
        assert!(ids.contains(&annotation["image_id"].as_u64().unwrap()));
    }

    // Derived names follow the dataset naming convention, and each
    // image id equals the frame number parsed from its filename
    let images = document["images"].as_array().unwrap();
    assert_eq!(
        images[0]["file_name"],
        "sub-M708149_ses-20200317_view-topdown_frame-0000.png"
    );
    for image in images {
        let file_name = image["file_name"].as_str().unwrap();
        let frame: u64 = file_name
            .split("frame-")
            .nth(1)
            .and_then(|rest| rest.split('.').next())
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(image["id"].as_u64().unwrap(), frame);
    }
}

#[test]
fn test_conversion_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = create_dlc_project(dir.path(), CsvFormat::SingleIndex, CsvLocation::VideoFolder);
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    annotations_to_coco(&csv_path, &first, &ConvertOptions::default()).unwrap();
    annotations_to_coco(&csv_path, &second, &ConvertOptions::default()).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_empty_dlc_file_mentions_project_layout() {
    // Comma-corrupted frame paths are the most common cause of an empty
    // DLC label set
    let corrupted = "\
scorer,Loukia,Loukia\n\
bodyparts,snout,snout\n\
coords,x,y\n\
labeled-data,m4s1,img0000.png,1.0,2.0\n";
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("CollectedData_Loukia.csv");
    fs::write(&csv_path, corrupted).unwrap();

    let err = annotations_to_coco(
        &csv_path,
        &dir.path().join("output.json"),
        &ConvertOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::NoAnnotationsFound { dlc: true }));
    let message = err.to_string();
    assert!(message.contains("No annotations could be extracted"));
    assert!(message.contains("labeled-data/<video-name>/<filename-with-frame-number>.<extension>"));
}

#[test]
fn test_empty_label_set_generic_message() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    let empty = LabelSet {
        videos: vec![],
        skeleton: Skeleton::new(vec!["snout".to_string()]),
        labeled_frames: vec![],
    };
    write_labels_json(&labels_path, &empty);

    let err = annotations_to_coco(
        &labels_path,
        &dir.path().join("output.json"),
        &ConvertOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::NoAnnotationsFound { dlc: false }));
    assert!(!err.to_string().contains("labeled-data"));
}

#[test]
fn test_multiple_videos_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");

    let mut labels = two_frame_labels();
    labels.videos.push(Video::ImageSequence(vec![PathBuf::from(
        "labeled-data/m3s2/img0000.png",
    )]));
    labels.labeled_frames[1].video = 1;
    labels.labeled_frames[1].frame_idx = 0;
    write_labels_json(&labels_path, &labels);

    let err = annotations_to_coco(
        &labels_path,
        &dir.path().join("output.json"),
        &ConvertOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::MultipleVideos { count: 2 }));
    assert!(err.to_string().contains("2"));
}

#[test]
fn test_duplicate_frame_numbers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    write_labels_json(&labels_path, &two_frame_labels());

    let options = ConvertOptions {
        filenames: Some(ImageFilenames::PerFrame(vec![
            "frame-0005.png".to_string(),
            "frame-0005.png".to_string(),
        ])),
        ..ConvertOptions::default()
    };
    let output_path = dir.path().join("output.json");
    let err = annotations_to_coco(&labels_path, &output_path, &options).unwrap_err();

    assert!(err.to_string().contains("Extracted image IDs are not unique"));
    // No partial output on failure
    assert!(!output_path.exists());
}

#[test]
fn test_explicit_filenames_used_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    write_labels_json(&labels_path, &two_frame_labels());

    let options = ConvertOptions {
        filenames: Some(ImageFilenames::PerFrame(vec![
            "custom_frame-0011.png".to_string(),
            "custom_frame-0012.png".to_string(),
        ])),
        ..ConvertOptions::default()
    };
    let output_path = dir.path().join("output.json");
    annotations_to_coco(&labels_path, &output_path, &options).unwrap();

    let document = read_document(&output_path);
    assert_eq!(image_ids(&document), vec![11, 12]);
    assert_eq!(
        document["images"][0]["file_name"],
        "custom_frame-0011.png"
    );
}

#[test]
fn test_single_filename_requires_single_frame() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    write_labels_json(&labels_path, &two_frame_labels());

    let options = ConvertOptions {
        filenames: Some(ImageFilenames::Single("frame-0001.png".to_string())),
        ..ConvertOptions::default()
    };
    let err = annotations_to_coco(
        &labels_path,
        &dir.path().join("output.json"),
        &options,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ConvertError::FilenameCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn test_keep_image_ids_skips_remapping() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = create_dlc_project(dir.path(), CsvFormat::MultiIndex, CsvLocation::VideoFolder);
    let output_path = dir.path().join("output.json");

    let options = ConvertOptions {
        remap_image_ids: false,
        ..ConvertOptions::default()
    };
    annotations_to_coco(&csv_path, &output_path, &options).unwrap();

    let document = read_document(&output_path);
    assert_eq!(image_ids(&document), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_visibility_encodings_in_output() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");

    let mut labels = two_frame_labels();
    labels.labeled_frames.truncate(1);
    // snout visible, leftear occluded, tailbase unlabeled
    labels.skeleton.node_names.push("tailbase".to_string());
    labels.labeled_frames[0].instances[0].points.push(None);
    write_labels_json(&labels_path, &labels);

    let keypoints_for = |visibility: VisibilityEncoding| {
        let options = ConvertOptions {
            filenames: Some(ImageFilenames::Single("frame-0000.png".to_string())),
            visibility,
            ..ConvertOptions::default()
        };
        let output_path = dir.path().join("output.json");
        annotations_to_coco(&labels_path, &output_path, &options).unwrap();
        let document = read_document(&output_path);
        document["annotations"][0]["keypoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect::<Vec<f64>>()
    };

    assert_eq!(
        keypoints_for(VisibilityEncoding::Ternary),
        vec![10.0, 20.0, 2.0, 30.0, 40.0, 1.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(
        keypoints_for(VisibilityEncoding::Binary),
        vec![10.0, 20.0, 1.0, 30.0, 40.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn test_custom_frame_regexp() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    write_labels_json(&labels_path, &two_frame_labels());

    let options = ConvertOptions {
        filenames: Some(ImageFilenames::PerFrame(vec![
            "img0011.png".to_string(),
            "img0012.png".to_string(),
        ])),
        frame_regexp: Some(r"img(\d+)".to_string()),
        ..ConvertOptions::default()
    };
    let output_path = dir.path().join("output.json");
    annotations_to_coco(&labels_path, &output_path, &options).unwrap();

    assert_eq!(image_ids(&read_document(&output_path)), vec![11, 12]);
}

#[test]
fn test_unmatched_frame_pattern_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("labels.json");
    write_labels_json(&labels_path, &two_frame_labels());

    let options = ConvertOptions {
        filenames: Some(ImageFilenames::PerFrame(vec![
            "snout.png".to_string(),
            "leftear.png".to_string(),
        ])),
        ..ConvertOptions::default()
    };
    let err = annotations_to_coco(
        &labels_path,
        &dir.path().join("output.json"),
        &options,
    )
    .unwrap_err();

    assert!(err
        .to_string()
        .contains("No frame number could be extracted"));
}
