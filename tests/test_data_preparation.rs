//! Integration test: loading and cleaning student records

mod common;

use polars::prelude::*;
use student_dropout::data::{
    feature_frame, labels, load_data, prepare_frame, FeatureSchema, ReferenceData, DROPPED_COLUMNS,
};
use student_dropout::DropoutError;

#[test]
fn test_enrolled_rows_removed() {
    let raw = common::raw_students(200, 1);
    let enrolled = raw
        .column("Status")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .filter(|v| *v == Some("Enrolled"))
        .count();
    assert!(enrolled > 0);

    let prepared = prepare_frame(&raw).unwrap();
    assert_eq!(prepared.height(), raw.height() - enrolled);
}

#[test]
fn test_label_mapping() {
    let raw = common::raw_students(200, 2);
    let raw_status: Vec<String> = raw
        .column("Status")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .filter(|s| *s != "Enrolled")
        .map(str::to_string)
        .collect();

    let prepared = prepare_frame(&raw).unwrap();
    let y = labels(&prepared, &FeatureSchema::default()).unwrap();
    assert_eq!(y.len(), raw_status.len());
    for (label, code) in raw_status.iter().zip(y.iter()) {
        let expected = if label == "Dropout" { 1 } else { 0 };
        assert_eq!(*code, expected);
    }
}

#[test]
fn test_dropped_columns_absent_others_present() {
    let raw = common::raw_students(50, 3);
    let prepared = prepare_frame(&raw).unwrap();
    let names: Vec<String> = prepared.get_column_names().iter().map(|s| s.to_string()).collect();

    for dropped in DROPPED_COLUMNS {
        assert!(!names.iter().any(|n| n == dropped), "{} should be dropped", dropped);
    }
    for feature in FeatureSchema::default().feature_names() {
        assert!(names.contains(&feature), "{} should be kept", feature);
    }
    assert!(names.iter().any(|n| n == "Status"));
    assert_eq!(prepared.width(), raw.width() - DROPPED_COLUMNS.len());
}

#[test]
fn test_load_data_matches_in_memory_preparation() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_raw_csv(dir.path(), 120, 4);

    let loaded = load_data(&path).unwrap();
    let prepared = common::prepared_students(120, 4);
    assert_eq!(loaded.height(), prepared.height());
    assert_eq!(loaded.width(), prepared.width());

    let schema = FeatureSchema::default();
    assert_eq!(labels(&loaded, &schema).unwrap(), labels(&prepared, &schema).unwrap());
    let frame = feature_frame(&loaded, &schema).unwrap();
    assert_eq!(frame.categorical.ncols(), 11);
    assert_eq!(frame.numeric.ncols(), 15);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_data(dir.path().join("nope.csv"));
    assert!(result.is_err());
}

#[test]
fn test_missing_dropped_column_is_an_error() {
    let raw = common::raw_students(30, 5).drop("GDP").unwrap();
    let err = prepare_frame(&raw).unwrap_err();
    assert!(matches!(err, DropoutError::FeatureNotFound(ref name) if name == "GDP"));
}

#[test]
fn test_reference_options_sorted_numerically() {
    let reference = ReferenceData::from_frame(&common::prepared_students(200, 6), &FeatureSchema::default()).unwrap();
    assert_eq!(reference.features().len(), 11);
    assert_eq!(reference.options("Course").unwrap(), ["33", "171", "9500", "9773"]);
    assert_eq!(reference.options("Application_mode").unwrap(), ["1", "17", "39"]);
}

#[test]
fn test_reference_load_skips_enrolled() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_raw_csv(dir.path(), 150, 8);
    let reference = ReferenceData::load(&path, &FeatureSchema::default()).unwrap();
    assert_eq!(reference.n_records(), common::prepared_students(150, 8).height());
}
