//! Integration test: artifact persistence and the inference engine

mod common;

use ndarray::Array2;
use student_dropout::data::{feature_frame, FeatureFrame, FeatureSchema, Status};
use student_dropout::export::ModelArtifact;
use student_dropout::inference::InferenceEngine;
use student_dropout::DropoutError;

fn saved_artifact(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("model.bin");
    common::trained_artifact().save(&path).unwrap();
    path
}

fn saved_reference(dir: &std::path::Path) -> std::path::PathBuf {
    common::write_raw_csv(dir, 240, 7)
}

#[test]
fn test_artifact_round_trip() {
    let artifact = common::trained_artifact();
    let restored = ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();

    assert_eq!(restored.schema, artifact.schema);
    assert_eq!(restored.metadata.best_params, artifact.metadata.best_params);
    assert_eq!(restored.metadata.cv_f2, artifact.metadata.cv_f2);
    assert!(restored.pipeline.is_fitted());

    let x = feature_frame(&common::prepared_students(60, 99), &artifact.schema).unwrap();
    assert_eq!(
        artifact.pipeline.predict_proba(&x).unwrap(),
        restored.pipeline.predict_proba(&x).unwrap()
    );
}

#[test]
fn test_repeated_loads_give_identical_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let model = saved_artifact(dir.path());
    let reference = saved_reference(dir.path());
    let schema = FeatureSchema::default();

    let first = InferenceEngine::load(&model, &reference, &schema).unwrap();
    let second = InferenceEngine::load(&model, &reference, &schema).unwrap();

    let record = first.default_record();
    assert_eq!(record, second.default_record());

    let a = first.predict(&record).unwrap();
    let b = second.predict(&record).unwrap();
    assert_eq!(a, b);
    assert!((0.0..=1.0).contains(&a.dropout_probability));
    assert_eq!(first.stats().total_predictions, 1);
}

#[test]
fn test_struggling_student_flagged() {
    let engine = InferenceEngine::new(common::trained_artifact().clone(), common::reference_data()).unwrap();
    let form = engine.form();

    let mut struggling = engine.default_record();
    for (name, value) in [
        ("Curricular_units_1st_sem_approved", 0.0),
        ("Curricular_units_2nd_sem_approved", 0.0),
        ("Curricular_units_1st_sem_grade", 2.0),
        ("Curricular_units_2nd_sem_grade", 1.5),
        ("Curricular_units_2nd_sem_without_evaluations", 2.0),
    ] {
        struggling.set_numeric(form, name, value).unwrap();
    }
    struggling.set_categorical(form, "Tuition_fees_up_to_date", "0").unwrap();

    let mut strong = engine.default_record();
    for (name, value) in [
        ("Curricular_units_1st_sem_approved", 7.0),
        ("Curricular_units_2nd_sem_approved", 7.0),
        ("Curricular_units_1st_sem_grade", 15.0),
        ("Curricular_units_2nd_sem_grade", 15.0),
    ] {
        strong.set_numeric(form, name, value).unwrap();
    }
    strong.set_categorical(form, "Tuition_fees_up_to_date", "1").unwrap();

    let risky = engine.predict(&struggling).unwrap();
    let safe = engine.predict(&strong).unwrap();
    assert_eq!(risky.status, Status::Dropout);
    assert_eq!(safe.status, Status::Graduate);
    assert!(risky.verdict().starts_with("Prediction: Dropout (Probability = "));
    assert!(safe.verdict().starts_with("Prediction: Graduate (Dropout probability = "));
}

#[test]
fn test_verdict_follows_pipeline_class() {
    let artifact = common::trained_artifact();
    let engine = InferenceEngine::new(artifact.clone(), common::reference_data()).unwrap();
    let form = engine.form();

    for approved in [0.0, 2.0, 4.0, 6.0, 8.0] {
        let mut record = engine.default_record();
        record.set_numeric(form, "Curricular_units_2nd_sem_approved", approved).unwrap();
        let frame = record.to_feature_frame(&artifact.schema).unwrap();

        let prediction = engine.predict(&record).unwrap();
        assert_eq!(prediction.status.code(), artifact.pipeline.predict(&frame).unwrap()[0]);
        assert_eq!(prediction.dropout_probability, artifact.pipeline.predict_proba(&frame).unwrap()[0]);
    }
}

#[test]
fn test_unseen_category_does_not_raise() {
    let artifact = common::trained_artifact();
    let schema = &artifact.schema;
    let mut categorical = Array2::from_elem((1, schema.categorical.len()), "1".to_string());
    categorical[[0, schema.categorical.len() - 1]] = "424242".to_string();
    let numeric = Array2::from_elem((1, schema.numeric.len()), 5.0);
    let frame = FeatureFrame::new(categorical, numeric).unwrap();

    let proba = artifact.pipeline.predict_proba(&frame).unwrap();
    assert_eq!(proba.len(), 1);
    assert!(proba[0].is_finite());
}

#[test]
fn test_schema_mismatch_detected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let model = saved_artifact(dir.path());

    let mut other = FeatureSchema::default();
    other.numeric.pop();
    let err = ModelArtifact::load_for_schema(&model, &other).unwrap_err();
    assert!(matches!(err, DropoutError::SchemaMismatch(_)));

    let reference = saved_reference(dir.path());
    assert!(matches!(
        InferenceEngine::load(&model, &reference, &other),
        Err(DropoutError::SchemaMismatch(_))
    ));
}

#[test]
fn test_checksum_corruption_detected() {
    let dir = tempfile::tempdir().unwrap();
    let model = saved_artifact(dir.path());

    let mut bytes = std::fs::read(&model).unwrap();
    // Last payload byte sits just before the trailing u64 checksum
    let idx = bytes.len() - 9;
    bytes[idx] ^= 0xFF;
    std::fs::write(&model, &bytes).unwrap();

    let err = ModelArtifact::load(&model).unwrap_err();
    match err {
        DropoutError::SerializationError(msg) => assert!(msg.contains("checksum")),
        other => panic!("expected checksum error, got {other:?}"),
    }
}

#[test]
fn test_truncated_artifact_rejected() {
    let bytes = common::trained_artifact().to_bytes().unwrap();
    assert!(ModelArtifact::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}

#[test]
fn test_invalid_form_values_rejected() {
    let engine = InferenceEngine::new(common::trained_artifact().clone(), common::reference_data()).unwrap();
    let form = engine.form();
    let mut record = engine.default_record();

    assert!(matches!(
        record.set_numeric(form, "Age_at_enrollment", 71.0),
        Err(DropoutError::InvalidInput(_))
    ));
    assert!(matches!(
        record.set_categorical(form, "Course", "1"),
        Err(DropoutError::InvalidInput(_))
    ));
    assert_eq!(record, engine.default_record());
}
