//! Integration test: resampled cross-validation, grid search and training

mod common;

use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use student_dropout::data::{feature_frame, labels, FeatureFrame, FeatureSchema};
use student_dropout::optimizer::{ErrorScore, GridSearchCV, LogisticParamGrid};
use student_dropout::preprocessing::build_preprocessors;
use student_dropout::synthetic::SMOTE;
use student_dropout::training::{
    cross_val_score, resampling_scores, resampling_scores_with, stratified_train_test_split, Classifier,
    CrossValidator, LogisticRegression, Penalty, ResampledPipeline, Solver, TrainEngine,
};
use student_dropout::{DropoutError, Result};

fn dataset(n: usize, seed: u64) -> (FeatureFrame, Array1<i64>) {
    let df = common::prepared_students(n, seed);
    let schema = FeatureSchema::default();
    (feature_frame(&df, &schema).unwrap(), labels(&df, &schema).unwrap())
}

#[test]
fn test_fold_assignment_is_deterministic() {
    let (_, y) = dataset(150, 11);
    let a = CrossValidator::default().split(y.len(), Some(&y)).unwrap();
    let b = CrossValidator::default().split(y.len(), Some(&y)).unwrap();
    assert_eq!(a, b);

    let c = CrossValidator::default().with_random_state(7).split(y.len(), Some(&y)).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_mean_f2_is_deterministic() {
    let (x, y) = dataset(150, 12);
    let (_, robust) = build_preprocessors(&FeatureSchema::default());
    let model = LogisticRegression::new();
    let cv = CrossValidator::default();

    let first = resampling_scores(&model, &x, &y, &robust, &cv).unwrap();
    let second = resampling_scores(&model, &x, &y, &robust, &cv).unwrap();
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.mean_score, second.mean_score);
    assert_eq!(first.n_folds, 5);
    assert!(first.mean_score > 0.5, "separable fixture should score well, got {}", first.mean_score);
}

/// Records the rows it is fitted and scored on
#[derive(Debug, Clone, Default)]
struct SpyClassifier {
    fits: Arc<Mutex<Vec<BTreeMap<i64, usize>>>>,
    scored_rows: Arc<Mutex<Vec<usize>>>,
}

impl Classifier for SpyClassifier {
    fn name(&self) -> &str {
        "Spy"
    }

    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let mut counts = BTreeMap::new();
        for &label in y {
            *counts.entry(label).or_insert(0) += 1;
        }
        self.fits.lock().unwrap().push(counts);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.scored_rows.lock().unwrap().push(x.nrows());
        Ok(Array1::zeros(x.nrows()))
    }

    fn is_fitted(&self) -> bool {
        true
    }
}

#[test]
fn test_resampling_only_touches_training_folds() {
    let (x, y) = dataset(150, 13);
    let (_, robust) = build_preprocessors(&FeatureSchema::default());
    let spy = SpyClassifier::default();
    let pipeline = ResampledPipeline::new(robust, SMOTE::new().with_seed(42), spy.clone());

    let splits = CrossValidator::default().split(y.len(), Some(&y)).unwrap();
    cross_val_score(&pipeline, &x, &y, &splits, 2.0).unwrap();

    let fits = spy.fits.lock().unwrap();
    assert_eq!(fits.len(), 5);
    for counts in fits.iter() {
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&0], counts[&1], "training folds are balanced");
    }

    // Test folds reach the classifier untouched: every record scored once
    let scored: usize = spy.scored_rows.lock().unwrap().iter().sum();
    assert_eq!(scored, y.len());
}

#[test]
fn test_grid_search_fails_fast() {
    let (x, y) = dataset(120, 14);
    let (_, robust) = build_preprocessors(&FeatureSchema::default());
    let grid = LogisticParamGrid {
        c: vec![1.0],
        l1_ratio: vec![0.5],
        max_iter: vec![100],
        penalty: vec![Penalty::L2, Penalty::L1],
        solver: vec![Solver::Lbfgs],
    };

    let err = GridSearchCV::new(grid).fit(&robust, &x, &y).unwrap_err();
    assert!(matches!(err, DropoutError::TrainingError(_)));
    assert!(err.to_string().contains("penalty"));
}

#[test]
fn test_grid_search_error_score_value() {
    let (x, y) = dataset(120, 15);
    let (_, robust) = build_preprocessors(&FeatureSchema::default());
    let grid = LogisticParamGrid {
        c: vec![1.0],
        l1_ratio: vec![0.5],
        max_iter: vec![100],
        penalty: vec![Penalty::L1, Penalty::L2],
        solver: vec![Solver::Lbfgs],
    };

    let result = GridSearchCV::new(grid)
        .with_error_score(ErrorScore::Value(0.0))
        .fit(&robust, &x, &y)
        .unwrap();
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.candidates[0].cv.mean_score, 0.0);
    assert_eq!(result.best_params.penalty, Penalty::L2);
    assert_eq!(result.best_candidate().rank, 1);
    assert!(result.best_estimator.is_fitted());
}

#[test]
fn test_train_engine_end_to_end() {
    let df = common::prepared_students(200, 16);
    let outcome = TrainEngine::new(common::small_config()).train(&df).unwrap();

    assert_eq!(outcome.n_train + outcome.n_test, df.height());
    assert_eq!(outcome.n_test, (df.height() as f64 * 0.2).ceil() as usize);
    assert!(outcome.best_score > 0.5);
    assert_eq!(outcome.baseline.n_folds, 5);
    assert!(outcome.pipeline.is_fitted());
    assert!(common::small_grid().candidates().contains(&outcome.best_params));

    let test = &outcome.evaluation.test;
    assert!(test.class("0").is_some());
    assert!(test.class("1").is_some());
    assert_eq!(test.macro_avg.support, outcome.n_test);

    // The held-out split never leaks into training
    let train_support: usize = outcome.evaluation.train.classes.iter().map(|c| c.support).sum();
    assert_eq!(train_support, outcome.n_train);
}

#[test]
fn test_train_engine_baseline_matches_resampling_scores() {
    let df = common::prepared_students(200, 19);
    let config = common::small_config();
    let outcome = TrainEngine::new(config.clone()).train(&df).unwrap();

    let (x, y) = (
        feature_frame(&df, &FeatureSchema::default()).unwrap(),
        labels(&df, &FeatureSchema::default()).unwrap(),
    );
    let (train_idx, _) = stratified_train_test_split(&y, config.test_size, config.random_state).unwrap();
    let x_train = x.select_rows(&train_idx);
    let y_train = y.select(Axis(0), &train_idx);
    let (_, robust) = build_preprocessors(&FeatureSchema::default());

    let expected = resampling_scores_with(
        &LogisticRegression::new(),
        &x_train,
        &y_train,
        &robust,
        config.sampler(),
        &config.cross_validator(),
        config.beta,
    )
    .unwrap();
    assert_eq!(outcome.baseline.scores, expected.scores);

    // Default config: the workflow baseline is the seed-42, beta-2 score
    let default_path =
        resampling_scores(&LogisticRegression::new(), &x_train, &y_train, &robust, &CrossValidator::default()).unwrap();
    assert_eq!(outcome.baseline.scores, default_path.scores);
}

#[test]
fn test_train_engine_runs_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_raw_csv(dir.path(), 160, 17);
    let model = dir.path().join("model.bin");
    let config = common::small_config().with_data_path(&data).with_model_path(&model);

    let outcome = TrainEngine::new(config).run().unwrap();
    assert_eq!(outcome.artifact_path.as_deref(), Some(model.as_path()));
    assert!(model.exists());
}

#[test]
fn test_rows_selected_per_fold_cover_dataset() {
    let (x, y) = dataset(100, 18);
    let splits = CrossValidator::default().split(y.len(), Some(&y)).unwrap();
    let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..y.len()).collect::<Vec<_>>());

    let fold = &splits[0];
    assert_eq!(x.select_rows(&fold.test_indices).n_rows(), fold.test_indices.len());
    assert_eq!(y.select(Axis(0), &fold.train_indices).len(), fold.train_indices.len());
}
