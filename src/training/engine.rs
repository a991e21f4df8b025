//! Offline training workflow

use super::cross_validation::{resampling_scores_with, stratified_train_test_split, CVResults};
use super::metrics::ClassificationReport;
use super::{Classifier, LogisticRegression, PipelineConfig, ResampledPipeline};
use crate::data::{labels, load_data, FeatureFrame, FeatureSchema};
use crate::error::Result;
use crate::export::{ArtifactMetadata, ModelArtifact};
use crate::optimizer::{GridSearchCV, LogisticParams};
use crate::preprocessing::build_preprocessors;
use ndarray::{Array1, Axis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Train and test classification reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train: ClassificationReport,
    pub test: ClassificationReport,
}

/// Fit `pipeline` on the training split and report on both splits
pub fn evaluate_model<C>(
    pipeline: &mut ResampledPipeline<C>,
    x_train: &FeatureFrame,
    y_train: &Array1<i64>,
    x_test: &FeatureFrame,
    y_test: &Array1<i64>,
) -> Result<EvaluationReport>
where
    C: Classifier + Clone,
{
    pipeline.fit(x_train, y_train)?;

    let train = ClassificationReport::new(y_train, &pipeline.predict(x_train)?)?;
    let test = ClassificationReport::new(y_test, &pipeline.predict(x_test)?)?;

    info!("Train Classification Report:\n{}", train);
    info!("Test Classification Report:\n{}", test);

    Ok(EvaluationReport { train, test })
}

/// Everything produced by one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub schema: FeatureSchema,
    pub baseline: CVResults,
    pub best_params: LogisticParams,
    pub best_score: f64,
    pub evaluation: EvaluationReport,
    pub pipeline: ResampledPipeline<LogisticRegression>,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
    /// Set once the artifact has been written
    pub artifact_path: Option<PathBuf>,
}

impl TrainingOutcome {
    pub fn to_artifact(&self) -> ModelArtifact {
        let metadata = ArtifactMetadata::new(
            self.best_params,
            self.best_score,
            self.baseline.mean_score,
            self.evaluation.test.clone(),
            self.n_train,
            self.n_test,
        );
        ModelArtifact::new(metadata, self.schema.clone(), self.pipeline.clone())
    }
}

/// Runs load -> split -> baseline CV -> grid search -> evaluate -> save
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: PipelineConfig,
    schema: FeatureSchema,
}

impl TrainEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            schema: FeatureSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full workflow from the configured CSV to the saved artifact
    pub fn run(&self) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let df = load_data(&self.config.data_path)?;
        let mut outcome = self.train(&df)?;

        let path = self.config.model_path.clone();
        outcome.to_artifact().save(&path)?;
        outcome.artifact_path = Some(path);
        Ok(outcome)
    }

    /// Train on an already prepared frame, without touching the filesystem
    pub fn train(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let pool = self.config.thread_pool()?;
        pool.install(|| self.train_inner(df))
    }

    fn train_inner(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let config = &self.config;

        let x = FeatureFrame::from_dataframe(df, &self.schema)?;
        let y = labels(df, &self.schema)?;

        let (train_idx, test_idx) = stratified_train_test_split(&y, config.test_size, config.random_state)?;
        let x_train = x.select_rows(&train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = x.select_rows(&test_idx);
        let y_test = y.select(Axis(0), &test_idx);
        info!(train = train_idx.len(), test = test_idx.len(), "Split records");

        let (_, robust) = build_preprocessors(&self.schema);
        let cv = config.cross_validator();

        // Baseline: default logistic regression through the same pipeline
        let baseline = resampling_scores_with(
            &LogisticRegression::new(),
            &x_train,
            &y_train,
            &robust,
            config.sampler(),
            &cv,
            config.beta,
        )?;

        let search = GridSearchCV::new(config.param_grid.clone())
            .with_cv(cv)
            .with_sampler(config.sampler())
            .with_beta(config.beta)
            .with_error_score(config.error_score)
            .fit(&robust, &x_train, &y_train)?;

        let mut pipeline = search.best_estimator.unfitted();
        let evaluation = evaluate_model(&mut pipeline, &x_train, &y_train, &x_test, &y_test)?;

        let training_time_secs = start.elapsed().as_secs_f64();
        info!(
            best_score = search.best_score,
            test_accuracy = evaluation.test.accuracy,
            secs = training_time_secs,
            "Training complete"
        );

        Ok(TrainingOutcome {
            schema: self.schema.clone(),
            baseline,
            best_params: search.best_params,
            best_score: search.best_score,
            evaluation,
            pipeline,
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            training_time_secs,
            artifact_path: None,
        })
    }
}
