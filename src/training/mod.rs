//! Model training module
//!
//! - Regularized logistic regression
//! - Preprocess -> SMOTE -> classifier pipelines
//! - Stratified cross-validation with resampling inside training folds
//! - F-beta scoring and classification reports
//! - The end-to-end training workflow

mod config;
mod engine;
mod models;
mod pipeline;
pub mod cross_validation;
pub mod linear_models;
pub mod metrics;

pub use config::PipelineConfig;
pub use engine::{evaluate_model, EvaluationReport, TrainEngine, TrainingOutcome};
pub use models::Classifier;
pub use pipeline::ResampledPipeline;
pub use cross_validation::{
    cross_val_score, resampling_scores, resampling_scores_with, stratified_train_test_split, CVResults,
    CVSplit, CVStrategy, CrossValidator,
};
pub use linear_models::{LogisticRegression, Penalty, Solver};
pub use metrics::{accuracy_score, fbeta_score, ClassMetrics, ClassificationReport};
