//! Hyperparameter search
//!
//! Exhaustive grid search over logistic regression settings, scored with
//! resampled stratified cross-validation.

mod grid_search;

pub use grid_search::{
    CandidateResult, ErrorScore, GridSearchCV, GridSearchResult, LogisticParamGrid, LogisticParams,
};
