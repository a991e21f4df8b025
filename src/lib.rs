//! Student dropout prediction
//!
//! Classifies students as Dropout or Graduate from enrollment and
//! curricular-unit records. Training runs a one-hot + robust-scale
//! preprocessor, SMOTE oversampling inside each training fold and an
//! F2-scored grid search over logistic regression hyperparameters. The
//! tuned pipeline is saved as a single artifact and served through a
//! form-driven inference engine.
//!
//! # Modules
//!
//! - [`data`] - Loading, cleaning, feature schema and reference options
//! - [`preprocessing`] - One-hot encoding and robust scaling
//! - [`synthetic`] - SMOTE oversampling
//! - [`training`] - Logistic regression, cross-validation, metrics, training workflow
//! - [`optimizer`] - Exhaustive grid search
//! - [`export`] - Artifact persistence
//! - [`inference`] - Input form and inference engine
//! - [`server`] - HTTP API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod data;
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod optimizer;
pub mod export;
pub mod inference;

pub mod server;
pub mod cli;

pub use error::{DropoutError, Result};
