//! Training pipeline configuration

use crate::error::{DropoutError, Result};
use crate::optimizer::{ErrorScore, LogisticParamGrid};
use crate::synthetic::SMOTE;
use crate::training::cross_validation::{CVStrategy, CrossValidator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the offline training workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Student records CSV
    pub data_path: PathBuf,
    /// Where the trained artifact is written
    pub model_path: PathBuf,
    /// Fraction of records held out for the final evaluation
    pub test_size: f64,
    /// Seed for the hold-out split, fold shuffling and SMOTE
    pub random_state: u64,
    pub n_splits: usize,
    pub shuffle: bool,
    /// F-beta weight on recall
    pub beta: f64,
    pub smote_k_neighbors: usize,
    pub param_grid: LogisticParamGrid,
    pub error_score: ErrorScore,
    /// Worker threads for folds and grid trials; `None` uses every core
    pub n_jobs: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("students_performance_cleaned.csv"),
            model_path: PathBuf::from("students_performance_logreg.bin"),
            test_size: 0.2,
            random_state: 42,
            n_splits: 5,
            shuffle: true,
            beta: 2.0,
            smote_k_neighbors: 5,
            param_grid: LogisticParamGrid::default(),
            error_score: ErrorScore::Raise,
            n_jobs: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    pub fn with_param_grid(mut self, grid: LogisticParamGrid) -> Self {
        self.param_grid = grid;
        self
    }

    pub fn with_error_score(mut self, error_score: ErrorScore) -> Self {
        self.error_score = error_score;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(DropoutError::ConfigError(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.n_splits < 2 {
            return Err(DropoutError::ConfigError(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(DropoutError::ConfigError(format!("beta must be positive, got {}", self.beta)));
        }
        if self.smote_k_neighbors == 0 {
            return Err(DropoutError::ConfigError("smote_k_neighbors must be at least 1".to_string()));
        }
        if self.param_grid.is_empty() {
            return Err(DropoutError::ConfigError("param_grid has no candidates".to_string()));
        }
        if self.n_jobs == Some(0) {
            return Err(DropoutError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn cross_validator(&self) -> CrossValidator {
        CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.n_splits,
            shuffle: self.shuffle,
        })
        .with_random_state(self.random_state)
    }

    pub fn sampler(&self) -> SMOTE {
        SMOTE::new()
            .with_k_neighbors(self.smote_k_neighbors)
            .with_seed(self.random_state)
    }

    /// Thread pool sized by `n_jobs`
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.n_jobs {
            builder = builder.num_threads(n);
        }
        builder
            .build()
            .map_err(|e| DropoutError::ConfigError(format!("Thread pool error: {}", e)))
    }
}
