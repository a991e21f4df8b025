//! Cross-validation splitting and resampled scoring

use super::metrics::fbeta_score;
use super::pipeline::ResampledPipeline;
use super::Classifier;
use crate::data::FeatureFrame;
use crate::error::{DropoutError, Result};
use crate::preprocessing::ColumnTransformer;
use crate::synthetic::{class_indices, SMOTE};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Cross-validation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
    }
}

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl Default for CrossValidator {
    /// Stratified 5-fold, shuffled with seed 42
    fn default() -> Self {
        Self::new(CVStrategy::default()).with_random_state(42)
    }
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> &CVStrategy {
        &self.strategy
    }

    pub fn n_splits(&self) -> usize {
        match self.strategy {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => n_splits,
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits. Stratified splitting requires `y`.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<i64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits();
        if n_splits < 2 {
            return Err(DropoutError::ValidationError(
                "n_splits must be at least 2".to_string()
            ));
        }
        if n_samples < n_splits {
            return Err(DropoutError::ValidationError(
                format!("n_samples ({}) must be >= n_splits ({})", n_samples, n_splits)
            ));
        }

        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                Ok(self.k_fold_split(n_samples, *n_splits, *shuffle))
            }
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| DropoutError::ValidationError(
                    "StratifiedKFold requires target array".to_string()
                ))?;
                if y.len() != n_samples {
                    return Err(DropoutError::ShapeError {
                        expected: format!("y length = {}", n_samples),
                        actual: format!("y length = {}", y.len()),
                    });
                }
                Ok(self.stratified_k_fold_split(y, *n_splits, *shuffle))
            }
        }
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Vec<CVSplit> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut folds = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            folds.push(indices[current..current + fold_size].to_vec());
            current += fold_size;
        }

        Self::splits_from_folds(folds)
    }

    /// Deal each class round-robin over the folds. The dealing position
    /// carries over between classes so fold sizes differ by at most one.
    fn stratified_k_fold_split(&self, y: &Array1<i64>, n_splits: usize, shuffle: bool) -> Vec<CVSplit> {
        let mut classes = class_indices(y);
        let mut rng = self.rng();

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut position = 0;
        for (class, indices) in classes.iter_mut() {
            if indices.len() < n_splits {
                warn!(class, members = indices.len(), n_splits, "Class has fewer members than folds");
            }
            if shuffle {
                indices.shuffle(&mut rng);
            }
            for &idx in indices.iter() {
                folds[position % n_splits].push(idx);
                position += 1;
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        Self::splits_from_folds(folds)
    }

    fn splits_from_folds(folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
        (0..folds.len())
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect()
    }
}

/// Stratified hold-out split: returns `(train_indices, test_indices)`.
///
/// The test set holds `ceil(test_size * n)` rows, shared out between classes
/// in proportion to their size (largest remainder, ties to the lower label).
pub fn stratified_train_test_split(
    y: &Array1<i64>,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DropoutError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }
    let n = y.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DropoutError::ValidationError(format!(
            "test_size {} leaves an empty split for {} samples",
            test_size, n
        )));
    }

    let mut classes = class_indices(y);

    // floor allocation, then hand out the remainder by largest fraction
    let mut allocation: Vec<(i64, usize, f64)> = classes
        .iter()
        .map(|(&class, idx)| {
            let exact = n_test as f64 * idx.len() as f64 / n as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let mut leftover = n_test - allocation.iter().map(|a| a.1).sum::<usize>();
    let mut order: Vec<usize> = (0..allocation.len()).collect();
    order.sort_by(|&a, &b| allocation[b].2.total_cmp(&allocation[a].2).then(a.cmp(&b)));
    for i in order {
        if leftover == 0 {
            break;
        }
        allocation[i].1 += 1;
        leftover -= 1;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (class, take, _) in allocation {
        if let Some(indices) = classes.get_mut(&class) {
            indices.shuffle(&mut rng);
            let take = take.min(indices.len());
            test.extend_from_slice(&indices[..take]);
            train.extend_from_slice(&indices[take..]);
        }
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((train, test))
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    /// Population standard deviation of the fold scores
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let denom = n_folds.max(1) as f64;
        let mean_score = scores.iter().sum::<f64>() / denom;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / denom;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

/// Fit `pipeline` on one split's training rows and score its test rows
pub fn score_split<C>(
    pipeline: &ResampledPipeline<C>,
    x: &FeatureFrame,
    y: &Array1<i64>,
    split: &CVSplit,
    beta: f64,
) -> Result<f64>
where
    C: Classifier + Clone,
{
    let x_train = x.select_rows(&split.train_indices);
    let y_train = y.select(ndarray::Axis(0), &split.train_indices);
    let x_test = x.select_rows(&split.test_indices);
    let y_test = y.select(ndarray::Axis(0), &split.test_indices);

    let mut fold_pipeline = pipeline.unfitted();
    fold_pipeline.fit(&x_train, &y_train)?;
    let y_pred = fold_pipeline.predict(&x_test)?;
    let score = fbeta_score(&y_test, &y_pred, beta)?;

    debug!(fold = split.fold_idx, score, "Fold scored");
    Ok(score)
}

/// Score a pipeline on every split in parallel. Resampling happens inside
/// each training fold; test folds are only transformed and predicted.
pub fn cross_val_score<C>(
    pipeline: &ResampledPipeline<C>,
    x: &FeatureFrame,
    y: &Array1<i64>,
    splits: &[CVSplit],
    beta: f64,
) -> Result<CVResults>
where
    C: Classifier + Clone,
{
    if x.n_rows() != y.len() {
        return Err(DropoutError::ShapeError {
            expected: format!("y length = {}", x.n_rows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let scores = splits
        .par_iter()
        .map(|split| score_split(pipeline, x, y, split, beta))
        .collect::<Result<Vec<f64>>>()?;

    Ok(CVResults::from_scores(scores))
}

/// Cross-validated F2 of `preprocessor -> SMOTE(seed 42) -> model`
pub fn resampling_scores<C>(
    model: &C,
    x: &FeatureFrame,
    y: &Array1<i64>,
    preprocessor: &ColumnTransformer,
    cv: &CrossValidator,
) -> Result<CVResults>
where
    C: Classifier + Clone,
{
    resampling_scores_with(model, x, y, preprocessor, SMOTE::new().with_seed(42), cv, 2.0)
}

/// [`resampling_scores`] with an explicit sampler and F-beta weight
pub fn resampling_scores_with<C>(
    model: &C,
    x: &FeatureFrame,
    y: &Array1<i64>,
    preprocessor: &ColumnTransformer,
    sampler: SMOTE,
    cv: &CrossValidator,
    beta: f64,
) -> Result<CVResults>
where
    C: Classifier + Clone,
{
    let pipeline = ResampledPipeline::new(preprocessor.unfitted(), sampler, model.clone());
    let splits = cv.split(x.n_rows(), Some(y))?;
    let results = cross_val_score(&pipeline, x, y, &splits, beta)?;

    info!(
        folds = results.n_folds,
        beta,
        "{} CV Mean F2: {:.4}  Std: {:.4}",
        model.name(),
        results.mean_score,
        results.std_score
    );
    Ok(results)
}
