//! Exhaustive grid search over logistic regression hyperparameters

use crate::data::FeatureFrame;
use crate::error::{DropoutError, Result};
use crate::preprocessing::ColumnTransformer;
use crate::synthetic::SMOTE;
use crate::training::cross_validation::{score_split, CVResults, CrossValidator};
use crate::training::{LogisticRegression, Penalty, ResampledPipeline, Solver};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// One point of the logistic regression grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    #[serde(rename = "C")]
    pub c: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub penalty: Penalty,
    pub solver: Solver,
}

impl LogisticParams {
    pub fn build(&self) -> LogisticRegression {
        LogisticRegression::new()
            .with_c(self.c)
            .with_l1_ratio(self.l1_ratio)
            .with_max_iter(self.max_iter)
            .with_penalty(self.penalty)
            .with_solver(self.solver)
    }
}

impl fmt::Display for LogisticParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C={}, l1_ratio={}, max_iter={}, penalty={}, solver={}",
            self.c, self.l1_ratio, self.max_iter, self.penalty, self.solver
        )
    }
}

/// Value lists per hyperparameter. Candidates enumerate the keys in the
/// order `C, l1_ratio, max_iter, penalty, solver` with the last varying
/// fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParamGrid {
    #[serde(rename = "C")]
    pub c: Vec<f64>,
    pub l1_ratio: Vec<f64>,
    pub max_iter: Vec<usize>,
    pub penalty: Vec<Penalty>,
    pub solver: Vec<Solver>,
}

impl Default for LogisticParamGrid {
    fn default() -> Self {
        Self {
            c: vec![0.01, 0.1, 1.0, 10.0],
            l1_ratio: vec![0.0, 0.5, 1.0],
            max_iter: vec![200],
            penalty: vec![Penalty::L1, Penalty::L2, Penalty::ElasticNet, Penalty::None],
            solver: vec![Solver::Saga],
        }
    }
}

impl LogisticParamGrid {
    pub fn len(&self) -> usize {
        self.c.len() * self.l1_ratio.len() * self.max_iter.len() * self.penalty.len() * self.solver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn candidates(&self) -> Vec<LogisticParams> {
        let mut out = Vec::with_capacity(self.len());
        for &c in &self.c {
            for &l1_ratio in &self.l1_ratio {
                for &max_iter in &self.max_iter {
                    for &penalty in &self.penalty {
                        for &solver in &self.solver {
                            out.push(LogisticParams { c, l1_ratio, max_iter, penalty, solver });
                        }
                    }
                }
            }
        }
        out
    }
}

/// What to do when a candidate fails to fit on a fold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScore {
    /// Abort the whole search with the error
    Raise,
    /// Record this score for the failing fold and continue
    Value(f64),
}

impl Default for ErrorScore {
    fn default() -> Self {
        ErrorScore::Raise
    }
}

/// Cross-validation outcome of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: usize,
    pub params: LogisticParams,
    pub cv: CVResults,
    /// 1 = best; equal means share a rank
    pub rank: usize,
}

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
    pub best_params: LogisticParams,
    pub best_score: f64,
    /// Best candidate refit on all of the search data
    pub best_estimator: ResampledPipeline<LogisticRegression>,
    pub duration_secs: f64,
}

impl GridSearchResult {
    pub fn best_candidate(&self) -> &CandidateResult {
        &self.candidates[self.best_index]
    }
}

/// Grid search with the same fold / resample / score discipline as
/// cross-validated scoring. Every candidate and fold runs as one rayon task.
#[derive(Debug, Clone)]
pub struct GridSearchCV {
    grid: LogisticParamGrid,
    cv: CrossValidator,
    sampler: SMOTE,
    beta: f64,
    error_score: ErrorScore,
}

impl GridSearchCV {
    pub fn new(grid: LogisticParamGrid) -> Self {
        Self {
            grid,
            cv: CrossValidator::default(),
            sampler: SMOTE::new().with_seed(42),
            beta: 2.0,
            error_score: ErrorScore::Raise,
        }
    }

    pub fn with_cv(mut self, cv: CrossValidator) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_sampler(mut self, sampler: SMOTE) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_error_score(mut self, error_score: ErrorScore) -> Self {
        self.error_score = error_score;
        self
    }

    pub fn grid(&self) -> &LogisticParamGrid {
        &self.grid
    }

    pub fn fit(
        &self,
        preprocessor: &ColumnTransformer,
        x: &FeatureFrame,
        y: &Array1<i64>,
    ) -> Result<GridSearchResult> {
        let start = Instant::now();
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(DropoutError::ConfigError("parameter grid is empty".to_string()));
        }

        let splits = self.cv.split(x.n_rows(), Some(y))?;
        let pipelines: Vec<ResampledPipeline<LogisticRegression>> = candidates
            .iter()
            .map(|params| ResampledPipeline::new(preprocessor.unfitted(), self.sampler.unfitted(), params.build()))
            .collect();

        info!(
            candidates = candidates.len(),
            folds = splits.len(),
            fits = candidates.len() * splits.len(),
            "Starting grid search"
        );

        let trials: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..splits.len()).map(move |f| (c, f)))
            .collect();

        let scores = trials
            .par_iter()
            .map(|&(c, f)| match score_split(&pipelines[c], x, y, &splits[f], self.beta) {
                Ok(score) => Ok(score),
                Err(e) => match self.error_score {
                    ErrorScore::Raise => Err(DropoutError::TrainingError(format!(
                        "candidate {} ({}) failed on fold {}: {}",
                        c, candidates[c], f, e
                    ))),
                    ErrorScore::Value(v) => {
                        warn!(candidate = c, fold = f, error = %e, score = v, "Fit failed, recording error score");
                        Ok(v)
                    }
                },
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut results: Vec<CandidateResult> = scores
            .chunks(splits.len())
            .zip(candidates.iter())
            .enumerate()
            .map(|(candidate_id, (fold_scores, params))| CandidateResult {
                candidate_id,
                params: *params,
                cv: CVResults::from_scores(fold_scores.to_vec()),
                rank: 0,
            })
            .collect();
        assign_ranks(&mut results);

        let best_index = best_candidate(&results);
        let best_params = results[best_index].params;
        let best_score = results[best_index].cv.mean_score;

        let mut best_estimator = pipelines[best_index].unfitted();
        best_estimator.fit(x, y)?;

        info!("Best F2: {:.4}", best_score);
        info!("Best Params: {}", best_params);

        Ok(GridSearchResult {
            candidates: results,
            best_index,
            best_params,
            best_score,
            best_estimator,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Earliest candidate with the highest mean score
fn best_candidate(results: &[CandidateResult]) -> usize {
    let mut best = 0;
    for (i, r) in results.iter().enumerate().skip(1) {
        if r.cv.mean_score > results[best].cv.mean_score {
            best = i;
        }
    }
    best
}

fn assign_ranks(results: &mut [CandidateResult]) {
    let means: Vec<f64> = results.iter().map(|r| r.cv.mean_score).collect();
    for r in results.iter_mut() {
        r.rank = 1 + means.iter().filter(|&&m| m > r.cv.mean_score).count();
    }
}
