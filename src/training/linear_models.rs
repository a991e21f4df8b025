//! Regularized logistic regression

use super::Classifier;
use crate::error::{DropoutError, Result};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Regularization penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
    ElasticNet,
    None,
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Penalty::L1 => "l1",
            Penalty::L2 => "l2",
            Penalty::ElasticNet => "elasticnet",
            Penalty::None => "none",
        };
        f.write_str(name)
    }
}

/// Solver name. Both solvers minimize the same objective with accelerated
/// proximal gradient; the solver only restricts which penalties are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    /// Smooth penalties only (`l2`, `none`)
    Lbfgs,
    /// Every penalty
    Saga,
}

impl Solver {
    pub fn supports(self, penalty: Penalty) -> bool {
        match self {
            Solver::Saga => true,
            Solver::Lbfgs => matches!(penalty, Penalty::L2 | Penalty::None),
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::Lbfgs => f.write_str("lbfgs"),
            Solver::Saga => f.write_str("saga"),
        }
    }
}

/// Logistic regression for binary classification.
///
/// Minimizes `mean(logloss) + penalty(w) / (C * n)` where the elastic-net
/// penalty is `l1_ratio * |w|_1 + (1 - l1_ratio) * 0.5 * |w|_2^2`. The
/// intercept is never penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub penalty: Penalty,
    /// Inverse regularization strength
    pub c: f64,
    /// Elastic-net mixing, only read for `Penalty::ElasticNet`
    pub l1_ratio: Option<f64>,
    pub solver: Solver,
    pub max_iter: usize,
    /// Stop when the largest parameter change relative to the largest
    /// parameter drops below this
    pub tol: f64,
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// Iterations run by the last fit
    pub n_iter: usize,
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// `l2` penalty, `C = 1`, 100 iterations
    pub fn new() -> Self {
        Self {
            penalty: Penalty::L2,
            c: 1.0,
            l1_ratio: None,
            solver: Solver::Lbfgs,
            max_iter: 100,
            tol: 1e-4,
            coefficients: None,
            intercept: None,
            n_iter: 0,
            is_fitted: false,
        }
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = Some(l1_ratio);
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn invalid(name: &str, value: impl ToString, reason: &str) -> DropoutError {
        DropoutError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(Self::invalid("C", self.c, "must be a positive finite number"));
        }
        if self.max_iter == 0 {
            return Err(Self::invalid("max_iter", self.max_iter, "must be at least 1"));
        }
        if !self.solver.supports(self.penalty) {
            return Err(Self::invalid(
                "penalty",
                self.penalty,
                &format!("not supported by solver {}", self.solver),
            ));
        }
        if self.penalty == Penalty::ElasticNet {
            match self.l1_ratio {
                Some(r) if (0.0..=1.0).contains(&r) => {}
                Some(r) => return Err(Self::invalid("l1_ratio", r, "must lie in [0, 1]")),
                None => {
                    return Err(Self::invalid(
                        "l1_ratio",
                        "None",
                        "required for the elasticnet penalty",
                    ))
                }
            }
        }
        Ok(())
    }

    /// `(l1 strength, l2 strength)` of the per-sample objective
    fn penalty_strengths(&self, n_samples: usize) -> (f64, f64) {
        let scale = 1.0 / (self.c * n_samples as f64);
        match self.penalty {
            Penalty::L1 => (scale, 0.0),
            Penalty::L2 => (0.0, scale),
            Penalty::ElasticNet => {
                let r = self.l1_ratio.unwrap_or(0.5);
                (r * scale, (1.0 - r) * scale)
            }
            Penalty::None => (0.0, 0.0),
        }
    }

    /// Fit with FISTA: gradient step on the smooth part, soft-thresholding
    /// for the L1 part, backtracking on the step size.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        self.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(DropoutError::TrainingError(
                "input contains NaN or infinite values".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&label| label != 0 && label != 1) {
            return Err(DropoutError::TrainingError(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }
        let n_pos = y.iter().filter(|&&label| label == 1).count();
        if n_pos == 0 || n_pos == n_samples {
            return Err(DropoutError::TrainingError(
                "training data must contain both classes".to_string(),
            ));
        }

        let objective = Objective {
            x,
            y: y.mapv(|label| label as f64),
            n_samples: n_samples as f64,
        };
        let (l1, l2) = self.penalty_strengths(n_samples);

        // theta = [w; b]
        let mut theta = Array1::<f64>::zeros(n_features + 1);
        let mut momentum = theta.clone();
        let mut t: f64 = 1.0;
        let mut step_l = 0.25 * objective.spectral_bound() + l2;
        let mut prev_value = objective.value(&theta, l1, l2);
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let (f_m, grad) = objective.smooth_value_grad(&momentum, l2);

            let candidate = loop {
                let mut next = &momentum - &(&grad / step_l);
                soft_threshold(&mut next, l1 / step_l, n_features);
                let diff = &next - &momentum;
                let f_next = objective.smooth_value(&next, l2);
                let bound = f_m + grad.dot(&diff) + 0.5 * step_l * diff.dot(&diff);
                if f_next <= bound + 1e-12 || step_l > 1e12 {
                    break next;
                }
                step_l *= 2.0;
            };

            let value = objective.value(&candidate, l1, l2);
            let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
            let delta = &candidate - &theta;

            if value > prev_value {
                // restart momentum
                t = 1.0;
                momentum = theta.clone();
                continue;
            }
            momentum = &candidate + &(&delta * ((t - 1.0) / t_next));
            t = t_next;

            let max_change = delta.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            let max_param = candidate.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            theta = candidate;
            prev_value = value;

            if max_change <= self.tol * max_param.max(1.0) {
                break;
            }
        }

        debug!(
            penalty = %self.penalty,
            c = self.c,
            n_iter,
            objective = prev_value,
            "Logistic regression fitted"
        );

        self.intercept = Some(theta[n_features]);
        self.coefficients = Some(theta.slice(s![..n_features]).to_owned());
        self.n_iter = n_iter;
        self.is_fitted = true;
        Ok(self)
    }

    /// Raw linear scores `X w + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = match (&self.coefficients, self.intercept) {
            (Some(w), Some(b)) if self.is_fitted => (w, b),
            _ => return Err(DropoutError::ModelNotFitted),
        };
        if x.ncols() != coefficients.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + intercept)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Accuracy on `(x, y)`
    pub fn score(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<f64> {
        let y_pred = Classifier::predict(self, x)?;
        let correct = y_pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len().max(1) as f64)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict_proba(self, x)
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Mean logistic loss over a design matrix with an implicit intercept column
struct Objective<'a> {
    x: &'a Array2<f64>,
    y: Array1<f64>,
    n_samples: f64,
}

impl Objective<'_> {
    fn linear(&self, theta: &Array1<f64>) -> Array1<f64> {
        let d = self.x.ncols();
        let w = theta.slice(s![..d]);
        self.x.dot(&w) + theta[d]
    }

    fn l2_term(theta: &Array1<f64>, l2: f64) -> f64 {
        let d = theta.len() - 1;
        let w = theta.slice(s![..d]);
        0.5 * l2 * w.dot(&w)
    }

    fn smooth_value(&self, theta: &Array1<f64>, l2: f64) -> f64 {
        let z = self.linear(theta);
        let loss: f64 = z
            .iter()
            .zip(self.y.iter())
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum();
        loss / self.n_samples + Self::l2_term(theta, l2)
    }

    fn smooth_value_grad(&self, theta: &Array1<f64>, l2: f64) -> (f64, Array1<f64>) {
        let d = self.x.ncols();
        let z = self.linear(theta);
        let loss: f64 = z
            .iter()
            .zip(self.y.iter())
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum();
        let residual = z.mapv(sigmoid) - &self.y;

        let mut grad = Array1::zeros(d + 1);
        let gw = self.x.t().dot(&residual) / self.n_samples;
        grad.slice_mut(s![..d]).assign(&gw);
        grad[d] = residual.sum() / self.n_samples;
        grad.slice_mut(s![..d])
            .scaled_add(l2, &theta.slice(s![..d]));

        (loss / self.n_samples + Self::l2_term(theta, l2), grad)
    }

    fn value(&self, theta: &Array1<f64>, l1: f64, l2: f64) -> f64 {
        let d = theta.len() - 1;
        let l1_term: f64 = theta.slice(s![..d]).iter().map(|v| v.abs()).sum();
        self.smooth_value(theta, l2) + l1 * l1_term
    }

    /// Estimate of the largest eigenvalue of `[X 1]^T [X 1] / n` by power
    /// iteration, used as the initial step-size scale.
    fn spectral_bound(&self) -> f64 {
        let d = self.x.ncols();
        let mut v = Array1::from_elem(d + 1, 1.0 / ((d + 1) as f64).sqrt());
        let mut eigen = 1.0;
        for _ in 0..20 {
            let av = self.x.dot(&v.slice(s![..d])) + v[d];
            let mut next = Array1::zeros(d + 1);
            next.slice_mut(s![..d]).assign(&self.x.t().dot(&av));
            next[d] = av.sum();
            next /= self.n_samples;
            let norm = next.dot(&next).sqrt();
            if norm <= f64::EPSILON {
                break;
            }
            eigen = norm;
            v = next / norm;
        }
        eigen
    }
}

/// Soft-threshold the first `n_penalized` entries in place
fn soft_threshold(theta: &mut Array1<f64>, threshold: f64, n_penalized: usize) {
    if threshold <= 0.0 {
        return;
    }
    for v in theta.iter_mut().take(n_penalized) {
        *v = if *v > threshold {
            *v - threshold
        } else if *v < -threshold {
            *v + threshold
        } else {
            0.0
        };
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}
