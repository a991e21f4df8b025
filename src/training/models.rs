//! Classifier trait

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Binary classifier over dense feature matrices.
///
/// Labels are `0` / `1`; `predict_proba` returns the probability of class `1`.
pub trait Classifier: Send + Sync {
    /// Short model name used in logs
    fn name(&self) -> &str;

    /// Fit the model, discarding any previous fit
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1 } else { 0 }))
    }

    fn is_fitted(&self) -> bool;
}
