//! Robust feature scaling

use crate::error::{DropoutError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Median of the column
    pub center: f64,
    /// Interquartile range, or 1.0 for a constant column
    pub scale: f64,
}

/// Scales each column by `(x - median) / IQR`.
///
/// Quartiles use linear interpolation between order statistics, so a handful
/// of extreme values barely moves the fitted parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobustScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl RobustScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit per-column median and IQR
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(DropoutError::PreprocessingError(
                "cannot fit scaler on empty data".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|col| Self::compute_params(&col.to_vec()))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(DropoutError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (mut col, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(DropoutError::ModelNotFitted);
        }

        let mut result = x.clone();
        for (mut col, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| v * params.scale + params.center);
        }
        Ok(result)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    /// Median and IQR of a column
    pub fn compute_params(values: &[f64]) -> ScalerParams {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let median = quantile(&sorted, 0.5);
        let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
        ScalerParams {
            center: median,
            scale: if iqr == 0.0 { 1.0 } else { iqr },
        }
    }
}

/// Linear-interpolation quantile of already sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
