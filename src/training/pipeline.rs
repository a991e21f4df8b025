//! Preprocess -> resample -> classify pipeline

use super::Classifier;
use crate::data::FeatureFrame;
use crate::error::{DropoutError, Result};
use crate::preprocessing::ColumnTransformer;
use crate::synthetic::{Sampler, SMOTE};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A column transformer, an oversampler and a classifier fitted together.
///
/// The sampler only runs inside `fit`; prediction goes straight from the
/// transformer to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampledPipeline<C> {
    preprocessor: ColumnTransformer,
    sampler: SMOTE,
    model: C,
    is_fitted: bool,
}

impl<C> ResampledPipeline<C>
where
    C: Classifier + Clone,
{
    pub fn new(preprocessor: ColumnTransformer, sampler: SMOTE, model: C) -> Self {
        Self {
            preprocessor,
            sampler,
            model,
            is_fitted: false,
        }
    }

    /// Same configuration, nothing fitted
    pub fn unfitted(&self) -> Self {
        Self::new(self.preprocessor.unfitted(), self.sampler.unfitted(), self.model.clone())
    }

    pub fn fit(&mut self, x: &FeatureFrame, y: &Array1<i64>) -> Result<&mut Self> {
        if x.n_rows() != y.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("y length = {}", x.n_rows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let transformed = self.preprocessor.fit_transform(x)?;
        let resampled = self.sampler.fit_resample(&transformed, y)?;
        debug!(
            rows = transformed.nrows(),
            resampled_rows = resampled.x.nrows(),
            "Resampled training rows"
        );
        self.model.fit(&resampled.x, &resampled.y)?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Preprocessed feature matrix for `x`
    pub fn transform(&self, x: &FeatureFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(DropoutError::ModelNotFitted);
        }
        self.preprocessor.transform(x)
    }

    pub fn predict_proba(&self, x: &FeatureFrame) -> Result<Array1<f64>> {
        let transformed = self.transform(x)?;
        self.model.predict_proba(&transformed)
    }

    pub fn predict(&self, x: &FeatureFrame) -> Result<Array1<i64>> {
        let transformed = self.transform(x)?;
        self.model.predict(&transformed)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn sampler(&self) -> &SMOTE {
        &self.sampler
    }

    pub fn model(&self) -> &C {
        &self.model
    }
}
