//! Column-wise preprocessing of student feature frames

use super::{OneHotEncoder, RobustScaler};
use crate::data::{FeatureFrame, FeatureSchema};
use crate::error::{DropoutError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

/// How numeric columns are handled after one-hot encoding the categoricals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericHandling {
    /// Numeric columns pass through unchanged (tree ensembles)
    Passthrough,
    /// Numeric columns are median/IQR scaled (linear models)
    RobustScale,
}

/// One-hot encodes the categorical block and passes through or robust-scales
/// the numeric block. Output columns: indicators first, then numerics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransformer {
    schema: FeatureSchema,
    numeric_handling: NumericHandling,
    encoder: OneHotEncoder,
    scaler: Option<RobustScaler>,
    is_fitted: bool,
}

impl ColumnTransformer {
    pub fn new(schema: FeatureSchema, scale_numeric: bool) -> Self {
        let numeric_handling = if scale_numeric {
            NumericHandling::RobustScale
        } else {
            NumericHandling::Passthrough
        };
        Self {
            schema,
            numeric_handling,
            encoder: OneHotEncoder::new(),
            scaler: None,
            is_fitted: false,
        }
    }

    pub fn numeric_handling(&self) -> NumericHandling {
        self.numeric_handling
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fresh, unfitted copy with the same configuration
    pub fn unfitted(&self) -> Self {
        Self::new(
            self.schema.clone(),
            self.numeric_handling == NumericHandling::RobustScale,
        )
    }

    pub fn fit(&mut self, frame: &FeatureFrame) -> Result<&mut Self> {
        self.check_width(frame)?;

        self.encoder.fit(&frame.categorical, &self.schema.categorical)?;
        self.scaler = match self.numeric_handling {
            NumericHandling::RobustScale => {
                let mut scaler = RobustScaler::new();
                scaler.fit(&frame.numeric)?;
                Some(scaler)
            }
            NumericHandling::Passthrough => None,
        };

        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(DropoutError::ModelNotFitted);
        }
        self.check_width(frame)?;

        let encoded = self.encoder.transform(&frame.categorical)?;
        let numeric = match &self.scaler {
            Some(scaler) => scaler.transform(&frame.numeric)?,
            None => frame.numeric.clone(),
        };

        Ok(concatenate(Axis(1), &[encoded.view(), numeric.view()])?)
    }

    pub fn fit_transform(&mut self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        self.fit(frame)?;
        self.transform(frame)
    }

    /// Names of the output columns
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.encoder.feature_names();
        names.extend(self.schema.numeric.iter().cloned());
        names
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> Option<&RobustScaler> {
        self.scaler.as_ref()
    }

    fn check_width(&self, frame: &FeatureFrame) -> Result<()> {
        if frame.categorical.ncols() != self.schema.categorical.len()
            || frame.numeric.ncols() != self.schema.numeric.len()
        {
            return Err(DropoutError::ShapeError {
                expected: format!(
                    "{} categorical + {} numeric columns",
                    self.schema.categorical.len(),
                    self.schema.numeric.len()
                ),
                actual: format!(
                    "{} categorical + {} numeric columns",
                    frame.categorical.ncols(),
                    frame.numeric.ncols()
                ),
            });
        }
        Ok(())
    }
}

/// Build the two preprocessing variants sharing the same categorical encoding:
/// `(one-hot + passthrough, one-hot + robust scaling)`.
pub fn build_preprocessors(schema: &FeatureSchema) -> (ColumnTransformer, ColumnTransformer) {
    (
        ColumnTransformer::new(schema.clone(), false),
        ColumnTransformer::new(schema.clone(), true),
    )
}
