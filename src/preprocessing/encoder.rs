//! One-hot encoding of categorical columns

use crate::data::sorted_categories;
use crate::error::{DropoutError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handling of values not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleUnknown {
    /// Unknown values encode as all-zero indicators
    Ignore,
    /// Unknown values are an error
    Error,
}

/// Learned categories of one input column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnCategories {
    name: String,
    /// Sorted categories as seen during fit
    categories: Vec<String>,
    /// Category -> output column offset; the dropped category is absent
    index: HashMap<String, usize>,
}

/// One-hot encoder with the first category of each column dropped.
///
/// Dropping the reference category keeps the indicators linearly independent;
/// the dropped category and unknown categories both encode as all zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop_first: bool,
    handle_unknown: HandleUnknown,
    columns: Vec<ColumnCategories>,
    n_outputs: usize,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            drop_first: true,
            handle_unknown: HandleUnknown::Ignore,
            columns: Vec::new(),
            n_outputs: 0,
            is_fitted: false,
        }
    }

    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    /// Learn the categories of each column. `names` label the columns of `x`.
    pub fn fit(&mut self, x: &Array2<String>, names: &[String]) -> Result<&mut Self> {
        if names.len() != x.ncols() {
            return Err(DropoutError::ShapeError {
                expected: format!("{} column names", x.ncols()),
                actual: format!("{} column names", names.len()),
            });
        }

        let mut offset = 0;
        self.columns = x
            .axis_iter(Axis(1))
            .zip(names.iter())
            .map(|(col, name)| {
                let entry = self.build_column(col, name, offset);
                offset += entry.index.len();
                entry
            })
            .collect();
        self.n_outputs = offset;
        self.is_fitted = true;
        Ok(self)
    }

    fn build_column(&self, col: ArrayView1<String>, name: &str, offset: usize) -> ColumnCategories {
        let categories = sorted_categories(col.iter());
        let skip = if self.drop_first { 1 } else { 0 };
        let index = categories
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(i, cat)| (cat.clone(), offset + i))
            .collect();
        ColumnCategories {
            name: name.to_string(),
            categories,
            index,
        }
    }

    /// Encode rows into indicator columns
    pub fn transform(&self, x: &Array2<String>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(DropoutError::ModelNotFitted);
        }
        if x.ncols() != self.columns.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("{} categorical columns", self.columns.len()),
                actual: format!("{} categorical columns", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), self.n_outputs));
        for (row_idx, row) in x.axis_iter(Axis(0)).enumerate() {
            for (value, column) in row.iter().zip(self.columns.iter()) {
                match column.index.get(value) {
                    Some(&j) => out[[row_idx, j]] = 1.0,
                    None if column.categories.binary_search_by(|c| {
                        crate::data::compare_categories(c, value)
                    }).is_ok() => {}
                    None => {
                        if self.handle_unknown == HandleUnknown::Error {
                            return Err(DropoutError::PreprocessingError(format!(
                                "unknown category '{}' in column '{}'",
                                value, column.name
                            )));
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<String>, names: &[String]) -> Result<Array2<f64>> {
        self.fit(x, names)?;
        self.transform(x)
    }

    /// Output column names, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.n_outputs];
        for column in &self.columns {
            for (cat, &j) in &column.index {
                names[j] = format!("{}_{}", column.name, cat);
            }
        }
        names
    }

    /// Categories learned for a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.categories.as_slice())
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }
}
