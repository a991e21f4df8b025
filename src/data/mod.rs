//! Student records: feature schema, label encoding and feature matrices
//!
//! The raw dataset carries one row per student with a `Status` column taking
//! the values `Dropout`, `Graduate` or `Enrolled`. Only the first two are kept
//! and the label is encoded as `Dropout = 1`, `Graduate = 0`.

mod loader;

pub use loader::{
    feature_frame, labels, load_data, load_raw_csv, prepare_frame, write_csv, CategoricalOptions, ReferenceData,
};

use crate::error::{DropoutError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Name of the label column
pub const TARGET_COLUMN: &str = "Status";

/// Categorical features, in pipeline order
pub const CATEGORICAL_FEATURES: [&str; 11] = [
    "Marital_status",
    "Application_mode",
    "Daytime_evening_attendance",
    "Previous_qualification",
    "Displaced",
    "Educational_special_needs",
    "Tuition_fees_up_to_date",
    "Gender",
    "Scholarship_holder",
    "International",
    "Course",
];

/// Numeric features, in pipeline order
pub const NUMERIC_FEATURES: [&str; 15] = [
    "Admission_grade",
    "Previous_qualification_grade",
    "Age_at_enrollment",
    "Curricular_units_1st_sem_grade",
    "Curricular_units_2nd_sem_grade",
    "Curricular_units_1st_sem_credited",
    "Curricular_units_1st_sem_enrolled",
    "Curricular_units_1st_sem_evaluations",
    "Curricular_units_1st_sem_approved",
    "Curricular_units_1st_sem_without_evaluations",
    "Curricular_units_2nd_sem_credited",
    "Curricular_units_2nd_sem_enrolled",
    "Curricular_units_2nd_sem_evaluations",
    "Curricular_units_2nd_sem_approved",
    "Curricular_units_2nd_sem_without_evaluations",
];

/// Columns removed before modeling
pub const DROPPED_COLUMNS: [&str; 10] = [
    "Nacionality",
    "Application_order",
    "Unemployment_rate",
    "Inflation_rate",
    "GDP",
    "Mothers_qualification",
    "Fathers_qualification",
    "Mothers_occupation",
    "Fathers_occupation",
    "Debtor",
];

/// Binary outcome of a student record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Graduate,
    Dropout,
}

impl Status {
    pub const DROPOUT_LABEL: &'static str = "Dropout";
    pub const GRADUATE_LABEL: &'static str = "Graduate";
    pub const ENROLLED_LABEL: &'static str = "Enrolled";

    /// Parse a raw `Status` value. `Enrolled` and anything else map to `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            Self::DROPOUT_LABEL => Some(Status::Dropout),
            Self::GRADUATE_LABEL => Some(Status::Graduate),
            _ => None,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Status::Dropout),
            0 => Some(Status::Graduate),
            _ => None,
        }
    }

    /// Encoded class id
    pub fn code(self) -> i64 {
        match self {
            Status::Dropout => 1,
            Status::Graduate => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Dropout => Self::DROPOUT_LABEL,
            Status::Graduate => Self::GRADUATE_LABEL,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Named partition of the model inputs into categorical and numeric features.
///
/// The schema is stored inside every trained artifact so the inference side
/// can verify it assembles exactly the columns the model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
    pub target: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(&CATEGORICAL_FEATURES, &NUMERIC_FEATURES, TARGET_COLUMN)
    }
}

impl FeatureSchema {
    pub fn new(categorical: &[&str], numeric: &[&str], target: &str) -> Self {
        Self {
            categorical: categorical.iter().map(|s| s.to_string()).collect(),
            numeric: numeric.iter().map(|s| s.to_string()).collect(),
            target: target.to_string(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.categorical.len() + self.numeric.len()
    }

    /// All feature names, categorical first
    pub fn feature_names(&self) -> Vec<String> {
        self.categorical.iter().chain(self.numeric.iter()).cloned().collect()
    }

    /// Describe how `other` differs from `self`, or `None` when identical
    pub fn diff(&self, other: &FeatureSchema) -> Option<String> {
        if self == other {
            return None;
        }
        let mut parts = Vec::new();
        if self.target != other.target {
            parts.push(format!("target '{}' vs '{}'", self.target, other.target));
        }
        if self.categorical != other.categorical {
            parts.push(format!(
                "categorical features [{}] vs [{}]",
                self.categorical.join(", "),
                other.categorical.join(", ")
            ));
        }
        if self.numeric != other.numeric {
            parts.push(format!(
                "numeric features [{}] vs [{}]",
                self.numeric.join(", "),
                other.numeric.join(", ")
            ));
        }
        Some(parts.join("; "))
    }
}

/// Feature matrices for a set of records, columns in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub categorical: Array2<String>,
    pub numeric: Array2<f64>,
}

impl FeatureFrame {
    pub fn new(categorical: Array2<String>, numeric: Array2<f64>) -> Result<Self> {
        if categorical.nrows() != numeric.nrows() {
            return Err(DropoutError::ShapeError {
                expected: format!("{} numeric rows", categorical.nrows()),
                actual: format!("{} numeric rows", numeric.nrows()),
            });
        }
        Ok(Self { categorical, numeric })
    }

    /// Extract the schema columns of a prepared frame
    pub fn from_dataframe(df: &polars::prelude::DataFrame, schema: &FeatureSchema) -> Result<Self> {
        feature_frame(df, schema)
    }

    pub fn n_rows(&self) -> usize {
        self.numeric.nrows()
    }

    /// Subset of rows, in the order given
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            categorical: self.categorical.select(Axis(0), indices),
            numeric: self.numeric.select(Axis(0), indices),
        }
    }
}

/// Canonical category key for a numeric cell: integral values lose the
/// trailing `.0` so `1`, `1.0` and `"1"` all name the same category.
pub fn category_key(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Category key for a JSON value (numbers or strings)
pub fn category_key_json(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(category_key),
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordering for category values: numeric-looking values compare numerically
/// and sort before free-text values.
pub fn compare_categories(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sorted, de-duplicated categories
pub fn sorted_categories<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut categories: Vec<String> = values.into_iter().cloned().collect();
    categories.sort_by(|a, b| compare_categories(a, b));
    categories.dedup();
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::from_label("Dropout"), Some(Status::Dropout));
        assert_eq!(Status::from_label("Graduate"), Some(Status::Graduate));
        assert_eq!(Status::from_label("Enrolled"), None);
        assert_eq!(Status::Dropout.code(), 1);
        assert_eq!(Status::Graduate.code(), 0);
        assert_eq!(Status::from_code(1), Some(Status::Dropout));
    }

    #[test]
    fn test_default_schema() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.categorical.len(), 11);
        assert_eq!(schema.numeric.len(), 15);
        assert_eq!(schema.n_features(), 26);
        assert_eq!(schema.target, "Status");
        for dropped in DROPPED_COLUMNS {
            assert!(!schema.feature_names().iter().any(|f| f == dropped));
        }
    }

    #[test]
    fn test_schema_diff() {
        let a = FeatureSchema::default();
        let mut b = a.clone();
        assert!(a.diff(&b).is_none());
        b.numeric.pop();
        let diff = a.diff(&b).unwrap();
        assert!(diff.contains("numeric features"));
    }

    #[test]
    fn test_category_key() {
        assert_eq!(category_key(1.0), "1");
        assert_eq!(category_key(12.5), "12.5");
        assert_eq!(category_key_json(&serde_json::json!(3)), Some("3".to_string()));
        assert_eq!(category_key_json(&serde_json::json!(3.0)), Some("3".to_string()));
        assert_eq!(category_key_json(&serde_json::json!("a")), Some("a".to_string()));
        assert_eq!(category_key_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_sorted_categories_numeric_aware() {
        let values: Vec<String> = ["10", "2", "1", "2", "b", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sorted_categories(&values), vec!["1", "2", "10", "a", "b"]);
    }

    #[test]
    fn test_select_rows() {
        let frame = FeatureFrame::new(
            array![["a".to_string()], ["b".to_string()], ["c".to_string()]],
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap();
        let subset = frame.select_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        assert_eq!(subset.categorical[[0, 0]], "c");
        assert_eq!(subset.numeric[[1, 0]], 1.0);
    }

    #[test]
    fn test_frame_row_mismatch() {
        let result = FeatureFrame::new(array![["a".to_string()]], array![[1.0], [2.0]]);
        assert!(matches!(result, Err(DropoutError::ShapeError { .. })));
    }
}
