//! CSV loading and record preparation

use crate::data::{category_key, sorted_categories, FeatureFrame, FeatureSchema, Status, DROPPED_COLUMNS};
use crate::error::{DropoutError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Read a CSV file with a header row
pub fn load_raw_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
    Ok(df)
}

/// Load and clean the student dataset.
///
/// Keeps `Dropout` and `Graduate` rows only, encodes `Status` as
/// `Dropout = 1` / `Graduate = 0` and drops the unused columns.
pub fn load_data(path: impl AsRef<Path>) -> Result<DataFrame> {
    let raw = load_raw_csv(path.as_ref())?;
    let cleaned = prepare_frame(&raw)?;
    info!(
        path = %path.as_ref().display(),
        raw_rows = raw.height(),
        rows = cleaned.height(),
        cols = cleaned.width(),
        "Prepared student records"
    );
    Ok(cleaned)
}

/// Clean an in-memory frame the same way `load_data` does
pub fn prepare_frame(df: &DataFrame) -> Result<DataFrame> {
    let target = crate::data::TARGET_COLUMN;

    let mask: BooleanChunked = column_series(df, target)?
        .str()?
        .into_iter()
        .map(|v| v.and_then(Status::from_label).is_some())
        .collect();
    let mut filtered = df.filter(&mask)?;

    let encoded: Int64Chunked = column_series(&filtered, target)?
        .str()?
        .into_iter()
        .map(|v| v.and_then(Status::from_label).map(Status::code))
        .collect();
    filtered.with_column(encoded.with_name(target.into()).into_series())?;

    for col in DROPPED_COLUMNS {
        filtered = filtered
            .drop(col)
            .map_err(|_| DropoutError::FeatureNotFound(col.to_string()))?;
    }

    Ok(filtered)
}

/// Write a frame to CSV
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

/// Extract the schema columns of a prepared frame as feature matrices
pub fn feature_frame(df: &DataFrame, schema: &FeatureSchema) -> Result<FeatureFrame> {
    let n_rows = df.height();

    let mut categorical = Array2::from_elem((n_rows, schema.categorical.len()), String::new());
    for (j, name) in schema.categorical.iter().enumerate() {
        for (i, value) in categorical_values(df, name)?.into_iter().enumerate() {
            categorical[[i, j]] = value;
        }
    }

    let mut numeric = Array2::zeros((n_rows, schema.numeric.len()));
    for (j, name) in schema.numeric.iter().enumerate() {
        let series = column_series(df, name)?.cast(&DataType::Float64)?;
        for (i, value) in series.f64()?.into_iter().enumerate() {
            numeric[[i, j]] = value.ok_or_else(|| missing_value(name, i))?;
        }
    }

    FeatureFrame::new(categorical, numeric)
}

/// Extract the encoded label vector of a prepared frame
pub fn labels(df: &DataFrame, schema: &FeatureSchema) -> Result<Array1<i64>> {
    let series = column_series(df, &schema.target)?.cast(&DataType::Int64)?;
    let values = series
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Some(code) if Status::from_code(code).is_some() => Ok(code),
            Some(code) => Err(DropoutError::DataError(format!(
                "unexpected label {} in row {}",
                code, i
            ))),
            None => Err(missing_value(&schema.target, i)),
        })
        .collect::<Result<Vec<i64>>>()?;
    Ok(Array1::from_vec(values))
}

fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| DropoutError::FeatureNotFound(name.to_string()))
}

fn missing_value(column: &str, row: usize) -> DropoutError {
    DropoutError::DataError(format!("missing value in column '{}' at row {}", column, row))
}

/// Cell values of a categorical column as category keys
fn categorical_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = column_series(df, name)?;
    match series.dtype() {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
        DataType::Float32 | DataType::Float64 => {
            let cast = series.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| v.map(category_key).ok_or_else(|| missing_value(name, i)))
                .collect()
        }
        _ => {
            let cast = series.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| v.map(str::to_string).ok_or_else(|| missing_value(name, i)))
                .collect()
        }
    }
}

/// Selectable values for one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalOptions {
    pub name: String,
    pub options: Vec<String>,
}

/// Reference dataset summary used to populate categorical selectors.
///
/// Built once per process and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    features: Vec<CategoricalOptions>,
    n_records: usize,
}

impl ReferenceData {
    /// Load a reference CSV. Rows with a textual `Status` other than
    /// `Dropout`/`Graduate` are ignored; already-encoded files are used as is.
    pub fn load(path: impl AsRef<Path>, schema: &FeatureSchema) -> Result<Self> {
        let df = load_raw_csv(path.as_ref())?;
        let textual_status = df
            .column(&schema.target)
            .map(|c| matches!(c.dtype(), DataType::String))
            .unwrap_or(false);
        let df = if textual_status {
            let mask: BooleanChunked = column_series(&df, &schema.target)?
                .str()?
                .into_iter()
                .map(|v| v.and_then(Status::from_label).is_some())
                .collect();
            df.filter(&mask)?
        } else {
            df
        };
        let reference = Self::from_frame(&df, schema)?;
        info!(
            path = %path.as_ref().display(),
            records = reference.n_records,
            "Loaded reference data"
        );
        Ok(reference)
    }

    pub fn from_frame(df: &DataFrame, schema: &FeatureSchema) -> Result<Self> {
        let features = schema
            .categorical
            .iter()
            .map(|name| {
                let values = categorical_values(df, name)?;
                let options = sorted_categories(&values);
                if options.is_empty() {
                    return Err(DropoutError::DataError(format!(
                        "no observed values for categorical feature '{}'",
                        name
                    )));
                }
                Ok(CategoricalOptions { name: name.clone(), options })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { features, n_records: df.height() })
    }

    pub fn features(&self) -> &[CategoricalOptions] {
        &self.features
    }

    pub fn options(&self, feature: &str) -> Option<&[String]> {
        self.features
            .iter()
            .find(|f| f.name == feature)
            .map(|f| f.options.as_slice())
    }

    pub fn n_records(&self) -> usize {
        self.n_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureSchema;

    fn raw_df() -> DataFrame {
        let mut df = df!(
            "Status" => &["Dropout", "Graduate", "Enrolled", "Graduate"],
            "Course" => &[33i64, 171, 171, 9500],
            "Admission_grade" => &[120.5, 140.0, 130.0, 150.0]
        )
        .unwrap();
        for col in DROPPED_COLUMNS {
            df.with_column(Series::new(col.into(), &[0i64, 0, 0, 0])).unwrap();
        }
        df
    }

    #[test]
    fn test_prepare_frame_filters_and_encodes() {
        let cleaned = prepare_frame(&raw_df()).unwrap();
        assert_eq!(cleaned.height(), 3);
        let status: Vec<Option<i64>> = cleaned.column("Status").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(status, vec![Some(1), Some(0), Some(0)]);
        for col in DROPPED_COLUMNS {
            assert!(cleaned.column(col).is_err(), "{} should be dropped", col);
        }
        assert!(cleaned.column("Course").is_ok());
    }

    #[test]
    fn test_prepare_frame_missing_dropped_column() {
        let df = df!("Status" => &["Dropout"], "Course" => &[1i64]).unwrap();
        let err = prepare_frame(&df).unwrap_err();
        assert!(matches!(err, DropoutError::FeatureNotFound(_)));
    }

    #[test]
    fn test_feature_frame_extraction() {
        let cleaned = prepare_frame(&raw_df()).unwrap();
        let schema = FeatureSchema::new(&["Course"], &["Admission_grade"], "Status");
        let frame = feature_frame(&cleaned, &schema).unwrap();
        assert_eq!(frame.n_rows(), 3);
        assert_eq!(frame.categorical[[0, 0]], "33");
        assert_eq!(frame.numeric[[2, 0]], 150.0);

        let y = labels(&cleaned, &schema).unwrap();
        assert_eq!(y.to_vec(), vec![1, 0, 0]);
    }

    #[test]
    fn test_reference_options_sorted() {
        let schema = FeatureSchema::new(&["Course"], &["Admission_grade"], "Status");
        let reference = ReferenceData::from_frame(&raw_df(), &schema).unwrap();
        assert_eq!(reference.options("Course").unwrap(), &["33", "171", "9500"]);
        assert!(reference.options("Gender").is_none());
    }
}
