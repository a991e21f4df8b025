//! Input form: categorical selectors and numeric sliders

use crate::data::{category_key, category_key_json, FeatureFrame, FeatureSchema, ReferenceData};
use crate::error::{DropoutError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds and default of one numeric slider
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericFieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Default as configured; may lie outside `[min, max]`
    pub default: f64,
    /// Whole numbers only
    pub integer: bool,
}

impl NumericFieldSpec {
    const fn float(name: &'static str, label: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self { name, label, min, max, step: 0.1, default, integer: false }
    }

    const fn int(name: &'static str, label: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self { name, label, min, max, step: 1.0, default, integer: true }
    }

    /// Starting value of the slider, clamped into range
    pub fn effective_default(&self) -> f64 {
        self.default.clamp(self.min, self.max)
    }

    pub fn validate(&self, value: f64) -> Result<f64> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(DropoutError::InvalidInput(format!(
                "{} must lie in [{}, {}], got {}",
                self.name, self.min, self.max, value
            )));
        }
        if self.integer && value.fract() != 0.0 {
            return Err(DropoutError::InvalidInput(format!(
                "{} must be a whole number, got {}",
                self.name, value
            )));
        }
        Ok(value)
    }
}

/// Slider table for the numeric features
pub const NUMERIC_FIELDS: [NumericFieldSpec; 15] = [
    NumericFieldSpec::float("Admission_grade", "Admission grade", 95.0, 190.0, 80.0),
    NumericFieldSpec::float("Previous_qualification_grade", "Previous qualification grade", 95.0, 190.0, 130.0),
    NumericFieldSpec::int("Age_at_enrollment", "Age at enrollment", 17.0, 70.0, 22.0),
    NumericFieldSpec::float("Curricular_units_1st_sem_grade", "Curricular units 1st sem (grade)", 0.0, 18.8, 6.0),
    NumericFieldSpec::float("Curricular_units_2nd_sem_grade", "Curricular units 2nd sem (grade)", 0.0, 18.57, 9.0),
    NumericFieldSpec::int("Curricular_units_1st_sem_credited", "Units 1st sem (credited)", 0.0, 20.0, 6.0),
    NumericFieldSpec::int("Curricular_units_1st_sem_enrolled", "Units 1st sem (enrolled)", 0.0, 26.0, 8.0),
    NumericFieldSpec::int("Curricular_units_1st_sem_evaluations", "Units 1st sem (evaluations)", 0.0, 45.0, 10.0),
    NumericFieldSpec::int("Curricular_units_1st_sem_approved", "Units 1st sem (approved)", 0.0, 26.0, 7.0),
    NumericFieldSpec::int("Curricular_units_1st_sem_without_evaluations", "Units 1st sem (without evaluations)", 0.0, 12.0, 0.0),
    NumericFieldSpec::int("Curricular_units_2nd_sem_credited", "Units 2nd sem (credited)", 0.0, 19.0, 5.0),
    NumericFieldSpec::int("Curricular_units_2nd_sem_enrolled", "Units 2nd sem (enrolled)", 0.0, 23.0, 6.0),
    NumericFieldSpec::int("Curricular_units_2nd_sem_evaluations", "Units 2nd sem (evaluations)", 0.0, 33.0, 10.0),
    NumericFieldSpec::int("Curricular_units_2nd_sem_approved", "Units 2nd sem (approved)", 0.0, 20.0, 5.0),
    NumericFieldSpec::int("Curricular_units_2nd_sem_without_evaluations", "Units 2nd sem (without evaluations)", 0.0, 12.0, 0.0),
];

pub fn numeric_field(name: &str) -> Option<&'static NumericFieldSpec> {
    NUMERIC_FIELDS.iter().find(|f| f.name == name)
}

/// One categorical selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalField {
    pub name: String,
    pub label: String,
    pub options: Vec<String>,
    pub default: String,
}

impl CategoricalField {
    /// Option matching `raw`, accepting `"1.0"` for option `"1"`
    fn resolve(&self, raw: &str) -> Option<&String> {
        self.options.iter().find(|o| o.as_str() == raw).or_else(|| {
            let key = category_key(raw.trim().parse::<f64>().ok()?);
            self.options.iter().find(|o| **o == key)
        })
    }
}

/// Human-readable label: underscores to spaces, first letter upper case
fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ").to_lowercase();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// All inputs needed to assemble one feature vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputForm {
    pub categorical: Vec<CategoricalField>,
    pub numeric: Vec<NumericFieldSpec>,
}

impl InputForm {
    /// Selectors in schema order, options from the reference data
    pub fn new(schema: &FeatureSchema, reference: &ReferenceData) -> Result<Self> {
        let categorical = schema
            .categorical
            .iter()
            .map(|name| {
                let options = reference
                    .options(name)
                    .filter(|o| !o.is_empty())
                    .ok_or_else(|| DropoutError::FeatureNotFound(name.clone()))?
                    .to_vec();
                Ok(CategoricalField {
                    name: name.clone(),
                    label: field_label(name),
                    default: options[0].clone(),
                    options,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let numeric = schema
            .numeric
            .iter()
            .map(|name| numeric_field(name).copied().ok_or_else(|| DropoutError::FeatureNotFound(name.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { categorical, numeric })
    }

    pub fn categorical_field(&self, name: &str) -> Option<&CategoricalField> {
        self.categorical.iter().find(|f| f.name == name)
    }

    pub fn numeric_field(&self, name: &str) -> Option<&NumericFieldSpec> {
        self.numeric.iter().find(|f| f.name == name)
    }

    /// Record with every field at its default
    pub fn default_record(&self) -> StudentRecord {
        StudentRecord {
            categorical: self
                .categorical
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
            numeric: self
                .numeric
                .iter()
                .map(|f| (f.name.to_string(), f.effective_default()))
                .collect(),
        }
    }
}

/// Values of one student, keyed by feature name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub categorical: BTreeMap<String, String>,
    pub numeric: BTreeMap<String, f64>,
}

impl StudentRecord {
    /// Select a categorical option; the value must be one the form offers
    pub fn set_categorical(&mut self, form: &InputForm, name: &str, value: &str) -> Result<()> {
        let field = form
            .categorical_field(name)
            .ok_or_else(|| DropoutError::FeatureNotFound(name.to_string()))?;
        let option = field.resolve(value).ok_or_else(|| {
            DropoutError::InvalidInput(format!(
                "'{}' is not an option for {} (options: {})",
                value,
                name,
                field.options.join(", ")
            ))
        })?;
        self.categorical.insert(name.to_string(), option.clone());
        Ok(())
    }

    pub fn set_numeric(&mut self, form: &InputForm, name: &str, value: f64) -> Result<()> {
        let field = form
            .numeric_field(name)
            .ok_or_else(|| DropoutError::FeatureNotFound(name.to_string()))?;
        self.numeric.insert(name.to_string(), field.validate(value)?);
        Ok(())
    }

    /// Set a field from text, e.g. a `name=value` command line argument
    pub fn set_from_str(&mut self, form: &InputForm, name: &str, raw: &str) -> Result<()> {
        if form.numeric_field(name).is_some() {
            let value = raw.trim().parse::<f64>().map_err(|_| {
                DropoutError::InvalidInput(format!("{} expects a number, got '{}'", name, raw))
            })?;
            self.set_numeric(form, name, value)
        } else {
            self.set_categorical(form, name, raw.trim())
        }
    }

    /// Apply every entry of a JSON object
    pub fn apply_json(&mut self, form: &InputForm, values: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
        for (name, value) in values {
            if form.numeric_field(name).is_some() {
                let number = value.as_f64().ok_or_else(|| {
                    DropoutError::InvalidInput(format!("{} expects a number, got {}", name, value))
                })?;
                self.set_numeric(form, name, number)?;
            } else {
                let key = category_key_json(value).ok_or_else(|| {
                    DropoutError::InvalidInput(format!("{} expects a category, got {}", name, value))
                })?;
                self.set_categorical(form, name, &key)?;
            }
        }
        Ok(())
    }

    /// One-row feature frame in exact schema order
    pub fn to_feature_frame(&self, schema: &FeatureSchema) -> Result<FeatureFrame> {
        let categorical = schema
            .categorical
            .iter()
            .map(|name| {
                self.categorical
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DropoutError::FeatureNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let numeric = schema
            .numeric
            .iter()
            .map(|name| {
                self.numeric
                    .get(name)
                    .copied()
                    .ok_or_else(|| DropoutError::FeatureNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        FeatureFrame::new(
            Array2::from_shape_vec((1, categorical.len()), categorical)?,
            Array2::from_shape_vec((1, numeric.len()), numeric)?,
        )
    }
}
