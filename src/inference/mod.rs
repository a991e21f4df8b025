//! Inference front end
//!
//! An [`InputForm`] is built from the reference data: one selector per
//! categorical feature and one slider per numeric feature. A filled-in
//! [`StudentRecord`] is turned into a one-row feature frame in schema order
//! and scored by the [`InferenceEngine`].

mod engine;
mod form;

pub use engine::{InferenceEngine, InferenceStats, Prediction};
pub use form::{numeric_field, CategoricalField, InputForm, NumericFieldSpec, StudentRecord, NUMERIC_FIELDS};
