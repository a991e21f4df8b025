//! Data preprocessing module
//!
//! Provides the feature transforms applied before model fitting:
//! - One-hot encoding of categorical columns (first category dropped,
//!   unknown categories ignored)
//! - Robust scaling of numeric columns (median / IQR)
//! - A column transformer combining both, with numeric scaling switchable

mod column_transformer;
mod encoder;
mod scaler;

pub use column_transformer::{build_preprocessors, ColumnTransformer, NumericHandling};
pub use encoder::{HandleUnknown, OneHotEncoder};
pub use scaler::{RobustScaler, ScalerParams};
