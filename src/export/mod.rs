//! Trained model persistence
//!
//! A single binary artifact holds the fitted pipeline, the feature schema it
//! was trained on and training metadata. Loading verifies magic bytes,
//! format version and a checksum of the pipeline payload.

mod artifact;

pub use artifact::{ArtifactMetadata, ModelArtifact};
