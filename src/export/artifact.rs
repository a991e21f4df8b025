//! Trained pipeline artifact

use crate::data::FeatureSchema;
use crate::error::{DropoutError, Result};
use crate::optimizer::LogisticParams;
use crate::training::{ClassificationReport, LogisticRegression, ResampledPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Descriptive information stored next to the fitted pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub trained_at: DateTime<Utc>,
    /// Crate version that wrote the artifact
    pub crate_version: String,
    pub model_type: String,
    pub best_params: LogisticParams,
    /// Mean cross-validated F2 of the best candidate
    pub cv_f2: f64,
    /// Mean cross-validated F2 of the untuned baseline
    pub baseline_f2: f64,
    pub test_report: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
}

impl ArtifactMetadata {
    pub fn new(
        best_params: LogisticParams,
        cv_f2: f64,
        baseline_f2: f64,
        test_report: ClassificationReport,
        n_train: usize,
        n_test: usize,
    ) -> Self {
        Self {
            trained_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            model_type: "LogisticRegression".to_string(),
            best_params,
            cv_f2,
            baseline_f2,
            test_report,
            n_train,
            n_test,
        }
    }
}

/// On-disk layout. The pipeline is stored as an opaque checksummed payload
/// so corruption is reported before decoding it.
#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    metadata: ArtifactMetadata,
    schema: FeatureSchema,
    payload: Vec<u8>,
    checksum: u64,
}

/// Fitted preprocessing + classifier bundle with the schema it was trained on
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub schema: FeatureSchema,
    pub pipeline: ResampledPipeline<LogisticRegression>,
}

impl ModelArtifact {
    pub const MAGIC: [u8; 4] = *b"SDRP";
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(
        metadata: ArtifactMetadata,
        schema: FeatureSchema,
        pipeline: ResampledPipeline<LogisticRegression>,
    ) -> Self {
        Self {
            metadata,
            schema,
            pipeline,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.pipeline.is_fitted() {
            return Err(DropoutError::ModelNotFitted);
        }
        let payload = bincode::serialize(&self.pipeline)?;
        let envelope = Envelope {
            magic: Self::MAGIC,
            format_version: Self::FORMAT_VERSION,
            metadata: self.metadata.clone(),
            schema: self.schema.clone(),
            checksum: fnv1a(&payload),
            payload,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    /// Decode and verify magic, version and checksum
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 || bytes[..4] != Self::MAGIC {
            return Err(DropoutError::SerializationError(
                "not a model artifact (bad magic bytes)".to_string(),
            ));
        }
        let envelope: Envelope = bincode::deserialize(bytes)?;
        if envelope.format_version != Self::FORMAT_VERSION {
            return Err(DropoutError::SerializationError(format!(
                "unsupported artifact format version {} (expected {})",
                envelope.format_version,
                Self::FORMAT_VERSION
            )));
        }
        if fnv1a(&envelope.payload) != envelope.checksum {
            return Err(DropoutError::SerializationError(
                "artifact checksum mismatch".to_string(),
            ));
        }
        let pipeline: ResampledPipeline<LogisticRegression> = bincode::deserialize(&envelope.payload)?;

        Ok(Self {
            metadata: envelope.metadata,
            schema: envelope.schema,
            pipeline,
        })
    }

    /// Write the artifact. Not atomic: a failed write can leave a partial file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        info!(path = %path.display(), bytes = bytes.len(), "Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path.as_ref())?).read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Load and check that the embedded schema equals `expected`
    pub fn load_for_schema(path: impl AsRef<Path>, expected: &FeatureSchema) -> Result<Self> {
        let artifact = Self::load(path)?;
        artifact.check_schema(expected)?;
        Ok(artifact)
    }

    pub fn check_schema(&self, expected: &FeatureSchema) -> Result<()> {
        match self.schema.diff(expected) {
            None => Ok(()),
            Some(diff) => Err(DropoutError::SchemaMismatch(diff)),
        }
    }
}

/// FNV-1a 64-bit hash
fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, &byte| (hash ^ byte as u64).wrapping_mul(FNV_PRIME))
}
