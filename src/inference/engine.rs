//! Inference engine: form values in, verdict out

use super::form::{InputForm, StudentRecord};
use crate::data::{FeatureSchema, ReferenceData, Status};
use crate::error::{DropoutError, Result};
use crate::export::{ArtifactMetadata, ModelArtifact};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

const DROPOUT_RECOMMENDATIONS: [&str; 3] = [
    "Make sure the student receives intensive academic mentoring.",
    "Re-check the number of courses approved in the 2nd semester.",
    "Review tuition payment status and provide financial aid if needed.",
];

const GRADUATE_NOTES: [&str; 2] = [
    "The student shows reasonably strong academic indicators.",
    "Keep monitoring performance in the following semesters.",
];

/// Outcome of scoring one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub status: Status,
    /// Probability of the Dropout class, in `[0, 1]`
    pub dropout_probability: f64,
}

impl Prediction {
    pub fn new(status: Status, dropout_probability: f64) -> Self {
        Self {
            status,
            dropout_probability,
        }
    }

    /// Dropout probability as a percentage with two decimals
    pub fn percentage(&self) -> String {
        format!("{:.2}%", self.dropout_probability * 100.0)
    }

    pub fn verdict(&self) -> String {
        match self.status {
            Status::Dropout => format!("Prediction: Dropout (Probability = {})", self.percentage()),
            Status::Graduate => format!("Prediction: Graduate (Dropout probability = {})", self.percentage()),
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.status {
            Status::Dropout => "Initial recommendations:",
            Status::Graduate => "Good standing:",
        }
    }

    pub fn recommendations(&self) -> &'static [&'static str] {
        match self.status {
            Status::Dropout => &DROPOUT_RECOMMENDATIONS,
            Status::Graduate => &GRADUATE_NOTES,
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.verdict())?;
        writeln!(f, "{}", self.heading())?;
        for line in self.recommendations() {
            writeln!(f, "- {}", line)?;
        }
        Ok(())
    }
}

/// Inference statistics snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub avg_latency_ms: f64,
}

/// Loaded artifact plus the form built from the reference data
#[derive(Debug)]
pub struct InferenceEngine {
    artifact: ModelArtifact,
    reference: ReferenceData,
    form: InputForm,
    total_predictions: AtomicU64,
    total_latency_us: AtomicU64,
}

impl InferenceEngine {
    /// Pair an artifact with reference data. The reference data must carry
    /// every categorical feature the artifact was trained on.
    pub fn new(artifact: ModelArtifact, reference: ReferenceData) -> Result<Self> {
        if !artifact.pipeline.is_fitted() {
            return Err(DropoutError::ModelNotFitted);
        }
        let form = InputForm::new(&artifact.schema, &reference)?;
        Ok(Self {
            artifact,
            reference,
            form,
            total_predictions: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
        })
    }

    /// Load both files; the artifact's schema must equal `schema`
    pub fn load(
        model_path: impl AsRef<Path>,
        reference_path: impl AsRef<Path>,
        schema: &FeatureSchema,
    ) -> Result<Self> {
        let artifact = ModelArtifact::load_for_schema(model_path.as_ref(), schema)?;
        let reference = ReferenceData::load(reference_path.as_ref(), schema)?;
        info!(
            model = %model_path.as_ref().display(),
            reference = %reference_path.as_ref().display(),
            records = reference.n_records(),
            "Inference engine ready"
        );
        Self::new(artifact, reference)
    }

    pub fn form(&self) -> &InputForm {
        &self.form
    }

    pub fn default_record(&self) -> StudentRecord {
        self.form.default_record()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.artifact.schema
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.artifact.metadata
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn predict(&self, record: &StudentRecord) -> Result<Prediction> {
        let start = Instant::now();
        let frame = record.to_feature_frame(&self.artifact.schema)?;
        let pipeline = &self.artifact.pipeline;
        let code = *pipeline
            .predict(&frame)?
            .first()
            .ok_or_else(|| DropoutError::InferenceError("model returned no class".to_string()))?;
        let status = Status::from_code(code)
            .ok_or_else(|| DropoutError::InferenceError(format!("unexpected class {}", code)))?;
        let dropout_probability = *pipeline
            .predict_proba(&frame)?
            .first()
            .ok_or_else(|| DropoutError::InferenceError("model returned no probability".to_string()))?;

        let prediction = Prediction::new(status, dropout_probability);
        let elapsed = start.elapsed().as_micros() as u64;
        self.total_predictions.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(elapsed, Ordering::Relaxed);
        debug!(status = %prediction.status, probability = dropout_probability, "Scored record");
        Ok(prediction)
    }

    pub fn stats(&self) -> InferenceStats {
        let total = self.total_predictions.load(Ordering::Relaxed);
        let latency = self.total_latency_us.load(Ordering::Relaxed);
        InferenceStats {
            total_predictions: total,
            avg_latency_ms: if total > 0 {
                latency as f64 / total as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}
