//! One-shot artifact loading
//!
//! Loads the training schema and the model from disk once at startup,
//! verifies the optional checksum and checks that both agree on the
//! feature width. The outcome is a `LoadResult` which the service turns into
//! a `ServingState`; loading is never retried per request.

use crate::errors::ArtifactLoadError;
use crate::model::{load_model, ChurnModel};
use crate::schema::TrainingSchema;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Number of checksum hex characters used as the model version
const VERSION_LEN: usize = 12;

/// Where to find the artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub schema: PathBuf,
    /// Expected SHA256 of the model file (hex), verified when set
    pub model_sha256: Option<String>,
}

/// Model and schema loaded together, immutable afterwards
#[derive(Clone)]
pub struct Artifacts {
    model: Arc<dyn ChurnModel>,
    schema: Arc<TrainingSchema>,
    version: String,
}

impl fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifacts")
            .field("kind", &self.model.kind())
            .field("classes", &self.model.classes())
            .field("columns", &self.schema.len())
            .field("version", &self.version)
            .finish()
    }
}

impl Artifacts {
    /// Pair a model with its schema, rejecting width mismatches
    pub fn new(
        model: Arc<dyn ChurnModel>,
        schema: Arc<TrainingSchema>,
        version: impl Into<String>,
    ) -> Result<Self, ArtifactLoadError> {
        if model.n_features() != schema.len() {
            return Err(ArtifactLoadError::Incompatible(format!(
                "model expects {} features, schema has {} columns",
                model.n_features(),
                schema.len()
            )));
        }
        if let Some(importances) = model.feature_importances() {
            if importances.len() != schema.len() {
                return Err(ArtifactLoadError::Incompatible(format!(
                    "{} feature importances for {} schema columns",
                    importances.len(),
                    schema.len()
                )));
            }
        }

        Ok(Self {
            model,
            schema,
            version: version.into(),
        })
    }

    pub fn model(&self) -> &dyn ChurnModel {
        self.model.as_ref()
    }

    pub fn schema(&self) -> &TrainingSchema {
        &self.schema
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Outcome of the startup load
pub type LoadResult = Result<Artifacts, ArtifactLoadError>;

/// Load schema and model from disk
pub fn load_artifacts(paths: &ArtifactPaths) -> LoadResult {
    let schema = TrainingSchema::load(&paths.schema)?;
    debug!(path = %paths.schema.display(), columns = schema.len(), "Training schema loaded");

    let checksum = file_checksum(&paths.model)?;
    if let Some(expected) = &paths.model_sha256 {
        if !expected.eq_ignore_ascii_case(&checksum) {
            return Err(ArtifactLoadError::ChecksumMismatch {
                expected: expected.clone(),
                actual: checksum,
            });
        }
        debug!(checksum = %checksum, "Model checksum validated");
    }

    let model = load_model(&paths.model, schema.len())?;
    let version = checksum[..VERSION_LEN.min(checksum.len())].to_string();

    let artifacts = Artifacts::new(Arc::from(model), Arc::new(schema), version)?;
    info!(
        kind = artifacts.model().kind(),
        version = %artifacts.version(),
        columns = artifacts.schema().len(),
        classes = ?artifacts.model().classes(),
        "Artifacts loaded"
    );
    Ok(artifacts)
}

/// Compute SHA256 checksum of a byte slice
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn file_checksum(path: &Path) -> Result<String, ArtifactLoadError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(compute_checksum(&bytes))
}

/// Readiness of the process-wide prediction state
#[derive(Debug, Clone)]
pub enum ServingState {
    Loaded(Arc<Artifacts>),
    Unavailable { reason: String },
}

impl ServingState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServingState::Loaded(_))
    }

    pub fn artifacts(&self) -> Option<&Arc<Artifacts>> {
        match self {
            ServingState::Loaded(artifacts) => Some(artifacts),
            ServingState::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ServingState::Loaded(_) => None,
            ServingState::Unavailable { reason } => Some(reason),
        }
    }
}

impl From<LoadResult> for ServingState {
    fn from(result: LoadResult) -> Self {
        match result {
            Ok(artifacts) => ServingState::Loaded(Arc::new(artifacts)),
            Err(err) => ServingState::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}
