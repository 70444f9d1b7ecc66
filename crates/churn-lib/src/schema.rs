//! Training-time column schema
//!
//! The ordered list of feature names the model was fit against. It fixes both
//! the column universe and the column order of every reconciled vector.

use crate::errors::ArtifactLoadError;
use std::collections::HashMap;
use std::path::Path;

/// Ordered, duplicate-free list of training feature names
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TrainingSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, ArtifactLoadError> {
        if columns.is_empty() {
            return Err(ArtifactLoadError::EmptySchema);
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(ArtifactLoadError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Self { columns, positions })
    }

    /// Load a schema stored as a JSON array of strings
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: Vec<String> =
            serde_json::from_str(&content).map_err(|source| ArtifactLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
