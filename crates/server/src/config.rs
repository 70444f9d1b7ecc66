//! Service configuration
//!
//! Layered: an optional TOML/JSON/YAML file, then `CHURN_*` environment
//! variables (`__` separates nested keys, e.g. `CHURN_LOCALIZATION__FIELDS`).

use anyhow::{Context, Result};
use churn_lib::{
    pipeline::{Localization, LabelVocabulary, DEFAULT_TOP_N, TELCO_CATEGORICAL_FIELDS},
    ArtifactPaths, PipelineConfig,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Default location of the optional config file
pub const DEFAULT_CONFIG_PATH: &str = "config/churn.toml";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Port for the prediction, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Serialized classifier (`.json` forest or `.onnx`)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// JSON array of training column names
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Expected SHA256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Importances returned when the caller does not pass `top_n`
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_categorical_fields")]
    pub categorical_fields: Vec<String>,

    #[serde(default)]
    pub localization: Localization,

    #[serde(default)]
    pub vocabulary: LabelVocabulary,
}

fn default_api_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/churn_forest.json")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("model/training_columns.json")
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_categorical_fields() -> Vec<String> {
    TELCO_CATEGORICAL_FIELDS
        .iter()
        .map(|f| f.to_string())
        .collect()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model_path: default_model_path(),
            schema_path: default_schema_path(),
            model_sha256: None,
            top_n: default_top_n(),
            categorical_fields: default_categorical_fields(),
            localization: Localization::default(),
            vocabulary: LabelVocabulary::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `CHURN_CONFIG` (or the default path) and the environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("CHURN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from the given file, which may be absent, and the environment
    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CHURN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("categorical_fields")
                    .with_list_parse_key("localization.fields"),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path))?;

        config
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path))
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_path.clone(),
            schema: self.schema_path.clone(),
            model_sha256: self.model_sha256.clone(),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            categorical_fields: self.categorical_fields.clone(),
            localization: self.localization.clone(),
            vocabulary: self.vocabulary.clone(),
            top_n: self.top_n,
        }
    }
}
