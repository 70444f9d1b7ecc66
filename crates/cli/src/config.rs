//! Configuration management for the CLI

use anyhow::{Context, Result};
use churn_lib::{
    pipeline::{LabelVocabulary, Localization, DEFAULT_TOP_N, TELCO_CATEGORICAL_FIELDS},
    PipelineConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Used when neither the flag, the environment nor the config file names an API
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// CLI configuration
///
/// The pipeline settings only matter for the local fallback and default to
/// what `config/churn.toml` ships for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Model used when the API cannot be reached
    pub model_path: Option<PathBuf>,
    /// Training schema used when the API cannot be reached
    pub schema_path: Option<PathBuf>,
    pub categorical_fields: Vec<String>,
    pub localization: Localization,
    pub vocabulary: LabelVocabulary,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            model_path: None,
            schema_path: None,
            categorical_fields: TELCO_CATEGORICAL_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            localization: Localization::intake_form(),
            vocabulary: LabelVocabulary::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.config/churn/config.json`, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Flag or env value first, then the config file, then the default
    pub fn resolve_api_url(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Pipeline settings for local inference
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            categorical_fields: self.categorical_fields.clone(),
            localization: self.localization.clone(),
            vocabulary: self.vocabulary.clone(),
            top_n: DEFAULT_TOP_N,
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("churn").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.api_url.is_none());
        assert_eq!(config.resolve_api_url(None), DEFAULT_API_URL);
        assert_eq!(config.localization, Localization::intake_form());
    }

    #[test]
    fn test_pipeline_settings_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "categorical_fields": ["Contract"],
                "localization": {"fields": ["Partner"], "values": [{"from": "Ja", "to": "Yes"}]},
                "vocabulary": {"fallback": {"message": "stays"}}
            }"#,
        )
        .unwrap();

        let pipeline = Config::load_from(&path).unwrap().pipeline_config();
        assert_eq!(pipeline.categorical_fields, vec!["Contract"]);
        assert_eq!(pipeline.localization.fields, vec!["Partner"]);
        assert_eq!(pipeline.vocabulary.fallback.message, "stays");
        // labels not listed keep the built-in table
        assert!(pipeline.vocabulary.lookup("Yes").churn);
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_url": "http://churn.internal:8000"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolve_api_url(None), "http://churn.internal:8000");
        assert_eq!(
            config.resolve_api_url(Some("http://127.0.0.1:9000".to_string())),
            "http://127.0.0.1:9000"
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
