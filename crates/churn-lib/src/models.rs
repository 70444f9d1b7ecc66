//! Core data models for the churn prediction pipeline

use crate::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar field value supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Strings count when they parse as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) if v.is_finite() => Some(*v),
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One customer to classify: field name to scalar value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl ClientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from an arbitrary JSON payload.
    ///
    /// The payload must be an object whose values are strings or numbers.
    pub fn from_json(value: &serde_json::Value) -> PipelineResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            PipelineError::InvalidInput("record must be a JSON object".to_string())
        })?;

        let mut record = ClientRecord::new();
        for (name, raw) in object {
            let field = match raw {
                serde_json::Value::String(s) => FieldValue::Text(s.clone()),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => FieldValue::Integer(i),
                    None => match n.as_f64() {
                        Some(f) => FieldValue::Float(f),
                        None => {
                            return Err(PipelineError::InvalidInput(format!(
                                "field '{}' holds an unrepresentable number",
                                name
                            )))
                        }
                    },
                },
                other => {
                    return Err(PipelineError::InvalidInput(format!(
                        "field '{}' must be a string or a number, got {}",
                        name,
                        json_type_name(other)
                    )))
                }
            };
            record.fields.insert(name.clone(), field);
        }
        Ok(record)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Number(_) => "a number",
    }
}

/// Numeric row aligned 1:1 and in order with the training schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }
}

/// A single ranked feature weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub weight: f64,
}

/// How the caller wants the confidence packaged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceFormat {
    /// `80.0`
    #[default]
    Number,
    /// `"80.00%"`
    Percent,
}

/// Confidence of the predicted label, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(f64),
    Percent(String),
}

impl Confidence {
    pub fn new(percent: f64, format: ConfidenceFormat) -> Self {
        match format {
            ConfidenceFormat::Number => Confidence::Number(percent),
            ConfidenceFormat::Percent => Confidence::Percent(format!("{:.2}%", percent)),
        }
    }

    /// Percentage regardless of packaging
    pub fn value(&self) -> Option<f64> {
        match self {
            Confidence::Number(v) => Some(*v),
            Confidence::Percent(s) => s.trim_end_matches('%').trim().parse().ok(),
        }
    }
}

/// Structured, explainable answer for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Raw class label as known by the model
    pub label: String,
    /// Human-facing interpretation of the label
    pub message: String,
    /// Whether the label denotes attrition
    pub churn: bool,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<FeatureImportance>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    pub model_version: String,
    pub generated_at: i64,
}
