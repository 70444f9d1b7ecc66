//! Schema reconciliation
//!
//! Aligns an arbitrary client record with the training schema: numeric
//! fields are copied by exact name, categorical fields are expanded into
//! `{field}_{value}` indicators, and every column left untouched is zero.
//! Unknown categories and missing fields never fail.

use crate::errors::{PipelineError, PipelineResult};
use crate::models::{ClientRecord, FeatureVector, FieldValue};
use crate::schema::TrainingSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::debug;

/// Categorical fields of the Telco customer dataset
pub const TELCO_CATEGORICAL_FIELDS: &[&str] = &[
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
];

/// Service fields the French intake form answers with `Oui`/`Non`
pub const INTAKE_FORM_FIELDS: &[&str] = &[
    "MultipleLines",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// One value substitution, e.g. `Oui` -> `Yes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapping {
    pub from: String,
    pub to: String,
}

/// Localized-value remapping applied before encoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localization {
    /// Fields the mapping applies to; empty means every field
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub values: Vec<ValueMapping>,
}

impl Localization {
    /// `Oui` -> `Yes` and `Non` -> `No` on the intake form's service fields
    pub fn intake_form() -> Self {
        Self {
            fields: INTAKE_FORM_FIELDS.iter().map(|f| f.to_string()).collect(),
            values: [("Oui", "Yes"), ("Non", "No")]
                .iter()
                .map(|(from, to)| ValueMapping {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.values.is_empty()
    }

    fn applies_to(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == field)
    }

    /// Remap a text value when a mapping matches, otherwise borrow it unchanged
    pub fn apply<'a>(&self, field: &str, value: &'a FieldValue) -> Cow<'a, FieldValue> {
        if !self.is_enabled() || !self.applies_to(field) {
            return Cow::Borrowed(value);
        }
        match value
            .as_text()
            .and_then(|text| self.values.iter().find(|m| m.from == text))
        {
            Some(mapping) => Cow::Owned(FieldValue::Text(mapping.to.clone())),
            None => Cow::Borrowed(value),
        }
    }
}

/// Maps client records onto the training schema
#[derive(Debug, Clone, Default)]
pub struct SchemaReconciler {
    categorical: HashSet<String>,
    localization: Localization,
}

impl SchemaReconciler {
    pub fn new<I, S>(categorical_fields: I, localization: Localization) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categorical: categorical_fields.into_iter().map(Into::into).collect(),
            localization,
        }
    }

    pub fn is_categorical(&self, field: &str) -> bool {
        self.categorical.contains(field)
    }

    pub fn categorical_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.categorical.iter().map(String::as_str).collect();
        fields.sort_unstable();
        fields
    }

    /// Reject records whose shape the model cannot take.
    ///
    /// A field named exactly like a schema column (and not declared
    /// categorical) must be numeric; floats must be finite.
    pub fn validate(&self, record: &ClientRecord, schema: &TrainingSchema) -> PipelineResult<()> {
        for (field, raw) in record.iter() {
            if let FieldValue::Float(v) = raw {
                if !v.is_finite() {
                    return Err(PipelineError::InvalidInput(format!(
                        "field '{}' must be a finite number",
                        field
                    )));
                }
            }

            let value = self.localization.apply(field, raw);
            if schema.contains(field) && !self.is_categorical(field) && value.as_number().is_none()
            {
                return Err(PipelineError::InvalidInput(format!(
                    "field '{}' must be numeric, got '{}'",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Build the feature vector in schema order
    pub fn reconcile(&self, record: &ClientRecord, schema: &TrainingSchema) -> FeatureVector {
        let mut values = vec![0.0; schema.len()];

        for (field, raw) in record.iter() {
            let value = self.localization.apply(field, raw);

            if !self.is_categorical(field) {
                if let (Some(idx), Some(number)) = (schema.position(field), value.as_number()) {
                    values[idx] = number;
                    continue;
                }
                // Extra numeric fields have no column to land in
                if value.as_text().is_none() {
                    debug!(field = %field, "Dropping numeric field absent from schema");
                    continue;
                }
            }

            let indicator = format!("{}_{}", field, value);
            match schema.position(&indicator) {
                Some(idx) => values[idx] = 1.0,
                None => debug!(field = %field, indicator = %indicator, "Dropping unseen category"),
            }
        }

        FeatureVector::new(values)
    }
}
