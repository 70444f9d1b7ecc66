//! Feature importance ranking

use crate::model::ChurnModel;
use crate::models::FeatureImportance;
use crate::schema::TrainingSchema;
use tracing::warn;

/// Number of features reported when the caller does not choose
pub const DEFAULT_TOP_N: usize = 10;

/// Rank the model's global importances by weight, highest first.
///
/// Returns `None` when the model exposes no importances. Ties keep schema
/// order and the result never exceeds `top_n` entries.
pub fn importances(
    model: &dyn ChurnModel,
    schema: &TrainingSchema,
    top_n: usize,
) -> Option<Vec<FeatureImportance>> {
    let weights = model.feature_importances()?;
    if weights.len() != schema.len() {
        warn!(
            weights = weights.len(),
            columns = schema.len(),
            "Feature importances do not align with schema, skipping explanation"
        );
        return None;
    }

    let mut ranked: Vec<FeatureImportance> = schema
        .columns()
        .iter()
        .zip(weights)
        .map(|(feature, weight)| FeatureImportance {
            feature: feature.clone(),
            weight: *weight,
        })
        .collect();

    // sort_by is stable, equal weights stay in schema order
    ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    ranked.truncate(top_n);
    Some(ranked)
}
