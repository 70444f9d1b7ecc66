//! Tree-ensemble classifier stored as JSON
//!
//! Evaluates a random forest exported as plain JSON: every tree votes with a
//! normalized per-class distribution and the forest averages the votes.

use super::{most_probable, ChurnModel};
use crate::errors::{ArtifactLoadError, ModelError};
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Routes `x[feature] <= threshold` to `left`, everything else to `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (sample counts or fractions)
    Leaf { value: Vec<f64> },
}

/// A single decision tree, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

/// On-disk layout of a forest artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSpec {
    pub classes: Vec<String>,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
    pub trees: Vec<Tree>,
}

/// Validated forest ready for evaluation
#[derive(Debug, Clone)]
pub struct ForestModel {
    spec: ForestSpec,
}

impl ForestModel {
    pub fn from_spec(spec: ForestSpec) -> Result<Self, ArtifactLoadError> {
        validate(&spec)?;
        Ok(Self { spec })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let spec: ForestSpec =
            serde_json::from_str(&content).map_err(|source| ArtifactLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_spec(spec)
    }

    pub fn tree_count(&self) -> usize {
        self.spec.trees.len()
    }

    fn check_width(&self, features: &FeatureVector) -> Result<(), ModelError> {
        if features.len() != self.spec.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.spec.n_features,
                actual: features.len(),
            });
        }
        Ok(())
    }
}

fn validate(spec: &ForestSpec) -> Result<(), ArtifactLoadError> {
    let invalid = |msg: String| Err(ArtifactLoadError::InvalidModel(msg));

    if spec.classes.is_empty() {
        return invalid("forest declares no classes".to_string());
    }
    if spec.trees.is_empty() {
        return invalid("forest contains no trees".to_string());
    }
    if let Some(importances) = &spec.feature_importances {
        if importances.len() != spec.n_features {
            return invalid(format!(
                "{} feature importances for {} features",
                importances.len(),
                spec.n_features
            ));
        }
        if importances.iter().any(|w| !w.is_finite()) {
            return invalid("feature importances must be finite".to_string());
        }
    }

    for (t, tree) in spec.trees.iter().enumerate() {
        if tree.nodes.is_empty() {
            return invalid(format!("tree {} has no nodes", t));
        }
        for (idx, node) in tree.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= spec.n_features {
                        return invalid(format!(
                            "tree {} node {} splits on feature {} of {}",
                            t, idx, feature, spec.n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return invalid(format!("tree {} node {} has a NaN threshold", t, idx));
                    }
                    // Children must point forward so every walk terminates
                    for child in [*left, *right] {
                        if child <= idx || child >= tree.nodes.len() {
                            return invalid(format!(
                                "tree {} node {} has out-of-order child {}",
                                t, idx, child
                            ));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != spec.classes.len() {
                        return invalid(format!(
                            "tree {} leaf {} has {} weights for {} classes",
                            t,
                            idx,
                            value.len(),
                            spec.classes.len()
                        ));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0)
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return invalid(format!(
                            "tree {} leaf {} weights must be non-negative with a positive sum",
                            t, idx
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn eval_tree<'a>(tree: &'a Tree, features: &[f64]) -> &'a [f64] {
    let mut idx = 0usize;
    loop {
        match &tree.nodes[idx] {
            Node::Leaf { value } => return value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                idx = if features[*feature] <= *threshold {
                    *left
                } else {
                    *right
                };
            }
        }
    }
}

impl ChurnModel for ForestModel {
    fn kind(&self) -> &'static str {
        "forest"
    }

    fn classes(&self) -> &[String] {
        &self.spec.classes
    }

    fn n_features(&self) -> usize {
        self.spec.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;

        let mut proba = vec![0.0; self.spec.classes.len()];
        for tree in &self.spec.trees {
            let leaf = eval_tree(tree, features.as_slice());
            let total: f64 = leaf.iter().sum();
            for (acc, weight) in proba.iter_mut().zip(leaf) {
                *acc += weight / total;
            }
        }

        let n_trees = self.spec.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }

    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError> {
        self.predict_with_proba(features).map(|(label, _)| label)
    }

    fn predict_with_proba(
        &self,
        features: &FeatureVector,
    ) -> Result<(String, Vec<f64>), ModelError> {
        let proba = self.predict_proba(features)?;
        let label = self.spec.classes[most_probable(&proba)].clone();
        Ok((label, proba))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.spec.feature_importances.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Node {
        Node::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    fn leaf(value: &[f64]) -> Node {
        Node::Leaf {
            value: value.to_vec(),
        }
    }

    /// Two stumps on tenure and contract: short tenure or monthly contract churns
    fn sample_spec() -> ForestSpec {
        ForestSpec {
            classes: vec!["No".to_string(), "Yes".to_string()],
            n_features: 4,
            feature_importances: Some(vec![0.5, 0.1, 0.3, 0.1]),
            trees: vec![
                Tree {
                    nodes: vec![split(0, 12.0, 1, 2), leaf(&[2.0, 8.0]), leaf(&[9.0, 1.0])],
                },
                Tree {
                    nodes: vec![split(2, 0.5, 1, 2), leaf(&[0.8, 0.2]), leaf(&[0.4, 0.6])],
                },
            ],
        }
    }

    #[test]
    fn test_proba_averages_normalized_leaves() {
        let model = ForestModel::from_spec(sample_spec()).unwrap();
        let proba = model
            .predict_proba(&FeatureVector::new(vec![5.0, 70.0, 1.0, 0.0]))
            .unwrap();

        // tree 1 -> [0.2, 0.8], tree 2 -> [0.4, 0.6]
        assert!((proba[0] - 0.3).abs() < 1e-9);
        assert!((proba[1] - 0.7).abs() < 1e-9);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_returns_most_probable_class() {
        let model = ForestModel::from_spec(sample_spec()).unwrap();

        let churner = FeatureVector::new(vec![5.0, 70.0, 1.0, 0.0]);
        assert_eq!(model.predict(&churner).unwrap(), "Yes");

        let loyal = FeatureVector::new(vec![60.0, 40.0, 0.0, 1.0]);
        assert_eq!(model.predict(&loyal).unwrap(), "No");
    }

    #[test]
    fn test_predict_with_proba_matches_separate_calls() {
        let model = ForestModel::from_spec(sample_spec()).unwrap();
        let churner = FeatureVector::new(vec![5.0, 70.0, 1.0, 0.0]);

        let (label, proba) = model.predict_with_proba(&churner).unwrap();
        assert_eq!(label, model.predict(&churner).unwrap());
        assert_eq!(proba, model.predict_proba(&churner).unwrap());
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let model = ForestModel::from_spec(sample_spec()).unwrap();
        let proba = model
            .predict_proba(&FeatureVector::new(vec![12.0, 0.0, 0.0, 0.0]))
            .unwrap();
        // tree 1 takes the left leaf at exactly the threshold
        assert!((proba[1] - (0.8 + 0.2) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_width_mismatch_is_an_error() {
        let model = ForestModel::from_spec(sample_spec()).unwrap();
        let err = model
            .predict_proba(&FeatureVector::new(vec![1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::FeatureCount {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_rejects_backward_children() {
        let mut spec = sample_spec();
        spec.trees[0].nodes[0] = split(0, 1.0, 0, 2);
        assert!(matches!(
            ForestModel::from_spec(spec),
            Err(ArtifactLoadError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_rejects_leaf_width_mismatch() {
        let mut spec = sample_spec();
        spec.trees[1].nodes[2] = leaf(&[1.0, 0.0, 0.0]);
        let err = ForestModel::from_spec(spec).unwrap_err();
        assert!(err.to_string().contains("3 weights for 2 classes"));
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let mut spec = sample_spec();
        spec.trees[0].nodes[0] = split(9, 1.0, 1, 2);
        assert!(ForestModel::from_spec(spec).is_err());
    }

    #[test]
    fn test_rejects_misaligned_importances() {
        let mut spec = sample_spec();
        spec.feature_importances = Some(vec![1.0]);
        assert!(ForestModel::from_spec(spec).is_err());
    }

    #[test]
    fn test_parses_json_layout() {
        let json = r#"{
            "classes": ["No", "Yes"],
            "n_features": 1,
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                    {"value": [3, 1]},
                    {"value": [0, 4]}
                ]}
            ]
        }"#;
        let spec: ForestSpec = serde_json::from_str(json).unwrap();
        let model = ForestModel::from_spec(spec).unwrap();

        assert_eq!(model.tree_count(), 1);
        assert!(model.feature_importances().is_none());
        assert_eq!(model.predict(&FeatureVector::new(vec![1.0])).unwrap(), "Yes");
    }
}
