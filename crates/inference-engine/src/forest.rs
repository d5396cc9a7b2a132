//! Tree Ensemble Models

use crate::artifact::{ForestArtifact, MultiOutputArtifact, Node, TreeArtifact};
use crate::classifier::{Classifier, FailureMode, FailureModeFlag, NO_FAILURE_CLASS};
use crate::{ArtifactError, InferenceError};
use feature_reconciler::Schema;
use std::collections::HashSet;

/// Probability at or above which a failure mode is flagged
const MODE_FLAG_THRESHOLD: f64 = 0.5;

/// Validated decision tree.
///
/// Child indices always point past their parent, so traversal terminates.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Validate a tree against the model's feature count and class count
    pub fn from_artifact(
        tree: TreeArtifact,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, ArtifactError> {
        if tree.nodes.is_empty() {
            return Err(ArtifactError::EmptyTree);
        }

        let len = tree.nodes.len();
        for (idx, node) in tree.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ArtifactError::FeatureOutOfRange {
                            node: idx,
                            feature: *feature,
                            n_features,
                        });
                    }
                    if threshold.is_nan() {
                        return Err(ArtifactError::NanThreshold(idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(ArtifactError::InvalidChild { node: idx, child });
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(ArtifactError::LeafWidth {
                            node: idx,
                            len: value.len(),
                            n_classes,
                        });
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(ArtifactError::InvalidWeights(idx));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(ArtifactError::EmptyLeaf(idx));
                    }
                }
            }
        }

        Ok(Self { nodes: tree.nodes })
    }

    /// Leaf class weights reached by `row`
    pub fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Normalized class probabilities for `row`
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let weights = self.leaf(row);
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn build_trees(
    trees: Vec<TreeArtifact>,
    n_features: usize,
    n_classes: usize,
) -> Result<Vec<DecisionTree>, ArtifactError> {
    if trees.is_empty() {
        return Err(ArtifactError::NoTrees);
    }
    trees
        .into_iter()
        .enumerate()
        .map(|(index, tree)| {
            DecisionTree::from_artifact(tree, n_features, n_classes).map_err(|e| {
                ArtifactError::Tree {
                    index,
                    error: Box::new(e),
                }
            })
        })
        .collect()
}

/// Mean of per-tree probabilities
fn average_proba(trees: &[DecisionTree], row: &[f64], n_classes: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_classes];
    for tree in trees {
        for (acc, p) in sum.iter_mut().zip(tree.predict_proba(row)) {
            *acc += p;
        }
    }
    let n = trees.len() as f64;
    sum.iter_mut().for_each(|p| *p /= n);
    sum
}

fn check_row(schema: &Schema, row: &[f64]) -> Result<(), InferenceError> {
    if row.len() != schema.len() {
        return Err(InferenceError::InvalidInputShape {
            expected: format!("{} features", schema.len()),
            actual: format!("{} features", row.len()),
        });
    }
    Ok(())
}

/// Random forest classifier; probabilities are averaged across trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    schema: Schema,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn from_artifact(artifact: ForestArtifact, schema: Schema) -> Result<Self, ArtifactError> {
        let n_classes = artifact.classes.len();
        if n_classes < 2 {
            return Err(ArtifactError::TooFewClasses(n_classes));
        }
        let distinct: HashSet<i64> = artifact.classes.iter().copied().collect();
        if distinct.len() != n_classes {
            return Err(ArtifactError::DuplicateClasses);
        }
        if !distinct.contains(&NO_FAILURE_CLASS) {
            return Err(ArtifactError::MissingNoFailureClass);
        }

        let trees = build_trees(artifact.trees, schema.len(), n_classes)?;
        Ok(Self {
            schema,
            classes: artifact.classes,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Nodes across every tree
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(DecisionTree::node_count).sum()
    }
}

impl Classifier for RandomForest {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_row(&self.schema, row)?;
        Ok(average_proba(&self.trees, row, self.classes.len()))
    }
}

/// One binary forest per failure mode.
///
/// The machine is predicted to fail when any mode is flagged; the overall
/// failure probability is the largest mode probability.
#[derive(Debug, Clone)]
pub struct MultiOutputForest {
    schema: Schema,
    outputs: Vec<(FailureMode, Vec<DecisionTree>)>,
}

impl MultiOutputForest {
    const CLASSES: [i64; 2] = [NO_FAILURE_CLASS, 1];

    pub fn from_artifact(
        artifact: MultiOutputArtifact,
        schema: Schema,
    ) -> Result<Self, ArtifactError> {
        let mut outputs: Vec<(FailureMode, Vec<DecisionTree>)> =
            Vec::with_capacity(FailureMode::ALL.len());
        for output in artifact.outputs {
            let mode: FailureMode = output
                .label
                .parse()
                .map_err(|_| ArtifactError::UnknownMode(output.label.clone()))?;
            if outputs.iter().any(|(m, _)| *m == mode) {
                return Err(ArtifactError::DuplicateMode(mode));
            }
            let trees =
                build_trees(output.trees, schema.len(), 2).map_err(|e| ArtifactError::Output {
                    mode,
                    error: Box::new(e),
                })?;
            outputs.push((mode, trees));
        }

        let missing: Vec<FailureMode> = FailureMode::ALL
            .into_iter()
            .filter(|m| !outputs.iter().any(|(o, _)| o == m))
            .collect();
        if !missing.is_empty() {
            return Err(ArtifactError::MissingModes(missing));
        }

        outputs.sort_by_key(|(mode, _)| FailureMode::ALL.iter().position(|m| m == mode));
        Ok(Self { schema, outputs })
    }

    pub fn tree_count(&self) -> usize {
        self.outputs.iter().map(|(_, trees)| trees.len()).sum()
    }

    /// Nodes across every mode's trees
    pub fn node_count(&self) -> usize {
        self.outputs
            .iter()
            .flat_map(|(_, trees)| trees)
            .map(DecisionTree::node_count)
            .sum()
    }

    fn mode_probabilities(&self, row: &[f64]) -> Vec<(FailureMode, f64)> {
        self.outputs
            .iter()
            .map(|(mode, trees)| (*mode, average_proba(trees, row, 2)[1]))
            .collect()
    }
}

impl Classifier for MultiOutputForest {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn classes(&self) -> &[i64] {
        &Self::CLASSES
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_row(&self.schema, row)?;
        let p_fail = self
            .mode_probabilities(row)
            .into_iter()
            .map(|(_, p)| p)
            .fold(0.0, f64::max);
        Ok(vec![1.0 - p_fail, p_fail])
    }

    fn predict(&self, row: &[f64]) -> Result<i64, InferenceError> {
        let any_flagged = self
            .failure_modes(row)?
            .unwrap_or_default()
            .iter()
            .any(|f| f.flagged);
        Ok(if any_flagged { 1 } else { NO_FAILURE_CLASS })
    }

    fn failure_modes(&self, row: &[f64]) -> Result<Option<Vec<FailureModeFlag>>, InferenceError> {
        check_row(&self.schema, row)?;
        Ok(Some(
            self.mode_probabilities(row)
                .into_iter()
                .map(|(mode, probability)| FailureModeFlag {
                    mode,
                    flagged: probability >= MODE_FLAG_THRESHOLD,
                    probability,
                })
                .collect(),
        ))
    }
}
