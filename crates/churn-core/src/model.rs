use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PredictionError, StartupError};
use crate::schema::Label;
use crate::util::sigmoid;

/// An opaque, read-only binary classifier.
///
/// Loaded once at start-up and shared by every request, hence `Send + Sync`.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Short backend name for logs / `/healthz`.
    fn kind(&self) -> &'static str;

    /// Number of input columns the classifier was trained on.
    fn n_features(&self) -> usize;

    /// `[p(no churn), p(churn)]` for a single row.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictionError>;

    fn predict(&self, row: &[f64]) -> Result<Label, PredictionError>;
}

/// 二分类逻辑回归：z = intercept + Σ w_i x_i
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(row)
            .fold(self.intercept, |z, (w, x)| z + w * x)
    }

    fn validate(&self, n_features: usize) -> Result<(), StartupError> {
        if self.coefficients.len() != n_features {
            return Err(StartupError::Incompatible(format!(
                "logistic model has {} coefficients, expected {n_features}",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(StartupError::Incompatible(
                "logistic model has non-finite weights".into(),
            ));
        }
        Ok(())
    }
}

/// One node of a binary decision tree, stored in a flat array.
///
/// Children always sit after their parent, so evaluation terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// 缺失值（NaN）走左子树
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

fn default_left() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `row`. `x < threshold` goes left.
    pub fn eval(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut i = 0usize;
        loop {
            let node = self
                .nodes
                .get(i)
                .ok_or_else(|| PredictionError::Backend(format!("tree node {i} out of range")))?;
            match *node {
                Node::Leaf { leaf } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = *row.get(feature).ok_or(PredictionError::ShapeMismatch {
                        expected: feature + 1,
                        got: row.len(),
                    })?;
                    let go_left = if x.is_nan() { default_left } else { x < threshold };
                    i = if go_left { left } else { right };
                }
            }
        }
    }

    fn validate(&self, t: usize, n_features: usize) -> Result<(), StartupError> {
        if self.nodes.is_empty() {
            return Err(StartupError::Incompatible(format!("tree {t} is empty")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { leaf } if !leaf.is_finite() => {
                    return Err(StartupError::Incompatible(format!(
                        "tree {t} node {i}: non-finite leaf"
                    )));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(StartupError::Incompatible(format!(
                            "tree {t} node {i}: feature {feature} >= {n_features}"
                        )));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(StartupError::Incompatible(format!(
                                "tree {t} node {i}: bad child index {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Boosted trees with a logistic link: p = sigmoid(base_score + Σ leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn margin(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut z = self.base_score;
        for tree in &self.trees {
            z += tree.eval(row)?;
        }
        Ok(z)
    }

    fn validate(&self, n_features: usize) -> Result<(), StartupError> {
        if self.trees.is_empty() {
            return Err(StartupError::Incompatible("tree ensemble has no trees".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(t, n_features)?;
        }
        Ok(())
    }
}

/// Serialized model body, selected by its `"kind"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

/// A loaded churn model plus its decision threshold.
#[derive(Debug, Clone)]
pub struct ChurnModel {
    spec: ModelSpec,
    n_features: usize,
    threshold: f64,
}

impl ChurnModel {
    pub fn new(spec: ModelSpec, n_features: usize, threshold: f64) -> Result<Self, StartupError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(StartupError::Incompatible(format!(
                "decision threshold {threshold} is outside [0, 1]"
            )));
        }
        match &spec {
            ModelSpec::Logistic(m) => m.validate(n_features)?,
            ModelSpec::TreeEnsemble(m) => m.validate(n_features)?,
        }
        Ok(Self {
            spec,
            n_features,
            threshold,
        })
    }

    fn churn_proba(&self, row: &[f64]) -> Result<f64, PredictionError> {
        if row.len() != self.n_features {
            return Err(PredictionError::ShapeMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        let z = match &self.spec {
            ModelSpec::Logistic(m) => m.margin(row),
            ModelSpec::TreeEnsemble(m) => m.margin(row)?,
        };
        let p = sigmoid(z);
        if !p.is_finite() {
            return Err(PredictionError::NonFinite);
        }
        Ok(p)
    }
}

impl Classifier for ChurnModel {
    fn kind(&self) -> &'static str {
        match self.spec {
            ModelSpec::Logistic(_) => "logistic",
            ModelSpec::TreeEnsemble(_) => "tree_ensemble",
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictionError> {
        let p = self.churn_proba(row)?;
        Ok([1.0 - p, p])
    }

    fn predict(&self, row: &[f64]) -> Result<Label, PredictionError> {
        let p = self.churn_proba(row)?;
        // 与 p(churn) 相等时判为不流失
        Ok(if p > self.threshold {
            Label::Churn
        } else {
            Label::NoChurn
        })
    }
}
