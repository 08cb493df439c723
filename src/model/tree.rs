//! Regression trees in XGBoost's array layout

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// A single node of a regression tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        /// Direction taken when the feature is missing (NaN)
        default_left: bool,
    },
    Leaf(f32),
}

/// Tree as stored under `gradient_booster.model.trees` in a JSON model
#[derive(Debug, Clone, Deserialize)]
pub struct TreeJson {
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i64>,
    pub split_conditions: Vec<f32>,
    #[serde(deserialize_with = "flags")]
    pub default_left: Vec<bool>,
    /// 0 = numerical, 1 = categorical
    #[serde(default)]
    pub split_type: Vec<u8>,
}

/// Accept `default_left` as either booleans or 0/1 integers
fn flags<'de, D>(deserializer: D) -> std::result::Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u8),
    }

    let raw = Vec::<Flag>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|f| match f {
            Flag::Bool(b) => Ok(b),
            Flag::Int(0) => Ok(false),
            Flag::Int(1) => Ok(true),
            Flag::Int(other) => Err(de::Error::custom(format!(
                "default_left must be 0 or 1, got {}",
                other
            ))),
        })
        .collect()
}

/// A validated regression tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree from its JSON arrays
    ///
    /// Checks array lengths, child indices and feature indices so that
    /// evaluation cannot index out of bounds or loop.
    pub fn from_json(json: &TreeJson, num_features: usize) -> std::result::Result<Self, String> {
        let n = json.left_children.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if json.right_children.len() != n
            || json.split_indices.len() != n
            || json.split_conditions.len() != n
            || json.default_left.len() != n
        {
            return Err(format!("tree arrays disagree on node count ({})", n));
        }
        if json.split_type.iter().any(|&t| t != 0) {
            return Err("categorical splits are not supported".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (json.left_children[i], json.right_children[i]);
            if left == -1 {
                nodes.push(Node::Leaf(json.split_conditions[i]));
                continue;
            }

            // Children always come after their parent in XGBoost's layout
            let child = |c: i32| -> std::result::Result<usize, String> {
                let c = usize::try_from(c).map_err(|_| format!("node {} has bad child {}", i, c))?;
                if c <= i || c >= n {
                    return Err(format!("node {} has bad child {}", i, c));
                }
                Ok(c)
            };

            let feature = usize::try_from(json.split_indices[i])
                .ok()
                .filter(|&f| f < num_features)
                .ok_or_else(|| {
                    format!(
                        "node {} splits on feature {} but the model has {} features",
                        i, json.split_indices[i], num_features
                    )
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: json.split_conditions[i],
                left: child(left)?,
                right: child(right)?,
                default_left: json.default_left[i],
            });
        }

        Ok(Tree { nodes })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }

    /// Walk from the root to a leaf and return its value
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[feature];
                    idx = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}
