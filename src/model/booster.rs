//! Gradient-boosted tree ensemble read from an XGBoost JSON model
//!
//! Supports the `gbtree` and `dart` boosters with a single output. The
//! artifact is the file written by `XGBRegressor.save_model("*.json")`.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use super::tree::{Tree, TreeJson};
use crate::{ForecastError, Result};

#[derive(Debug, Deserialize)]
struct ModelFileJson {
    learner: LearnerJson,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct LearnerJson {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBoosterJson,
    learner_model_param: LearnerModelParamJson,
    objective: ObjectiveJson,
    #[serde(default)]
    attributes: AttributesJson,
}

/// Set by early stopping; predictions only use trees up to this round
#[derive(Debug, Default, Deserialize)]
struct AttributesJson {
    #[serde(default)]
    best_iteration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GradientBoosterJson {
    name: String,
    /// Tree model for `gbtree`, weights for `gblinear`
    #[serde(default)]
    model: Option<serde_json::Value>,
    /// Wrapped booster for `dart`
    #[serde(default)]
    gbtree: Option<Box<GradientBoosterJson>>,
    #[serde(default)]
    weight_drop: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelJson {
    trees: Vec<TreeJson>,
    /// Output group of each tree
    #[serde(default)]
    tree_info: Vec<i32>,
    #[serde(default)]
    gbtree_model_param: Option<GbTreeModelParamJson>,
    /// First tree of each boosting round, written since XGBoost 2.0
    #[serde(default)]
    iteration_indptr: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelParamJson {
    #[serde(default)]
    num_parallel_tree: Option<String>,
}

// XGBoost stores these numbers as strings
#[derive(Debug, Deserialize)]
struct LearnerModelParamJson {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    num_feature: String,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveJson {
    name: String,
}

/// How raw margins map to model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Squared, absolute, Huber and quantile losses: output is the margin
    Identity(&'static str),
    /// Logistic regression: sigmoid of the margin
    Logistic(&'static str),
    /// Poisson, gamma and Tweedie: exp of the margin
    Exp(&'static str),
}

impl Objective {
    pub fn from_name(name: &str) -> Option<Self> {
        let objective = match name {
            "reg:squarederror" => Objective::Identity("reg:squarederror"),
            "reg:linear" => Objective::Identity("reg:linear"),
            "reg:squaredlogerror" => Objective::Identity("reg:squaredlogerror"),
            "reg:absoluteerror" => Objective::Identity("reg:absoluteerror"),
            "reg:pseudohubererror" => Objective::Identity("reg:pseudohubererror"),
            "reg:quantileerror" => Objective::Identity("reg:quantileerror"),
            "reg:logistic" => Objective::Logistic("reg:logistic"),
            "binary:logistic" => Objective::Logistic("binary:logistic"),
            "count:poisson" => Objective::Exp("count:poisson"),
            "reg:gamma" => Objective::Exp("reg:gamma"),
            "reg:tweedie" => Objective::Exp("reg:tweedie"),
            _ => return None,
        };
        Some(objective)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::Identity(n) | Objective::Logistic(n) | Objective::Exp(n) => n,
        }
    }

    /// Convert the stored base score (output space) to margin space
    fn base_margin(&self, base_score: f32) -> std::result::Result<f32, String> {
        match self {
            Objective::Identity(_) => Ok(base_score),
            Objective::Logistic(_) => {
                if base_score <= 0.0 || base_score >= 1.0 {
                    return Err(format!(
                        "base_score {} is outside (0, 1) for {}",
                        base_score,
                        self.name()
                    ));
                }
                Ok((base_score / (1.0 - base_score)).ln())
            }
            Objective::Exp(_) => {
                if base_score <= 0.0 {
                    return Err(format!(
                        "base_score {} must be positive for {}",
                        base_score,
                        self.name()
                    ));
                }
                Ok(base_score.ln())
            }
        }
    }

    fn transform(&self, margin: f32) -> f32 {
        match self {
            Objective::Identity(_) => margin,
            Objective::Logistic(_) => 1.0 / (1.0 + (-margin).exp()),
            Objective::Exp(_) => margin.exp(),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which booster produced the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoosterKind {
    GbTree,
    Dart,
}

impl fmt::Display for BoosterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoosterKind::GbTree => write!(f, "gbtree"),
            BoosterKind::Dart => write!(f, "dart"),
        }
    }
}

/// Loaded tree ensemble, immutable after construction
#[derive(Debug, Clone)]
pub struct Booster {
    kind: BoosterKind,
    trees: Vec<Tree>,
    /// Per-tree scale; all 1.0 except for dart
    tree_weights: Vec<f32>,
    objective: Objective,
    base_score: f32,
    base_margin: f32,
    num_features: usize,
    feature_names: Vec<String>,
    version: Vec<u32>,
}

fn parse_number<T: std::str::FromStr>(field: &str, text: &str) -> std::result::Result<T, String> {
    // Newer releases wrap scalars in brackets, e.g. "[1.05E2]"
    let trimmed = text.trim().trim_start_matches('[').trim_end_matches(']').trim();
    trimmed
        .parse()
        .map_err(|_| format!("cannot parse {} from '{}'", field, text))
}

/// Number of trees that make up the first `rounds` boosting rounds
fn rounds_end(model: &GbTreeModelJson, rounds: usize) -> std::result::Result<usize, String> {
    let total = model.trees.len();
    if !model.iteration_indptr.is_empty() {
        return Ok(model
            .iteration_indptr
            .get(rounds)
            .copied()
            .unwrap_or(total)
            .min(total));
    }
    let per_round: usize = match model
        .gbtree_model_param
        .as_ref()
        .and_then(|p| p.num_parallel_tree.as_deref())
    {
        Some(n) => parse_number("num_parallel_tree", n)?,
        None => 1,
    };
    Ok(rounds.saturating_mul(per_round.max(1)).min(total))
}

impl Booster {
    /// Read a model file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |message: String| ForecastError::ModelLoad {
            path: path.display().to_string(),
            message,
        };

        let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let booster = Self::from_json_str(&text).map_err(load_error)?;

        log::info!(
            "Loaded {} model from {} ({} trees, {} features, objective {})",
            booster.kind,
            path.display(),
            booster.num_trees(),
            booster.num_features,
            booster.objective
        );
        Ok(booster)
    }

    /// Parse a model from its JSON text
    pub fn from_json_str(text: &str) -> std::result::Result<Self, String> {
        let file: ModelFileJson =
            serde_json::from_str(text).map_err(|e| format!("invalid model JSON: {}", e))?;
        let learner = file.learner;
        let params = &learner.learner_model_param;

        let num_features: usize = parse_number("num_feature", &params.num_feature)?;
        if let Some(num_class) = &params.num_class {
            let num_class: usize = parse_number("num_class", num_class)?;
            if num_class > 1 {
                return Err(format!(
                    "multi-class models ({} classes) are not supported",
                    num_class
                ));
            }
        }
        if let Some(num_target) = &params.num_target {
            let num_target: usize = parse_number("num_target", num_target)?;
            if num_target > 1 {
                return Err(format!(
                    "multi-target models ({} targets) are not supported",
                    num_target
                ));
            }
        }

        let objective = Objective::from_name(&learner.objective.name)
            .ok_or_else(|| format!("unsupported objective '{}'", learner.objective.name))?;
        let base_score: f32 = parse_number("base_score", &params.base_score)?;
        let base_margin = objective.base_margin(base_score)?;

        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_features {
            return Err(format!(
                "model lists {} feature names but num_feature is {}",
                learner.feature_names.len(),
                num_features
            ));
        }

        let (kind, tree_model, weight_drop) = match learner.gradient_booster.name.as_str() {
            "gbtree" => (BoosterKind::GbTree, learner.gradient_booster.model, None),
            "dart" => {
                let inner = learner
                    .gradient_booster
                    .gbtree
                    .ok_or_else(|| "dart booster without a gbtree section".to_string())?;
                (
                    BoosterKind::Dart,
                    inner.model,
                    Some(learner.gradient_booster.weight_drop),
                )
            }
            other => return Err(format!("unsupported booster '{}'", other)),
        };

        let tree_model: GbTreeModelJson = tree_model
            .ok_or_else(|| "booster has no model section".to_string())
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| format!("invalid tree model: {}", e))
            })?;

        if tree_model.tree_info.iter().any(|&group| group != 0) {
            return Err("trees for more than one output group are not supported".to_string());
        }

        let tree_limit = match &learner.attributes.best_iteration {
            Some(best) => {
                let best: usize = parse_number("best_iteration", best)?;
                let limit = rounds_end(&tree_model, best + 1)?;
                log::debug!(
                    "best_iteration {} keeps {} of {} trees",
                    best,
                    limit,
                    tree_model.trees.len()
                );
                limit
            }
            None => tree_model.trees.len(),
        };

        let trees = tree_model.trees[..tree_limit]
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::from_json(t, num_features).map_err(|e| format!("tree {}: {}", i, e)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tree_weights = match weight_drop {
            Some(mut weights) => {
                if weights.len() != tree_model.trees.len() {
                    return Err(format!(
                        "dart has {} tree weights for {} trees",
                        weights.len(),
                        tree_model.trees.len()
                    ));
                }
                weights.truncate(tree_limit);
                weights
            }
            None => vec![1.0; trees.len()],
        };

        Ok(Booster {
            kind,
            trees,
            tree_weights,
            objective,
            base_score,
            base_margin,
            num_features,
            feature_names: learner.feature_names,
            version: file.version,
        })
    }

    /// Score one feature row
    pub fn predict(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.num_features {
            return Err(ForecastError::Prediction(format!(
                "feature shape mismatch, expected: {}, got {}",
                self.num_features,
                features.len()
            )));
        }

        let margin = self
            .trees
            .iter()
            .zip(&self.tree_weights)
            .fold(self.base_margin, |acc, (tree, &w)| acc + w * tree.predict(features));

        let output = self.objective.transform(margin);
        if !output.is_finite() {
            return Err(ForecastError::Prediction(format!(
                "model produced a non-finite value ({})",
                output
            )));
        }
        Ok(output)
    }

    pub fn kind(&self) -> BoosterKind {
        self.kind
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Feature names recorded at training time, empty if none were saved
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Base score in output space, as stored in the model
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    /// XGBoost release that wrote the model, if recorded
    pub fn version(&self) -> Option<String> {
        if self.version.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.version.iter().map(|v| v.to_string()).collect();
        Some(parts.join("."))
    }

    pub fn total_leaves(&self) -> usize {
        self.trees.iter().map(|t| t.num_leaves()).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Stump on feature `feature`: x < threshold ? left : right
    pub(crate) fn stump(feature: usize, threshold: f32, left: f32, right: f32) -> Value {
        json!({
            "base_weights": [0.0, left, right],
            "default_left": [0, 0, 0],
            "id": 0,
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "parents": [2147483647, 0, 0],
            "split_conditions": [threshold, left, right],
            "split_indices": [feature, 0, 0],
            "split_type": [0, 0, 0],
            "tree_param": {"num_deleted": "0", "num_feature": "2", "num_nodes": "3", "size_leaf_vector": "1"}
        })
    }

    /// Model file in the layout written by XGBoost 2.x
    pub(crate) fn model_json(
        base_score: &str,
        objective: &str,
        num_feature: usize,
        feature_names: Vec<&str>,
        trees: Vec<Value>,
    ) -> String {
        let tree_info: Vec<i32> = vec![0; trees.len()];
        json!({
            "learner": {
                "attributes": {},
                "feature_names": feature_names,
                "feature_types": [],
                "gradient_booster": {
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": trees.len().to_string()},
                        "iteration_indptr": [],
                        "tree_info": tree_info,
                        "trees": trees
                    },
                    "name": "gbtree"
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "boost_from_average": "1",
                    "num_class": "0",
                    "num_feature": num_feature.to_string(),
                    "num_target": "1"
                },
                "objective": {"name": objective, "reg_loss_param": {"scale_pos_weight": "1"}}
            },
            "version": [2, 0, 3]
        })
        .to_string()
    }

    #[test]
    fn test_squared_error_sums_leaves() {
        let text = model_json(
            "5E-1",
            "reg:squarederror",
            2,
            vec![],
            vec![stump(0, 10.0, 1.0, 2.0), stump(1, 0.5, -0.25, 0.75)],
        );
        let booster = Booster::from_json_str(&text).unwrap();

        assert_eq!(booster.kind(), BoosterKind::GbTree);
        assert_eq!(booster.num_trees(), 2);
        assert_eq!(booster.total_leaves(), 4);
        assert_eq!(booster.version().as_deref(), Some("2.0.3"));
        assert_eq!(booster.predict(&[5.0, 0.0]).unwrap(), 0.5 + 1.0 - 0.25);
        assert_eq!(booster.predict(&[10.0, 1.0]).unwrap(), 0.5 + 2.0 + 0.75);
    }

    #[test]
    fn test_best_iteration_limits_trees() {
        let text = model_json(
            "1E1",
            "reg:squarederror",
            2,
            vec![],
            vec![stump(0, 1.0, 1.0, 1.0), stump(0, 1.0, 100.0, 100.0)],
        )
        .replace("\"attributes\":{}", "\"attributes\":{\"best_iteration\":\"0\",\"best_score\":\"3.1\"}");
        let booster = Booster::from_json_str(&text).unwrap();
        assert_eq!(booster.num_trees(), 1);
        assert_eq!(booster.predict(&[0.0, 0.0]).unwrap(), 11.0);
    }

    #[test]
    fn test_best_iteration_counts_parallel_trees() {
        let trees = vec![
            stump(0, 1.0, 1.0, 1.0),
            stump(0, 1.0, 2.0, 2.0),
            stump(0, 1.0, 100.0, 100.0),
            stump(0, 1.0, 200.0, 200.0),
        ];
        let text = model_json("0E0", "reg:squarederror", 2, vec![], trees.clone())
            .replace("\"attributes\":{}", "\"attributes\":{\"best_iteration\":\"0\"}")
            .replace("\"num_parallel_tree\":\"1\"", "\"num_parallel_tree\":\"2\"");
        let booster = Booster::from_json_str(&text).unwrap();
        assert_eq!(booster.predict(&[0.0, 0.0]).unwrap(), 3.0);

        // iteration_indptr wins over num_parallel_tree when present
        let text = model_json("0E0", "reg:squarederror", 2, vec![], trees)
            .replace("\"attributes\":{}", "\"attributes\":{\"best_iteration\":\"1\"}")
            .replace("\"iteration_indptr\":[]", "\"iteration_indptr\":[0,1,3,4]");
        let booster = Booster::from_json_str(&text).unwrap();
        assert_eq!(booster.num_trees(), 3);
        assert_eq!(booster.predict(&[0.0, 0.0]).unwrap(), 103.0);
    }

    #[test]
    fn test_bracketed_base_score() {
        let text = model_json("[1.05E2]", "reg:squarederror", 2, vec![], vec![stump(0, 1.0, 0.0, 0.0)]);
        let booster = Booster::from_json_str(&text).unwrap();
        assert_eq!(booster.base_score(), 105.0);
        assert_eq!(booster.predict(&[0.0, 0.0]).unwrap(), 105.0);
    }

    #[test]
    fn test_logistic_objective() {
        let text = model_json("5E-1", "reg:logistic", 2, vec![], vec![stump(0, 1.0, 0.0, 2.0)]);
        let booster = Booster::from_json_str(&text).unwrap();
        // logit(0.5) = 0
        assert!((booster.predict(&[0.0, 0.0]).unwrap() - 0.5).abs() < 1e-6);
        let expected = 1.0 / (1.0 + (-2.0f32).exp());
        assert!((booster.predict(&[3.0, 0.0]).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_poisson_objective() {
        let text = model_json("2E0", "count:poisson", 2, vec![], vec![stump(0, 1.0, 0.0, 1.0)]);
        let booster = Booster::from_json_str(&text).unwrap();
        assert!((booster.predict(&[0.0, 0.0]).unwrap() - 2.0).abs() < 1e-5);
        assert!((booster.predict(&[5.0, 0.0]).unwrap() - 2.0 * 1.0f32.exp()).abs() < 1e-4);
    }

    #[test]
    fn test_dart_applies_weight_drop() {
        let text = json!({
            "learner": {
                "feature_names": [],
                "gradient_booster": {
                    "name": "dart",
                    "gbtree": {
                        "name": "gbtree",
                        "model": {
                            "tree_info": [0, 0],
                            "trees": [stump(0, 1.0, 2.0, 2.0), stump(0, 1.0, 4.0, 4.0)]
                        }
                    },
                    "weight_drop": [0.5, 0.25]
                },
                "learner_model_param": {"base_score": "0E0", "num_class": "0", "num_feature": "1"},
                "objective": {"name": "reg:squarederror"}
            },
            "version": [1, 7, 6]
        })
        .to_string();
        let booster = Booster::from_json_str(&text).unwrap();
        assert_eq!(booster.kind(), BoosterKind::Dart);
        assert_eq!(booster.predict(&[0.0]).unwrap(), 0.5 * 2.0 + 0.25 * 4.0);
    }

    #[test]
    fn test_wrong_feature_count_is_prediction_error() {
        let text = model_json("5E-1", "reg:squarederror", 2, vec![], vec![stump(0, 1.0, 0.0, 0.0)]);
        let booster = Booster::from_json_str(&text).unwrap();
        let err = booster.predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ForecastError::Prediction(_)));
    }

    #[test]
    fn test_rejects_unsupported_models() {
        let text = model_json("5E-1", "multi:softprob", 2, vec![], vec![]);
        assert!(Booster::from_json_str(&text).unwrap_err().contains("objective"));

        let text = model_json("5E-1", "reg:squarederror", 2, vec!["a"], vec![]);
        assert!(Booster::from_json_str(&text).unwrap_err().contains("feature names"));

        let text = model_json("1.5E0", "reg:logistic", 2, vec![], vec![]);
        assert!(Booster::from_json_str(&text).unwrap_err().contains("base_score"));

        let text = json!({
            "learner": {
                "gradient_booster": {"name": "gblinear", "model": {"weights": [0.1, 0.2]}},
                "learner_model_param": {"base_score": "5E-1", "num_feature": "1"},
                "objective": {"name": "reg:squarederror"}
            }
        })
        .to_string();
        assert!(Booster::from_json_str(&text).unwrap_err().contains("gblinear"));

        assert!(Booster::from_json_str("{not json").unwrap_err().contains("invalid model JSON"));
    }

    #[test]
    fn test_rejects_multiclass() {
        let text = model_json("5E-1", "reg:squarederror", 2, vec![], vec![])
            .replace("\"num_class\":\"0\"", "\"num_class\":\"3\"");
        assert!(Booster::from_json_str(&text).unwrap_err().contains("multi-class"));
    }

    #[test]
    fn test_tree_error_names_tree() {
        let text = model_json(
            "5E-1",
            "reg:squarederror",
            2,
            vec![],
            vec![stump(0, 1.0, 0.0, 0.0), stump(9, 1.0, 0.0, 0.0)],
        );
        let err = Booster::from_json_str(&text).unwrap_err();
        assert!(err.starts_with("tree 1:"), "{}", err);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Booster::load("/nonexistent/modelo.json").unwrap_err();
        match err {
            ForecastError::ModelLoad { path, .. } => assert_eq!(path, "/nonexistent/modelo.json"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
