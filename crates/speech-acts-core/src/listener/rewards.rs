//! Expected-reward marginalization: `E[reward(a)] = Σ_w P(w) · (a · w)`.

use crate::error::ModelError;
use crate::model::{ActionContext, BeliefState, RewardVector, WorldTable};
use serde::{Deserialize, Serialize};

/// How `estimate_rewards` treats action features the reward source does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Fail when an action feature is missing from the source or nothing overlaps.
    #[default]
    Strict,
    /// Use the shared features only; the rest contribute zero reward.
    Lenient,
}

/// Anything rewards can be marginalized over.
#[derive(Debug, Clone, Copy)]
pub enum RewardSource<'a> {
    /// A single row with probability one.
    Vector(&'a RewardVector),
    Beliefs(&'a BeliefState),
}

impl RewardSource<'_> {
    fn contains(&self, feature: &str) -> bool {
        match self {
            RewardSource::Vector(weights) => weights.contains(feature),
            RewardSource::Beliefs(beliefs) => beliefs.schema().contains(feature),
        }
    }

    /// `(probability, weights)` per row, weights ordered like `features`.
    fn weighted_rows(&self, features: &[&str]) -> Vec<(f64, Vec<f64>)> {
        match self {
            RewardSource::Vector(weights) => vec![(
                1.0,
                features
                    .iter()
                    .map(|feature| weights.get(feature).unwrap_or(0.0))
                    .collect(),
            )],
            RewardSource::Beliefs(beliefs) => {
                let schema = beliefs.schema();
                let columns: Vec<Option<usize>> =
                    features.iter().map(|feature| schema.index_of(feature)).collect();
                beliefs
                    .rows()
                    .iter()
                    .map(|row| {
                        let weights = columns
                            .iter()
                            .map(|column| {
                                column
                                    .and_then(|index| row.world.value(index))
                                    .map_or(0.0, |value| value as f64)
                            })
                            .collect();
                        (row.probability, weights)
                    })
                    .collect()
            }
        }
    }
}

impl<'a> From<&'a RewardVector> for RewardSource<'a> {
    fn from(weights: &'a RewardVector) -> Self {
        RewardSource::Vector(weights)
    }
}

impl<'a> From<&'a BeliefState> for RewardSource<'a> {
    fn from(beliefs: &'a BeliefState) -> Self {
        RewardSource::Beliefs(beliefs)
    }
}

/// Expected reward of every action in `context`, in context order.
///
/// The shared feature columns are sorted before the dot products so the summation order
/// does not depend on how the context happened to list its columns.
pub fn estimate_rewards<'a>(
    source: impl Into<RewardSource<'a>>,
    context: &ActionContext,
    mode: SchemaMode,
) -> Result<Vec<f64>, ModelError> {
    let source = source.into();

    let mut shared: Vec<&str> = context
        .features()
        .iter()
        .map(String::as_str)
        .filter(|feature| source.contains(feature))
        .collect();
    shared.sort_unstable();

    if mode == SchemaMode::Strict {
        let missing: Vec<String> = context
            .features()
            .iter()
            .filter(|feature| !source.contains(feature))
            .cloned()
            .collect();
        if !missing.is_empty() || shared.is_empty() {
            return Err(ModelError::FeatureColumnMismatch { missing });
        }
    }

    let columns: Vec<usize> = shared
        .iter()
        .filter_map(|feature| context.feature_index(feature))
        .collect();

    let mut rewards = vec![0.0; context.len()];
    for (probability, weights) in source.weighted_rows(&shared) {
        for (action, reward) in context.actions().iter().zip(rewards.iter_mut()) {
            let indicators = action.indicators();
            let dot: f64 = columns
                .iter()
                .zip(&weights)
                .map(|(&column, weight)| indicators[column] * weight)
                .sum();
            *reward += probability * dot;
        }
    }

    Ok(rewards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ActionContext {
        ActionContext::from_actions([
            ["green", "circle"],
            ["blue", "circle"],
            ["green", "square"],
        ])
        .expect("valid context")
    }

    fn rewards() -> RewardVector {
        RewardVector::new([
            ("blue", -1.0),
            ("green", 1.0),
            ("circle", 1.0),
            ("square", -1.0),
        ])
    }

    #[test]
    fn reward_vector_matches_manual_dot_product() {
        let estimated =
            estimate_rewards(&rewards(), &context(), SchemaMode::Strict).expect("estimate");
        assert_eq!(estimated, vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn strict_mode_rejects_uncovered_features() {
        let partial = RewardVector::new([("green", 1.0), ("circle", 1.0)]);
        let err = estimate_rewards(&partial, &context(), SchemaMode::Strict)
            .expect_err("blue and square are not covered");
        assert_eq!(
            err,
            ModelError::FeatureColumnMismatch {
                missing: vec!["blue".into(), "square".into()]
            }
        );
    }

    #[test]
    fn lenient_mode_scores_missing_features_as_zero() {
        let partial = RewardVector::new([("green", 1.0), ("circle", 1.0)]);
        let estimated =
            estimate_rewards(&partial, &context(), SchemaMode::Lenient).expect("estimate");
        assert_eq!(estimated, vec![2.0, 1.0, 1.0]);

        let unrelated = RewardVector::new([("red", 5.0)]);
        let estimated =
            estimate_rewards(&unrelated, &context(), SchemaMode::Lenient).expect("estimate");
        assert_eq!(estimated, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn strict_mode_rejects_disjoint_sources() {
        let unrelated = RewardVector::new([("red", 5.0)]);
        assert!(estimate_rewards(&unrelated, &context(), SchemaMode::Strict).is_err());
    }
}
