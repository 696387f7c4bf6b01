use rand::seq::index;
use rand::{SeedableRng, rngs::StdRng};
use speech_acts_core::ActionContext;
use speech_acts_core::ModelError;
use speech_acts_core::generate::{action_context_combinations, actions_from_features};

use crate::config::ContextsConfig;

/// Action contexts a run iterates over, in evaluation order.
pub struct ContextPlan {
    contexts: Vec<ActionContext>,
}

impl ContextPlan {
    pub fn from_config(config: &ContextsConfig) -> Result<Self, ModelError> {
        let tuples = match config {
            ContextsConfig::Combinations { groups, size } => {
                action_context_combinations(&actions_from_features(groups), *size)
            }
            ContextsConfig::Sampled {
                groups,
                size,
                count,
                seed,
            } => {
                let all = action_context_combinations(&actions_from_features(groups), *size);
                sample(all, *count, seed.unwrap_or(0))
            }
            ContextsConfig::Explicit { contexts } => contexts.clone(),
        };

        let contexts = tuples
            .iter()
            .map(ActionContext::from_actions)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { contexts })
    }

    pub fn as_slice(&self) -> &[ActionContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Distinct draws without replacement, kept in enumeration order.
fn sample<T>(candidates: Vec<T>, count: usize, seed: u64) -> Vec<T> {
    let amount = count.min(candidates.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, candidates.len(), amount).into_vec();
    picked.sort_unstable();

    let mut picked = picked.into_iter().peekable();
    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(position, candidate)| {
            if picked.peek() == Some(&position) {
                picked.next();
                Some(candidate)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Vec<String>> {
        vec![
            vec!["blue".into(), "green".into(), "red".into()],
            vec!["circle".into(), "square".into()],
        ]
    }

    #[test]
    fn combinations_cover_every_subset() {
        let plan = ContextPlan::from_config(&ContextsConfig::Combinations {
            groups: groups(),
            size: 3,
        })
        .expect("plan");
        // six actions choose three
        assert_eq!(plan.len(), 20);
        assert_eq!(
            plan.as_slice()[0].label(),
            "[blue circle, blue square, green circle]"
        );
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let config = ContextsConfig::Sampled {
            groups: groups(),
            size: 3,
            count: 5,
            seed: Some(11),
        };
        let first = ContextPlan::from_config(&config).expect("plan");
        let second = ContextPlan::from_config(&config).expect("plan");
        assert_eq!(first.len(), 5);
        let labels =
            |plan: &ContextPlan| plan.as_slice().iter().map(ActionContext::label).collect::<Vec<_>>();
        assert_eq!(labels(&first), labels(&second));

        let distinct: std::collections::HashSet<String> = labels(&first).into_iter().collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn sampling_caps_at_available_contexts() {
        let plan = ContextPlan::from_config(&ContextsConfig::Sampled {
            groups: groups(),
            size: 6,
            count: 10,
            seed: None,
        })
        .expect("plan");
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn explicit_contexts_are_used_verbatim() {
        let plan = ContextPlan::from_config(&ContextsConfig::Explicit {
            contexts: vec![vec![
                vec!["green".into(), "circle".into()],
                vec!["blue".into()],
            ]],
        })
        .expect("plan");
        assert_eq!(plan.len(), 1);
        let context = &plan.as_slice()[0];
        assert_eq!(context.features(), &["green", "circle", "blue"]);
        assert_eq!(context.indicator(&context.actions()[1], "circle"), 0.0);
    }
}
