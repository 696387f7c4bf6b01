//! Enumeration helpers that build world spaces, actions and utterances from feature lists.

use crate::error::ModelError;
use crate::model::{FeatureSchema, FeatureValue, Utterance, World, WorldSpace};

/// Cartesian product of feature groups, e.g. colors × shapes, in group order.
pub fn actions_from_features<G, S>(groups: &[G]) -> Vec<Vec<String>>
where
    G: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut actions: Vec<Vec<String>> = vec![Vec::new()];
    for group in groups {
        actions = actions
            .iter()
            .flat_map(|prefix| {
                group.as_ref().iter().map(move |feature| {
                    let mut action = prefix.clone();
                    action.push(feature.as_ref().to_string());
                    action
                })
            })
            .collect();
    }
    actions
}

/// Every complete assignment of `values` to `features`.
///
/// The first listed feature varies slowest. Worlds are stored against the sorted schema.
pub fn worlds_from_feature_values<S>(
    features: &[S],
    values: &[FeatureValue],
) -> Result<WorldSpace, ModelError>
where
    S: AsRef<str>,
{
    let schema = FeatureSchema::new(features.iter().map(|feature| feature.as_ref()));
    let mut columns = Vec::with_capacity(features.len());
    for feature in features {
        let column = schema
            .index_of(feature.as_ref())
            .ok_or_else(|| ModelError::UnknownFeature {
                feature: feature.as_ref().to_string(),
            })?;
        if columns.contains(&column) {
            return Err(ModelError::DuplicateFeature {
                feature: feature.as_ref().to_string(),
            });
        }
        columns.push(column);
    }

    let mut assignments: Vec<Vec<FeatureValue>> = Vec::new();
    for (position, _) in features.iter().enumerate() {
        assignments = if position == 0 {
            values.iter().map(|&value| vec![value]).collect()
        } else {
            assignments
                .iter()
                .flat_map(|prefix| {
                    values.iter().map(move |&value| {
                        let mut next = prefix.clone();
                        next.push(value);
                        next
                    })
                })
                .collect()
        };
    }

    let worlds = assignments
        .into_iter()
        .map(|assignment| {
            let mut ordered = vec![0; schema.len()];
            for (&column, value) in columns.iter().zip(assignment) {
                ordered[column] = value;
            }
            World::new(ordered)
        })
        .collect();

    WorldSpace::new(schema, worlds)
}

/// Every `(feature, value)` message, feature-major.
pub fn utterances_from_feature_values<S>(features: &[S], values: &[FeatureValue]) -> Vec<Utterance>
where
    S: AsRef<str>,
{
    features
        .iter()
        .flat_map(|feature| {
            values
                .iter()
                .map(move |&value| Utterance::new(feature.as_ref(), value))
        })
        .collect()
}

/// Every `size`-element subset of `actions`, in lexicographic index order.
///
/// Returns nothing when `size` is zero or exceeds the number of actions.
pub fn action_context_combinations<T: Clone>(actions: &[T], size: usize) -> Vec<Vec<T>> {
    let n = actions.len();
    if size == 0 || size > n {
        return Vec::new();
    }

    let mut combinations = Vec::new();
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        combinations.push(indices.iter().map(|&index| actions[index].clone()).collect());

        let Some(pivot) = (0..size).rev().find(|&i| indices[i] != i + n - size) else {
            break;
        };
        indices[pivot] += 1;
        for i in pivot + 1..size {
            indices[i] = indices[i - 1] + 1;
        }
    }
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionContext, WorldTable};

    const COLORS: [&str; 2] = ["blue", "green"];
    const SHAPES: [&str; 2] = ["circle", "square"];

    #[test]
    fn actions_follow_product_order() {
        let actions = actions_from_features(&[COLORS, SHAPES]);
        assert_eq!(
            actions,
            vec![
                vec!["blue", "circle"],
                vec!["blue", "square"],
                vec!["green", "circle"],
                vec!["green", "square"],
            ]
        );
    }

    #[test]
    fn generated_actions_build_a_context() {
        let actions = actions_from_features(&[COLORS, SHAPES]);
        let context = ActionContext::from_actions(&actions).expect("context");
        assert_eq!(context.len(), 4);
        assert_eq!(context.actions()[3].name(), "green square");
    }

    #[test]
    fn world_count_is_values_to_the_features() {
        let features = [COLORS, SHAPES].concat();
        let worlds = worlds_from_feature_values(&features, &[-1, 1]).expect("worlds");
        assert_eq!(worlds.len(), 2usize.pow(4));

        let ternary = worlds_from_feature_values(&COLORS, &[-1, 0, 1]).expect("worlds");
        assert_eq!(ternary.len(), 9);
    }

    #[test]
    fn first_feature_varies_slowest() {
        let worlds = worlds_from_feature_values(&["green", "blue"], &[-1, 1]).expect("worlds");
        // schema order is blue, green
        assert_eq!(worlds.schema().names(), &["blue", "green"]);
        let rows: Vec<&[FeatureValue]> = worlds.worlds().map(World::values).collect();
        assert_eq!(rows, vec![&[-1, -1][..], &[1, -1], &[-1, 1], &[1, 1]]);
    }

    #[test]
    fn duplicate_features_are_rejected() {
        let err = worlds_from_feature_values(&["blue", "blue"], &[-1, 1]).expect_err("dup");
        assert_eq!(
            err,
            ModelError::DuplicateFeature {
                feature: "blue".into()
            }
        );
    }

    #[test]
    fn no_features_means_no_worlds() {
        let empty: [&str; 0] = [];
        let worlds = worlds_from_feature_values(&empty, &[-1, 1]).expect("empty is valid");
        assert!(worlds.is_empty());
    }

    #[test]
    fn utterances_cover_every_pair() {
        let utterances = utterances_from_feature_values(&COLORS, &[-1, 1]);
        assert_eq!(
            utterances,
            vec![
                Utterance::new("blue", -1),
                Utterance::new("blue", 1),
                Utterance::new("green", -1),
                Utterance::new("green", 1),
            ]
        );
    }

    #[test]
    fn combinations_enumerate_subsets() {
        let combos = action_context_combinations(&["a", "b", "c", "d"], 2);
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], vec!["a", "b"]);
        assert_eq!(combos[5], vec!["c", "d"]);

        assert_eq!(action_context_combinations(&["a", "b"], 2), vec![vec!["a", "b"]]);
        assert!(action_context_combinations(&["a", "b"], 3).is_empty());
        assert!(action_context_combinations(&["a"], 0).is_empty());
    }
}
