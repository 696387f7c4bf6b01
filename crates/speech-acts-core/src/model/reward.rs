use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ground-truth desirability of each feature, known to the speaker only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardVector {
    weights: BTreeMap<String, f64>,
}

impl RewardVector {
    pub fn new<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        weights.into_iter().collect()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.weights.get(feature).copied()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.weights.contains_key(feature)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Features in canonical (sorted) order.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights
            .iter()
            .map(|(feature, weight)| (feature.as_str(), *weight))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RewardVector {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            weights: iter
                .into_iter()
                .map(|(feature, weight)| (feature.into(), weight))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RewardVector;

    #[test]
    fn deserializes_from_plain_mapping() {
        let rewards: RewardVector =
            serde_json::from_str(r#"{"green": 1, "blue": -1.5}"#).expect("mapping parses");
        assert_eq!(rewards.get("green"), Some(1.0));
        assert_eq!(rewards.get("blue"), Some(-1.5));
        assert_eq!(rewards.features().collect::<Vec<_>>(), vec!["blue", "green"]);
    }
}
