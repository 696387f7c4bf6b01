use super::FeatureValue;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A literal assertion that `feature` takes `value`.
///
/// Structural equality and hashing make it usable directly as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Utterance {
    pub feature: String,
    pub value: FeatureValue,
}

impl Utterance {
    pub fn new(feature: impl Into<String>, value: FeatureValue) -> Self {
        Self {
            feature: feature.into(),
            value,
        }
    }
}

impl<S: Into<String>> From<(S, FeatureValue)> for Utterance {
    fn from((feature, value): (S, FeatureValue)) -> Self {
        Self::new(feature, value)
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.feature, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::Utterance;
    use std::collections::HashSet;

    #[test]
    fn distinct_features_never_collide() {
        let mut keys = HashSet::new();
        assert!(keys.insert(Utterance::new("green", 1)));
        assert!(keys.insert(Utterance::new("green", -1)));
        assert!(keys.insert(Utterance::new("blue", 1)));
        assert!(!keys.insert(Utterance::from(("green", 1))));
    }

    #[test]
    fn displays_as_pair() {
        assert_eq!(Utterance::new("blue", -1).to_string(), "(blue, -1)");
    }
}
