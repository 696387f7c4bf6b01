use core::fmt;

/// Sorted, de-duplicated feature names.
///
/// Worlds and belief states store their values positionally against a schema, so two
/// tables built from the same feature list always agree on column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = features.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, feature: &str) -> Option<usize> {
        self.names
            .binary_search_by(|name| name.as_str().cmp(feature))
            .ok()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.index_of(feature).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.names.join(", "))
    }
}
