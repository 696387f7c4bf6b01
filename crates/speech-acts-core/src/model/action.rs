use crate::error::ModelError;
use serde::Serialize;
use std::collections::HashSet;

/// Joins an action's feature labels into its name.
pub const ACTION_NAME_SEPARATOR: &str = " ";

/// A candidate action: a name plus a 0/1 indicator per context feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    name: String,
    indicators: Vec<f64>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indicators aligned with [`ActionContext::features`].
    pub fn indicators(&self) -> &[f64] {
        &self.indicators
    }
}

/// The actions available to the listener in one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionContext {
    features: Vec<String>,
    actions: Vec<Action>,
}

impl ActionContext {
    /// Builds a context from feature tuples such as `[["green", "circle"], ["blue", "circle"]]`.
    ///
    /// Columns appear in order of first use; a feature an action lacks is recorded as `0`.
    pub fn from_actions<A, F>(actions: impl IntoIterator<Item = A>) -> Result<Self, ModelError>
    where
        A: IntoIterator<Item = F>,
        F: AsRef<str>,
    {
        let tuples: Vec<Vec<String>> = actions
            .into_iter()
            .map(|tuple| {
                tuple
                    .into_iter()
                    .map(|feature| feature.as_ref().to_string())
                    .collect()
            })
            .collect();
        if tuples.is_empty() {
            return Err(ModelError::EmptyActionContext);
        }

        let mut features: Vec<String> = Vec::new();
        for feature in tuples.iter().flatten() {
            if !features.contains(feature) {
                features.push(feature.clone());
            }
        }

        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(tuples.len());
        for tuple in &tuples {
            let name = tuple.join(ACTION_NAME_SEPARATOR);
            if !seen.insert(name.clone()) {
                return Err(ModelError::DuplicateAction { name });
            }
            let indicators = features
                .iter()
                .map(|feature| if tuple.contains(feature) { 1.0 } else { 0.0 })
                .collect();
            built.push(Action { name, indicators });
        }

        Ok(Self {
            features,
            actions: built,
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.features.iter().position(|name| name == feature)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(Action::name)
    }

    /// Indicator of `feature` for `action`; features outside the context read as `0`.
    pub fn indicator(&self, action: &Action, feature: &str) -> f64 {
        self.feature_index(feature)
            .and_then(|index| action.indicators.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Label used to group simulation rows, e.g. `[green circle, blue circle]`.
    pub fn label(&self) -> String {
        format!("[{}]", self.names().collect::<Vec<_>>().join(", "))
    }
}
