use crate::model::Utterance;
use std::fmt;

/// Failures raised by the listener and speaker computations.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Conditioning removed every world.
    NoCompatibleWorlds { message: Utterance },
    /// A feature name is not part of the schema it was looked up in.
    UnknownFeature { feature: String },
    /// Softmax temperature must be finite and strictly positive.
    InvalidTemperature { beta: f64 },
    /// Listener features and world space columns disagree.
    WorldSchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// Action context columns that the reward source does not cover (strict mode only).
    FeatureColumnMismatch { missing: Vec<String> },
    DuplicateAction { name: String },
    DuplicateFeature { feature: String },
    EmptyActionContext,
    /// A world row does not carry one value per schema feature.
    MalformedWorld {
        index: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NoCompatibleWorlds { message } => {
                write!(f, "no worlds are compatible with message {message}")
            }
            ModelError::UnknownFeature { feature } => write!(f, "unknown feature '{feature}'"),
            ModelError::InvalidTemperature { beta } => {
                write!(f, "temperature must be finite and positive, got {beta}")
            }
            ModelError::WorldSchemaMismatch { expected, found } => write!(
                f,
                "world space features [{}] do not match listener features [{}]",
                found.join(", "),
                expected.join(", ")
            ),
            ModelError::FeatureColumnMismatch { missing } if missing.is_empty() => {
                write!(f, "reward source shares no features with the action context")
            }
            ModelError::FeatureColumnMismatch { missing } => write!(
                f,
                "reward source does not cover action features [{}]",
                missing.join(", ")
            ),
            ModelError::DuplicateAction { name } => {
                write!(f, "action '{name}' appears more than once in the context")
            }
            ModelError::DuplicateFeature { feature } => {
                write!(f, "feature '{feature}' listed more than once")
            }
            ModelError::EmptyActionContext => write!(f, "action context has no actions"),
            ModelError::MalformedWorld {
                index,
                expected,
                found,
            } => write!(
                f,
                "world {index} has {found} values but the schema has {expected} features"
            ),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_incompatible_message() {
        let err = ModelError::NoCompatibleWorlds {
            message: Utterance::new("green", 3),
        };
        assert_eq!(
            err.to_string(),
            "no worlds are compatible with message (green, 3)"
        );
    }

    #[test]
    fn empty_column_mismatch_has_dedicated_wording() {
        let err = ModelError::FeatureColumnMismatch { missing: vec![] };
        assert!(err.to_string().contains("shares no features"));
    }
}
