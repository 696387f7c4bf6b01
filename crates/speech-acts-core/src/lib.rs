//! Rational Speech Acts engine: a literal listener and three speakers reasoning about it.

pub mod error;
pub mod generate;
pub mod listener;
pub mod model;
pub mod speaker;

pub use error::ModelError;
pub use listener::{LiteralListener, ListenerPolicy, SchemaMode};
pub use model::{ActionContext, BeliefState, RewardVector, Utterance, WorldSpace};
pub use speaker::{BaseSpeaker, Speaker, SpeakerKind};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "speech-acts"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "speech-acts");
        assert!(!AppInfo::version().is_empty());
    }
}
