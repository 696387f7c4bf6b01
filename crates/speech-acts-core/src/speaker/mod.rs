//! Speakers choose utterances by simulating the literal listener.
//!
//! Every variant shares [`BaseSpeaker`]; they differ only in how an utterance is scored.

mod base;

pub use base::BaseSpeaker;

use crate::error::ModelError;
use crate::listener::LiteralListener;
use crate::model::{ActionContext, RewardVector, Utterance};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Probability used for the true world when an utterance rules it out, keeping `ln` finite.
pub const FALSE_UTTERANCE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerKind {
    /// `ln P(true world | utterance)`.
    Belief,
    /// `ln P(listener picks an optimal action | utterance)`.
    Action,
    /// Expected true reward of the listener's choice.
    Combined,
}

impl SpeakerKind {
    pub const ALL: [SpeakerKind; 3] = [
        SpeakerKind::Belief,
        SpeakerKind::Action,
        SpeakerKind::Combined,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SpeakerKind::Belief => "Belief",
            SpeakerKind::Action => "Action",
            SpeakerKind::Combined => "Combined",
        }
    }
}

impl fmt::Display for SpeakerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A speaker of one [`SpeakerKind`].
#[derive(Debug, Clone)]
pub struct Speaker<'a> {
    kind: SpeakerKind,
    base: BaseSpeaker<'a>,
}

impl<'a> Speaker<'a> {
    pub fn new(
        kind: SpeakerKind,
        listener: &'a LiteralListener,
        beta: f64,
        w: &'a RewardVector,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            kind,
            base: BaseSpeaker::new(listener, beta, w, name)?,
        })
    }

    pub fn kind(&self) -> SpeakerKind {
        self.kind
    }

    pub fn base(&self) -> &BaseSpeaker<'a> {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn beta(&self) -> f64 {
        self.base.beta()
    }

    pub fn probability_optimal_action(
        &self,
        utterance: &Utterance,
        action_context: &ActionContext,
    ) -> Result<f64, ModelError> {
        self.base
            .probability_optimal_action(utterance, action_context)
    }

    pub fn expected_rewards(
        &self,
        utterance: &Utterance,
        action_context: &ActionContext,
    ) -> Result<f64, ModelError> {
        self.base.expected_rewards(utterance, action_context)
    }

    /// Score of `utterance` in `action_context`; higher is preferred.
    pub fn utility(
        &self,
        utterance: &Utterance,
        action_context: &ActionContext,
    ) -> Result<f64, ModelError> {
        match self.kind {
            SpeakerKind::Belief => {
                let beliefs = self.base.listener().beliefs(utterance)?;
                let probability = self
                    .base
                    .true_world_probability(&beliefs)?
                    .unwrap_or(FALSE_UTTERANCE_FLOOR);
                Ok(probability.ln())
            }
            SpeakerKind::Action => Ok(self
                .base
                .probability_optimal_action(utterance, action_context)?
                .ln()),
            SpeakerKind::Combined => self.base.expected_rewards(utterance, action_context),
        }
    }
}
