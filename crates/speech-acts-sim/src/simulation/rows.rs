use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use speech_acts_core::listener::softmax_with_temperature;
use speech_acts_core::model::FeatureValue;
use speech_acts_core::{ActionContext, ModelError, RewardVector, Speaker, Utterance};
use thiserror::Error;
use tracing::{Level, event};

use crate::config::RESERVED_COLUMNS;

/// Suffix of the column holding a speaker's utterance probability.
pub const PROBABILITY_SUFFIX: &str = "_prob";

/// One utterance scored in one action context.
///
/// Each speaker contributes two columns: `<name>` with its utility and
/// `<name>_prob` with its softmax probability over the utterance list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtteranceRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_context: Option<String>,
    pub utterance: String,
    pub feature: String,
    pub value: FeatureValue,
    pub truthful: bool,
    pub expected_rewards: f64,
    pub prob_optimal_action: f64,
    #[serde(flatten)]
    pub columns: BTreeMap<String, f64>,
}

impl UtteranceRow {
    pub fn utility(&self, speaker: &str) -> Option<f64> {
        self.columns.get(speaker).copied()
    }

    pub fn probability(&self, speaker: &str) -> Option<f64> {
        self.columns
            .get(&probability_column(speaker))
            .copied()
    }
}

pub fn probability_column(speaker: &str) -> String {
    format!("{speaker}{PROBABILITY_SUFFIX}")
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("at least one speaker is required")]
    NoSpeakers,
    #[error("speaker column '{column}' is produced more than once")]
    DuplicateColumn { column: String },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Every speaker's `<name>` and `<name>_prob` must be distinct from each other
/// and from the fixed row fields.
fn check_columns(speakers: &[Speaker<'_>]) -> Result<(), SimulationError> {
    let mut taken: HashSet<String> = RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for speaker in speakers {
        for column in [speaker.name().to_string(), probability_column(speaker.name())] {
            if !taken.insert(column.clone()) {
                return Err(SimulationError::DuplicateColumn { column });
            }
        }
    }
    Ok(())
}

/// Score every utterance for every speaker in a single action context.
///
/// `expected_rewards` and `prob_optimal_action` come from the first speaker;
/// all speakers share one listener, so they agree on both.
pub fn single_context(
    action_context: &ActionContext,
    speakers: &[Speaker<'_>],
    utterances: &[Utterance],
    w: &RewardVector,
) -> Result<Vec<UtteranceRow>, SimulationError> {
    let reference = speakers.first().ok_or(SimulationError::NoSpeakers)?;
    check_columns(speakers)?;

    let mut utilities = vec![Vec::with_capacity(utterances.len()); speakers.len()];
    let mut rows = Vec::with_capacity(utterances.len());
    for utterance in utterances {
        for (speaker, scores) in speakers.iter().zip(utilities.iter_mut()) {
            scores.push(speaker.utility(utterance, action_context)?);
        }
        rows.push(UtteranceRow {
            action_context: None,
            utterance: utterance.to_string(),
            feature: utterance.feature.clone(),
            value: utterance.value,
            truthful: w.get(&utterance.feature) == Some(utterance.value as f64),
            expected_rewards: reference.expected_rewards(utterance, action_context)?,
            prob_optimal_action: reference.probability_optimal_action(utterance, action_context)?,
            columns: BTreeMap::new(),
        });
    }

    for (speaker, scores) in speakers.iter().zip(&utilities) {
        let probabilities = softmax_with_temperature(scores, speaker.beta());
        let column = probability_column(speaker.name());
        for ((row, &utility), probability) in rows.iter_mut().zip(scores).zip(probabilities) {
            row.columns.insert(speaker.name().to_string(), utility);
            row.columns.insert(column.clone(), probability);
        }
    }

    if tracing::enabled!(target: "speech_acts_sim::run", Level::DEBUG) {
        event!(
            target: "speech_acts_sim::run",
            Level::DEBUG,
            action_context = %action_context.label(),
            utterances = rows.len(),
            speakers = speakers.len(),
        );
    }

    Ok(rows)
}

/// [`single_context`] over each context, rows labelled with the context's action names.
pub fn multiple_contexts(
    action_contexts: &[ActionContext],
    speakers: &[Speaker<'_>],
    utterances: &[Utterance],
    w: &RewardVector,
) -> Result<Vec<UtteranceRow>, SimulationError> {
    let mut rows = Vec::with_capacity(action_contexts.len() * utterances.len());
    for action_context in action_contexts {
        let label = action_context.label();
        rows.extend(
            single_context(action_context, speakers, utterances, w)?
                .into_iter()
                .map(|row| UtteranceRow {
                    action_context: Some(label.clone()),
                    ..row
                }),
        );
    }
    Ok(rows)
}
