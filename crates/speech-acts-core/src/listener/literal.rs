//! The literal listener: interprets utterances at face value.

use super::cache::{BeliefCache, CacheStats};
use super::policy::ListenerPolicy;
use super::rewards::{RewardSource, SchemaMode, estimate_rewards};
use super::softmax::softmax_with_temperature;
use crate::error::ModelError;
use crate::model::{
    ActionContext, BeliefState, FeatureSchema, Utterance, World, WorldSpace, WorldTable,
};
use std::sync::Arc;
use tracing::{Level, event};

/// Keeps the worlds where `message.feature == message.value` and spreads mass uniformly.
///
/// Works on any world table, so belief states can be conditioned again.
pub fn condition_worlds_on_message<T>(
    worlds: &T,
    message: &Utterance,
) -> Result<BeliefState, ModelError>
where
    T: WorldTable + ?Sized,
{
    let schema = worlds.schema();
    let column = schema
        .index_of(&message.feature)
        .ok_or_else(|| ModelError::UnknownFeature {
            feature: message.feature.clone(),
        })?;

    let consistent: Vec<World> = worlds
        .worlds()
        .filter(|world| world.value(column) == Some(message.value))
        .cloned()
        .collect();

    if consistent.is_empty() {
        return Err(ModelError::NoCompatibleWorlds {
            message: message.clone(),
        });
    }

    Ok(BeliefState::uniform(schema.clone(), consistent))
}

/// Bayesian listener with a uniform prior and a truth-functional likelihood.
#[derive(Debug)]
pub struct LiteralListener {
    beta: f64,
    features: FeatureSchema,
    possible_worlds: WorldSpace,
    schema_mode: SchemaMode,
    cache: BeliefCache,
}

impl LiteralListener {
    /// `features` are sorted canonically and must match the world space columns.
    pub fn new<I, S>(beta: f64, features: I, possible_worlds: WorldSpace) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !beta.is_finite() || beta <= 0.0 {
            return Err(ModelError::InvalidTemperature { beta });
        }

        let features = FeatureSchema::new(features);
        if &features != possible_worlds.schema() {
            return Err(ModelError::WorldSchemaMismatch {
                expected: features.names().to_vec(),
                found: possible_worlds.schema().names().to_vec(),
            });
        }

        Ok(Self {
            beta,
            features,
            possible_worlds,
            schema_mode: SchemaMode::default(),
            cache: BeliefCache::new(),
        })
    }

    pub fn with_schema_mode(mut self, schema_mode: SchemaMode) -> Self {
        self.schema_mode = schema_mode;
        self
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn features(&self) -> &FeatureSchema {
        &self.features
    }

    pub fn possible_worlds(&self) -> &WorldSpace {
        &self.possible_worlds
    }

    pub fn schema_mode(&self) -> SchemaMode {
        self.schema_mode
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Beliefs after hearing `utterance`, memoized per utterance.
    pub fn beliefs(&self, utterance: &Utterance) -> Result<Arc<BeliefState>, ModelError> {
        self.cache.get_or_try_insert_with(utterance, || {
            let beliefs = condition_worlds_on_message(&self.possible_worlds, utterance)?;
            if tracing::enabled!(target: "speech_acts_core::listener", Level::DEBUG) {
                event!(
                    target: "speech_acts_core::listener",
                    Level::DEBUG,
                    utterance = %utterance,
                    consistent_worlds = beliefs.len(),
                    total_worlds = self.possible_worlds.len(),
                    "conditioned beliefs"
                );
            }
            Ok(beliefs)
        })
    }

    /// Expected reward per action under either beliefs or a reward vector.
    pub fn estimate_rewards<'a>(
        &self,
        source: impl Into<RewardSource<'a>>,
        action_context: &ActionContext,
    ) -> Result<Vec<f64>, ModelError> {
        estimate_rewards(source, action_context, self.schema_mode)
    }

    /// Reward estimates under the beliefs for `utterance`, then `softmax(beta * reward)`.
    pub fn action_policy<'c>(
        &self,
        utterance: &Utterance,
        action_context: &'c ActionContext,
    ) -> Result<ListenerPolicy<'c>, ModelError> {
        let beliefs = self.beliefs(utterance)?;
        let listener_reward = self.estimate_rewards(&*beliefs, action_context)?;
        let listener_choice_prob = softmax_with_temperature(&listener_reward, self.beta);
        Ok(ListenerPolicy::new(
            action_context,
            listener_reward,
            listener_choice_prob,
        ))
    }
}
