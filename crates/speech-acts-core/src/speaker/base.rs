use crate::error::ModelError;
use crate::listener::LiteralListener;
use crate::model::{ActionContext, BeliefState, RewardVector, Utterance, WorldTable};

/// Machinery shared by every speaker: a listener to reason about and the true rewards.
#[derive(Debug, Clone)]
pub struct BaseSpeaker<'a> {
    listener: &'a LiteralListener,
    beta: f64,
    w: &'a RewardVector,
    name: String,
}

impl<'a> BaseSpeaker<'a> {
    pub fn new(
        listener: &'a LiteralListener,
        beta: f64,
        w: &'a RewardVector,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        if !beta.is_finite() || beta <= 0.0 {
            return Err(ModelError::InvalidTemperature { beta });
        }
        Ok(Self {
            listener,
            beta,
            w,
            name: name.into(),
        })
    }

    pub fn listener(&self) -> &'a LiteralListener {
        self.listener
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn rewards(&self) -> &'a RewardVector {
        self.w
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True reward of each action, scored with the listener's estimator.
    pub fn speaker_action_rewards(
        &self,
        action_context: &ActionContext,
    ) -> Result<Vec<f64>, ModelError> {
        self.listener.estimate_rewards(self.w, action_context)
    }

    /// Probability the listener picks an action with the highest true reward.
    ///
    /// Actions tied at the maximum all count; ties are compared exactly.
    pub fn probability_optimal_action(
        &self,
        utterance: &Utterance,
        action_context: &ActionContext,
    ) -> Result<f64, ModelError> {
        let policy = self.listener.action_policy(utterance, action_context)?;
        let true_rewards = self.speaker_action_rewards(action_context)?;
        let highest_available_reward = true_rewards
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(true_rewards
            .iter()
            .zip(policy.listener_choice_prob())
            .filter(|(reward, _)| **reward == highest_available_reward)
            .map(|(_, prob)| prob)
            .sum())
    }

    /// True reward the listener collects on average after hearing `utterance`.
    pub fn expected_rewards(
        &self,
        utterance: &Utterance,
        action_context: &ActionContext,
    ) -> Result<f64, ModelError> {
        let policy = self.listener.action_policy(utterance, action_context)?;
        let true_rewards = self.speaker_action_rewards(action_context)?;

        Ok(policy
            .listener_choice_prob()
            .iter()
            .zip(&true_rewards)
            .map(|(prob, reward)| prob * reward)
            .sum())
    }

    /// Probability `beliefs` assign to the world described by the true rewards, if any.
    ///
    /// A world matches when its value equals `w` on every feature `w` names.
    pub(crate) fn true_world_probability(
        &self,
        beliefs: &BeliefState,
    ) -> Result<Option<f64>, ModelError> {
        let schema = beliefs.schema();
        let columns = self
            .w
            .iter()
            .map(|(feature, weight)| {
                schema
                    .index_of(feature)
                    .map(|index| (index, weight))
                    .ok_or_else(|| ModelError::UnknownFeature {
                        feature: feature.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(beliefs
            .rows()
            .iter()
            .find(|row| {
                columns.iter().all(|&(index, weight)| {
                    row.world
                        .value(index)
                        .is_some_and(|value| value as f64 == weight)
                })
            })
            .map(|row| row.probability))
    }
}
