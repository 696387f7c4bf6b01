use crate::model::{Action, ActionContext};

/// An action context augmented with the listener's reward estimates and choice probabilities.
///
/// Borrowing the context keeps the input untouched; callers get a fresh value per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerPolicy<'c> {
    context: &'c ActionContext,
    listener_reward: Vec<f64>,
    listener_choice_prob: Vec<f64>,
}

/// One action of a [`ListenerPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyRow<'c> {
    pub action: &'c Action,
    pub listener_reward: f64,
    pub listener_choice_prob: f64,
}

impl<'c> ListenerPolicy<'c> {
    pub(crate) fn new(
        context: &'c ActionContext,
        listener_reward: Vec<f64>,
        listener_choice_prob: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(context.len(), listener_reward.len());
        debug_assert_eq!(context.len(), listener_choice_prob.len());
        Self {
            context,
            listener_reward,
            listener_choice_prob,
        }
    }

    pub fn context(&self) -> &'c ActionContext {
        self.context
    }

    pub fn listener_reward(&self) -> &[f64] {
        &self.listener_reward
    }

    pub fn listener_choice_prob(&self) -> &[f64] {
        &self.listener_choice_prob
    }

    pub fn len(&self) -> usize {
        self.listener_reward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listener_reward.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = PolicyRow<'c>> + '_ {
        self.context
            .actions()
            .iter()
            .zip(self.listener_reward.iter().zip(&self.listener_choice_prob))
            .map(|(action, (&listener_reward, &listener_choice_prob))| PolicyRow {
                action,
                listener_reward,
                listener_choice_prob,
            })
    }

    pub fn choice_prob_of(&self, name: &str) -> Option<f64> {
        self.rows()
            .find(|row| row.action.name() == name)
            .map(|row| row.listener_choice_prob)
    }
}
