use super::{FeatureSchema, Utterance, World, WorldTable};
use crate::error::ModelError;
use crate::listener::condition_worlds_on_message;

/// A world paired with the probability the listener assigns to it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedWorld {
    pub world: World,
    pub probability: f64,
}

/// Distribution over the worlds consistent with everything heard so far.
///
/// Built only by conditioning, so it is never empty and its mass is spread uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefState {
    schema: FeatureSchema,
    rows: Vec<WeightedWorld>,
}

impl BeliefState {
    pub(crate) fn uniform(schema: FeatureSchema, worlds: Vec<World>) -> Self {
        let probability = 1.0 / worlds.len() as f64;
        let rows = worlds
            .into_iter()
            .map(|world| WeightedWorld { world, probability })
            .collect();
        Self { schema, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[WeightedWorld] {
        &self.rows
    }

    pub fn total_probability(&self) -> f64 {
        self.rows.iter().map(|row| row.probability).sum()
    }

    pub fn probability_of(&self, world: &World) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| &row.world == world)
            .map(|row| row.probability)
    }

    /// Conditions these beliefs on a further message.
    pub fn condition(&self, message: &Utterance) -> Result<BeliefState, ModelError> {
        condition_worlds_on_message(self, message)
    }
}

impl WorldTable for BeliefState {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn worlds(&self) -> impl Iterator<Item = &World> {
        self.rows.iter().map(|row| &row.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_spreads_mass_evenly() {
        let schema = FeatureSchema::new(["blue"]);
        let beliefs = BeliefState::uniform(
            schema,
            vec![
                World::new(vec![-1]),
                World::new(vec![0]),
                World::new(vec![1]),
                World::new(vec![2]),
            ],
        );
        assert_eq!(beliefs.len(), 4);
        assert!(beliefs.rows().iter().all(|row| row.probability == 0.25));
        assert_eq!(beliefs.probability_of(&World::new(vec![1])), Some(0.25));
        assert_eq!(beliefs.probability_of(&World::new(vec![5])), None);
    }
}
