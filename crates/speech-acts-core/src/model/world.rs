use super::FeatureSchema;
use crate::error::ModelError;

/// Value a world assigns to a feature, e.g. a `-1` / `+1` weight.
pub type FeatureValue = i64;

/// One complete assignment of values to every feature of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct World {
    values: Vec<FeatureValue>,
}

impl World {
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<FeatureValue> {
        self.values.get(index).copied()
    }
}

/// Ordered collection of worlds laid out against one schema.
pub trait WorldTable {
    fn schema(&self) -> &FeatureSchema;

    fn worlds(&self) -> impl Iterator<Item = &World>;
}

/// Every world the listener considers possible before hearing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSpace {
    schema: FeatureSchema,
    worlds: Vec<World>,
}

impl WorldSpace {
    /// Rejects worlds whose width differs from the schema.
    pub fn new(schema: FeatureSchema, worlds: Vec<World>) -> Result<Self, ModelError> {
        if let Some((index, world)) = worlds
            .iter()
            .enumerate()
            .find(|(_, world)| world.values().len() != schema.len())
        {
            return Err(ModelError::MalformedWorld {
                index,
                expected: schema.len(),
                found: world.values().len(),
            });
        }
        Ok(Self { schema, worlds })
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&World> {
        self.worlds.get(index)
    }

    pub fn value_of(&self, world: &World, feature: &str) -> Option<FeatureValue> {
        self.schema
            .index_of(feature)
            .and_then(|index| world.value(index))
    }
}

impl WorldTable for WorldSpace {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn worlds(&self) -> impl Iterator<Item = &World> {
        self.worlds.iter()
    }
}
