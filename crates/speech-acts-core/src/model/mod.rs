//! Value types shared by the listener, the speakers and the generators.
//!
//! - `schema`: canonical feature ordering.
//! - `world` / `belief`: complete feature assignments and weighted subsets of them.
//! - `utterance`: `(feature, value)` messages.
//! - `action`: named indicator vectors grouped into an action context.
//! - `reward`: ground-truth feature weights.

mod action;
mod belief;
mod reward;
mod schema;
mod utterance;
mod world;

pub use action::{ACTION_NAME_SEPARATOR, Action, ActionContext};
pub use belief::{BeliefState, WeightedWorld};
pub use reward::RewardVector;
pub use schema::FeatureSchema;
pub use utterance::Utterance;
pub use world::{FeatureValue, World, WorldSpace, WorldTable};
