//! Listener-side inference.
//!
//! - `literal`: conditioning and the [`LiteralListener`].
//! - `cache`: utterance-keyed belief memoization.
//! - `rewards`: expected-reward marginalization and the schema mismatch policy.
//! - `policy`: the listener's action-choice distribution.
//! - `softmax`: temperature-scaled normalization.

mod cache;
mod literal;
mod policy;
mod rewards;
mod softmax;

pub use cache::{BeliefCache, CacheStats};
pub use literal::{LiteralListener, condition_worlds_on_message};
pub use policy::{ListenerPolicy, PolicyRow};
pub use rewards::{RewardSource, SchemaMode, estimate_rewards};
pub use softmax::{softmax, softmax_with_temperature};
