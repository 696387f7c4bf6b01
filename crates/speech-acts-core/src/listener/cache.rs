//! Memoized belief states keyed by the utterance that produced them.

use crate::error::ModelError;
use crate::model::{BeliefState, Utterance};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hit/miss counters; `misses` equals the number of conditioning passes run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Utterance, Arc<BeliefState>>,
    hits: u64,
    misses: u64,
}

/// Unbounded utterance → beliefs map. Entries live as long as the owning listener.
#[derive(Debug, Default)]
pub struct BeliefCache {
    state: Mutex<CacheState>,
}

impl BeliefCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Utterance) -> Option<Arc<BeliefState>> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Returns the cached beliefs for `key`, running `compute` once on a miss.
    ///
    /// The lock is held across the computation, so concurrent callers never condition the
    /// same utterance twice. Failed computations are not stored.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: &Utterance,
        compute: F,
    ) -> Result<Arc<BeliefState>, ModelError>
    where
        F: FnOnce() -> Result<BeliefState, ModelError>,
    {
        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(key).cloned() {
            state.hits += 1;
            return Ok(existing);
        }

        state.misses += 1;
        let beliefs = Arc::new(compute()?);
        state.entries.insert(key.clone(), Arc::clone(&beliefs));
        Ok(beliefs)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureSchema, World};

    fn single_world() -> BeliefState {
        BeliefState::uniform(FeatureSchema::new(["green"]), vec![World::new(vec![1])])
    }

    #[test]
    fn computes_once_per_key() {
        let cache = BeliefCache::new();
        let key = Utterance::new("green", 1);
        let mut calls = 0;

        let first = cache
            .get_or_try_insert_with(&key, || {
                calls += 1;
                Ok(single_world())
            })
            .expect("first insert");
        let second = cache
            .get_or_try_insert_with(&key, || {
                calls += 1;
                Ok(single_world())
            })
            .expect("cached");

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = BeliefCache::new();
        let key = Utterance::new("green", 7);
        let err = cache
            .get_or_try_insert_with(&key, || {
                Err(ModelError::NoCompatibleWorlds {
                    message: key.clone(),
                })
            })
            .expect_err("conditioning fails");
        assert!(matches!(err, ModelError::NoCompatibleWorlds { .. }));
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }
}
