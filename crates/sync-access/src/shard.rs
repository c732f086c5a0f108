//! Key-sharded map shared by the limiter and the caches

use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::{Mutex, PoisonError};

const SHARD_COUNT: usize = 16;

/// A string-keyed map split across independently locked shards, so
/// request handlers touching different keys rarely contend.
#[derive(Debug)]
pub(crate) struct ShardedMap<V> {
    hasher: RandomState,
    shards: Box<[Mutex<HashMap<String, V>>]>,
}

impl<V> ShardedMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    /// Run `f` with exclusive access to the shard owning `key`.
    pub(crate) fn with_shard<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, V>) -> R) -> R {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        let mut shard = self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut shard)
    }

    pub(crate) fn retain(&self, mut keep: impl FnMut(&String, &mut V) -> bool) {
        for shard in self.shards.iter() {
            shard
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|k, v| keep(k, v));
        }
    }

    pub(crate) fn clear(&self) {
        self.retain(|_, _| false);
    }

    pub(crate) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}
