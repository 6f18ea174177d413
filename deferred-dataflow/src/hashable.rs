//! Traits and types related to the hashing of data.
//!
//! Keyed operators partition their state by the hash of the key, as a multi-worker deployment
//! would partition it across workers. Within a single worker the shards are independent maps,
//! and a key's shard never changes.

use std::hash::{Hash, Hasher};

use fnv::{FnvHashMap, FnvHasher};

/// Types with a `hashed` method, producing a stable 64-bit hash value.
pub trait Hashable {
    /// A hash of the associated value.
    fn hashed(&self) -> u64;
}

impl<T: Hash> Hashable for T {
    fn hashed(&self) -> u64 {
        let mut h: FnvHasher = Default::default();
        self.hash(&mut h);
        h.finish()
    }
}

/// Keyed state partitioned into a fixed number of shards by key hash.
pub struct Shards<K, S> {
    shards: Vec<FnvHashMap<K, S>>,
}

impl<K: Hash + Eq, S: Default> Shards<K, S> {
    /// Allocates `count` empty shards; at least one shard is always allocated.
    pub fn new(count: usize) -> Self {
        Shards {
            shards: (0 .. count.max(1)).map(|_| FnvHashMap::default()).collect(),
        }
    }

    /// The shard responsible for `key`.
    #[inline]
    pub fn shard_of(&self, key: &K) -> usize {
        (key.hashed() % (self.shards.len() as u64)) as usize
    }

    /// The state for `key`, if any has been recorded.
    pub fn get(&self, key: &K) -> Option<&S> {
        self.shards[self.shard_of(key)].get(key)
    }

    /// The state for `key`, created empty if absent.
    pub fn get_or_default(&mut self, key: K) -> &mut S {
        let shard = self.shard_of(&key);
        self.shards[shard].entry(key).or_default()
    }

    /// Removes the state for `key`.
    pub fn remove(&mut self, key: &K) -> Option<S> {
        let shard = self.shard_of(key);
        self.shards[shard].remove(key)
    }

    /// Total number of keys with recorded state.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    /// True when no key has recorded state.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }
}

#[cfg(test)]
mod tests {

    use super::{Hashable, Shards};

    #[test]
    fn hashing_is_stable() {
        assert_eq!("node".hashed(), "node".hashed());
        assert_ne!(1u64.hashed(), 2u64.hashed());
    }

    #[test]
    fn keys_stay_in_their_shard() {
        let mut shards: Shards<u64, Vec<u64>> = Shards::new(4);
        for key in 0 .. 100u64 {
            shards.get_or_default(key % 10).push(key);
        }
        assert_eq!(shards.len(), 10);
        for key in 0 .. 10u64 {
            assert_eq!(shards.get(&key).map(|v| v.len()), Some(10));
            assert!(shards.shard_of(&key) < 4);
        }
        assert!(shards.remove(&3).is_some());
        assert!(shards.get(&3).is_none());
    }

    #[test]
    fn zero_shards_means_one() {
        let shards: Shards<u64, ()> = Shards::new(0);
        assert!((0 .. 20u64).all(|key| shards.shard_of(&key) == 0));
        assert!(shards.is_empty());
    }
}
