//! Bounded associative cache with least-recently-used eviction.
//!
//! The cache keeps its entries threaded on an intrusive doubly linked
//! list, oldest entry at the head. Iteration and [`LruCache::pop_oldest`]
//! always proceed oldest to newest.
//!
//! Two details are part of the contract and are relied upon by callers:
//!
//! - [`LruCache::get`] does **not** update recency. Only [`LruCache::set`]
//!   and [`LruCache::touch`] move an entry to the most-recently-used end.
//!   Callers that want LRU-correct reads pair `get` with `touch`.
//! - There is no `copy`/`merge` surface. Duplicating a cache must be an
//!   explicit decision made by the caller.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use thiserror::Error;

/// Errors reported by [`LruCache`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// The requested bounds are inconsistent.
    #[error("size_max ({size_max}) is smaller than size_min ({size_min})")]
    Config { size_min: usize, size_max: usize },
    /// `touch` was called for a key that is not present.
    #[error("key not present in cache")]
    KeyNotFound,
    /// `pop_oldest` was called on an empty cache.
    #[error("cache is empty")]
    Empty,
}

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A map from key to value bounded by `size_max` entries.
///
/// When an insertion pushes the length past `size_max`, the least
/// recently used entries are evicted until the length reaches
/// `size_min` — unless the cache was built with [`LruCache::manual`],
/// in which case overflow is tolerated until [`LruCache::evict_to_min`]
/// is called.
pub struct LruCache<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    size_min: usize,
    size_max: usize,
    automatic: bool,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache that evicts automatically on overflow.
    pub fn new(size_min: usize, size_max: usize) -> Result<Self, CacheError> {
        Self::with_mode(size_min, size_max, true)
    }

    /// Create a cache that tolerates overflow until [`Self::evict_to_min`].
    pub fn manual(size_min: usize, size_max: usize) -> Result<Self, CacheError> {
        Self::with_mode(size_min, size_max, false)
    }

    fn with_mode(size_min: usize, size_max: usize, automatic: bool) -> Result<Self, CacheError> {
        if size_max < size_min {
            return Err(CacheError::Config { size_min, size_max });
        }
        Ok(Self {
            map: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            size_min,
            size_max,
            automatic,
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or overwrite, marking the key as most recently used.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&index) = self.map.get(&key) {
            if let Some(slot) = self.slots[index].as_mut() {
                slot.value = value;
            }
            self.unlink(index);
            self.push_newest(index);
        } else {
            let slot = Slot {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            };
            let index = match self.free.pop() {
                Some(index) => {
                    self.slots[index] = Some(slot);
                    index
                }
                None => {
                    self.slots.push(Some(slot));
                    self.slots.len() - 1
                }
            };
            self.map.insert(key, index);
            self.push_newest(index);
        }

        if self.automatic && self.map.len() > self.size_max {
            self.evict_to_min();
        }
    }

    /// Plain lookup. Does not update recency.
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = *self.map.get(key)?;
        self.slots[index].as_ref().map(|slot| &slot.value)
    }

    /// Mark a key as most recently used.
    pub fn touch(&mut self, key: &K) -> Result<(), CacheError> {
        let index = *self.map.get(key).ok_or(CacheError::KeyNotFound)?;
        if self.tail == Some(index) {
            return Ok(());
        }
        self.unlink(index);
        self.push_newest(index);
        Ok(())
    }

    /// Remove and return the least recently used entry.
    pub fn pop_oldest(&mut self) -> Result<(K, V), CacheError> {
        let index = self.head.ok_or(CacheError::Empty)?;
        self.unlink(index);
        let slot = self.slots[index].take().expect("linked slot is occupied");
        self.free.push(index);
        self.map.remove(&slot.key);
        Ok((slot.key, slot.value))
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.map.remove(key)?;
        self.unlink(index);
        let slot = self.slots[index].take().expect("linked slot is occupied");
        self.free.push(index);
        Some(slot.value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Evict least recently used entries until `len() <= size_min`.
    ///
    /// The explicit counterpart to automatic eviction, for caches built
    /// with [`Self::manual`].
    pub fn evict_to_min(&mut self) {
        while self.map.len() > self.size_min {
            let _ = self.pop_oldest();
        }
    }

    /// Iterate entries, oldest to newest.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            next: self.head,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let slot = self.slots[index].as_ref().expect("unlink of empty slot");
            (slot.prev, slot.next)
        };
        match prev {
            Some(prev_index) => {
                if let Some(slot) = self.slots[prev_index].as_mut() {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_index) => {
                if let Some(slot) = self.slots[next_index].as_mut() {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(slot) = self.slots[index].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }

    fn push_newest(&mut self, index: usize) {
        if let Some(slot) = self.slots[index].as_mut() {
            slot.prev = self.tail;
            slot.next = None;
        }
        match self.tail {
            Some(tail_index) => {
                if let Some(slot) = self.slots[tail_index].as_mut() {
                    slot.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Oldest-to-newest iterator over cache entries.
pub struct Iter<'a, K, V> {
    slots: &'a [Option<Slot<K, V>>],
    next: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let slot = self.slots[index].as_ref()?;
        self.next = slot.next;
        Some((&slot.key, &slot.value))
    }
}
