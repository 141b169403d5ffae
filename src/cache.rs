//! Bounded memoization of computed summaries and forecasts

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::features::{SeasonSummary, StatisticBundle};
use crate::predict::{ForecastResult, LinearForecast};
use crate::{EntityId, Result, Season};

/// Which computation produced a cached value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    Summary,
    Describe(String),
    SeasonForecast,
    LinearForecast,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity: EntityId,
    pub season: Season,
    pub kind: CacheKind,
}

impl CacheKey {
    pub fn new(entity: EntityId, season: Season, kind: CacheKind) -> Self {
        CacheKey {
            entity,
            season,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Summary(SeasonSummary),
    Bundle(StatisticBundle),
    Forecast(ForecastResult),
    Linear(LinearForecast),
}

struct Inner<K, V> {
    entries: HashMap<K, V>,
    /// Least recently used at the front
    order: VecDeque<K>,
}

/// Capacity-bounded cache with least-recently-used eviction
///
/// Shared by reference between threads; entries are immutable once stored.
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K, V>> {
        // Entries are whole values; a poisoned lock still holds a consistent map
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let value = inner.entries.get(key).cloned()?;
        touch(&mut inner.order, key);
        Some(value)
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.lock();
        if inner.entries.insert(key.clone(), value).is_some() {
            touch(&mut inner.order, &key);
            return;
        }
        inner.order.push_back(key);
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(evicted) => {
                    inner.entries.remove(&evicted);
                    log::debug!("Cache full ({}), evicted oldest entry", self.capacity);
                }
                None => break,
            }
        }
    }

    /// Return the cached value or compute it; failures are not stored
    ///
    /// The lock is not held while computing, so two threads missing on the
    /// same key may both compute it.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

fn touch<K: Eq>(order: &mut VecDeque<K>, key: &K) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        if let Some(k) = order.remove(pos) {
            order.push_back(k);
        }
    }
}

pub type StatsCache = LruCache<CacheKey, CachedValue>;
