//! In-memory query cache for upstream responses.
//!
//! Entries are fresh for a per-query window. A stale entry is still served, and
//! the caller is told to refresh it in the background. Invalidation removes the
//! matching entries and bumps the cache generation so that a fetch started
//! before it cannot write back. The map is capped; the oldest write is evicted
//! first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Fresh(Value),
    /// `refresh` is true for exactly one caller until the refresh lands.
    Stale { value: Value, refresh: bool },
    Missing,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    fetched_at: Instant,
    written: u64,
    refreshing: bool,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    generation: u64,
    writes: u64,
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Arc<RwLock<Inner>>,
    max_entries: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            inner: Arc::default(),
            max_entries: max_entries.max(1),
        }
    }

    /// Looks `key` up and returns the generation any follow-up `store` must carry.
    /// Misses leave nothing behind.
    pub async fn lookup(&self, key: &str, freshness: Duration) -> (Lookup, u64) {
        let mut inner = self.inner.write().await;
        let generation = inner.generation;

        let lookup = match inner.entries.get_mut(key) {
            None => Lookup::Missing,
            Some(entry) if entry.fetched_at.elapsed() < freshness => Lookup::Fresh(entry.value.clone()),
            Some(entry) => {
                let refresh = !entry.refreshing;
                entry.refreshing = true;
                Lookup::Stale {
                    value: entry.value.clone(),
                    refresh,
                }
            }
        };

        (lookup, generation)
    }

    /// Stores `value` unless something was invalidated since `generation` was handed out.
    pub async fn store(&self, key: &str, value: Value, generation: u64) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            tracing::debug!("🗑️ dropping response for {} fetched before invalidation", key);
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.refreshing = false;
            }
            return false;
        }

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.written)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                tracing::debug!("🗑️ evicted {} to stay within {} entries", oldest, self.max_entries);
            }
        }

        inner.writes += 1;
        let written = inner.writes;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                fetched_at: Instant::now(),
                written,
                refreshing: false,
            },
        );
        true
    }

    /// Lets another caller retry a background refresh that failed.
    pub async fn release(&self, key: &str) {
        if let Some(entry) = self.inner.write().await.entries.get_mut(key) {
            entry.refreshing = false;
        }
    }

    /// Removes every key starting with `prefix` and returns how many were removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        inner.generation += 1;
        before - inner.entries.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
