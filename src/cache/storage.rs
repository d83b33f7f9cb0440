//! In-memory TTL storage
//!
//! Entries live for the lifetime of the process. The store lock is held
//! across the fetch so a read-check-then-write on a key is atomic.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use tokio::sync::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL is too large to represent
    expires_at: Option<DateTime<Utc>>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Process-local key/value cache with per-entry expiry
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the live entry for `key`, or run `fetch` and store its result.
    ///
    /// `refresh` skips the lookup. A failed fetch leaves any existing entry
    /// untouched.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        refresh: bool,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut entries = self.entries.lock().await;

        if !refresh {
            let now = self.clock.now();
            if let Some(entry) = entries.get(key).filter(|e| e.is_live(now)) {
                debug!("Cache hit: {}", key);
                return Ok(entry.value.clone());
            }
        }

        debug!("Cache {}: {}", if refresh { "refresh" } else { "miss" }, key);
        let value = fetch().await?;
        let now = self.clock.now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl));
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(value)
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Number of stored entries, live or not
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
