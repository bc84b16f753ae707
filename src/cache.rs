//! TTL + LRU cache for enhanced search responses.
//!
//! Keyed by the normalized query plus the option fields that change what the
//! provider returns. TTL is content-aware: news and day-fresh queries expire
//! quickly, documentation lookups stay for a day. Eviction at capacity
//! removes the least-recently-accessed entry, not the oldest insertion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::types::{EnhancedResponse, Freshness, ResultKind, SearchOptions};

/// TTL for news results and day-fresh queries.
const TTL_NEWS: Duration = Duration::from_secs(15 * 60);
/// TTL for week-fresh queries.
const TTL_WEEK: Duration = Duration::from_secs(60 * 60);
/// TTL for documentation/API/tutorial lookups.
const TTL_DOCS: Duration = Duration::from_secs(24 * 60 * 60);
/// Default TTL for plain web queries.
const TTL_DEFAULT: Duration = Duration::from_secs(60 * 60);

/// Query substrings that mark a long-lived documentation lookup.
const DOCS_QUERY_MARKERS: &[&str] = &["docs", "documentation", "api", "reference", "tutorial"];

/// A cached response with its lifecycle bookkeeping.
#[derive(Debug, Clone)]
struct CacheEntry {
    response: EnhancedResponse,
    created_at: Instant,
    expires_at: Instant,
    access_count: u64,
    last_accessed: Instant,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Hit/miss statistics for observability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits since construction.
    pub hits: u64,
    /// Number of cache misses since construction.
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0.0 before any lookup.
    pub hit_rate: f64,
    /// Current number of live entries.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// TTL + LRU response cache. Cheap to share behind an [`Arc`].
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl ResponseCache {
    /// Create a cache that holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Cached data stays valid across a panic elsewhere; recover the
        // guard so lookups keep working.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Build the cache key from the normalized query and the option fields
    /// that affect provider output.
    fn key(query: &str, options: &SearchOptions) -> String {
        let freshness = options
            .freshness
            .map_or("none", |f| f.as_param());
        format!(
            "{}|{}|{}|{}|{}|{}",
            query.trim().to_lowercase(),
            options.count,
            options.language.as_deref().unwrap_or(""),
            options.country.as_deref().unwrap_or(""),
            options.kind.as_param(),
            freshness,
        )
    }

    /// Content-aware TTL for a query/options pair.
    ///
    /// | signal | TTL |
    /// |---|---|
    /// | news kind | 15 min |
    /// | freshness = day | 15 min |
    /// | freshness = week | 1 hour |
    /// | docs/api/tutorial query | 24 hours |
    /// | default | 1 hour |
    pub fn ttl_for(query: &str, options: &SearchOptions) -> Duration {
        if options.kind == ResultKind::News {
            return TTL_NEWS;
        }
        match options.freshness {
            Some(Freshness::Day) => return TTL_NEWS,
            Some(Freshness::Week) => return TTL_WEEK,
            _ => {}
        }
        let lower = query.to_lowercase();
        if DOCS_QUERY_MARKERS.iter().any(|m| lower.contains(m)) {
            return TTL_DOCS;
        }
        TTL_DEFAULT
    }

    /// Look up a cached response.
    ///
    /// A hit updates the entry's access statistics. An expired entry is
    /// removed and counted as a miss.
    pub fn get(&self, query: &str, options: &SearchOptions) -> Option<EnhancedResponse> {
        let key = Self::key(query, options);
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.entries.get_mut(&key) {
            Some(entry) if entry.expired(now) => {
                inner.entries.remove(&key);
                inner.misses += 1;
                tracing::trace!(key = %key, "cache entry expired on get");
                None
            }
            Some(entry) => {
                entry.access_count += 1;
                entry.last_accessed = now;
                let response = entry.response.clone();
                inner.hits += 1;
                Some(response)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a response under the content-aware TTL for this query.
    pub fn set(&self, query: &str, options: &SearchOptions, response: EnhancedResponse) {
        self.set_with_ttl(query, options, response, Self::ttl_for(query, options));
    }

    /// Store a response with an explicit TTL.
    ///
    /// At capacity, the entry with the oldest `last_accessed` is evicted
    /// to make room.
    pub fn set_with_ttl(
        &self,
        query: &str,
        options: &SearchOptions,
        response: EnhancedResponse,
        ttl: Duration,
    ) {
        let key = Self::key(query, options);
        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                tracing::trace!(key = %lru_key, "evicting least-recently-accessed entry");
                inner.entries.remove(&lru_key);
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: now,
                expires_at: now + ttl,
                access_count: 0,
                last_accessed: now,
            },
        );
    }

    /// Whether an unexpired entry exists for this query. Does not touch
    /// access statistics.
    pub fn has(&self, query: &str, options: &SearchOptions) -> bool {
        let key = Self::key(query, options);
        let now = Instant::now();
        self.lock()
            .entries
            .get(&key)
            .is_some_and(|e| !e.expired(now))
    }

    /// Remove every entry whose key matches `pattern`. Returns how many
    /// entries were removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !pattern.is_match(key));
        before - inner.entries.len()
    }

    /// Remove all expired entries regardless of access. Returns how many
    /// entries were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.expired(now));
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "cache sweep removed expired entries");
        }
        removed
    }

    /// Current hit/miss statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64
        };
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
            entries: inner.entries.len(),
        }
    }

    /// Age of the entry for this query, if present. Mostly useful in tests.
    pub fn entry_age(&self, query: &str, options: &SearchOptions) -> Option<Duration> {
        let key = Self::key(query, options);
        self.lock()
            .entries
            .get(&key)
            .map(|e| e.created_at.elapsed())
    }

    /// Spawn a background task that sweeps expired entries every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}
