//! In-memory analysis cache with lazy TTL expiry and threshold sweeps.
//!
//! Keyed by the literal input sentence: no normalization, so `花` and `花。`
//! are different keys. An expired entry is removed when it is looked up.
//! Once an insert pushes the entry count past `sweep_threshold`, every
//! expired entry is removed in one pass. The threshold is a cleanup trigger,
//! not a capacity bound; the map grows past it if everything is still fresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::analysis::SentenceAnalysis;

/// One cached analysis. Immutable once stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<SentenceAnalysis>,
    pub stored_at: Instant,
}

/// Process-wide analysis cache. Share it behind an `Arc`.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    sweep_threshold: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    sweeps: AtomicU64,
}

impl ResponseCache {
    /// Default entry lifetime (1 hour).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
    /// Default entry count above which inserts trigger a sweep.
    pub const DEFAULT_SWEEP_THRESHOLD: usize = 100;

    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            sweep_threshold,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
        }
    }

    /// Look up `key`. Returns `None` if absent or expired; expired entries
    /// are removed on the way out.
    pub fn get(&self, key: &str) -> Option<Arc<SentenceAnalysis>> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` without counting a hit or miss. Used for re-checks
    /// that follow a counted [`ResponseCache::get`].
    pub fn peek(&self, key: &str) -> Option<Arc<SentenceAnalysis>> {
        self.peek_at(key, Instant::now())
    }

    /// Insert or overwrite `key`, stamped with the current time.
    pub fn put(&self, key: String, data: Arc<SentenceAnalysis>) {
        self.put_at(key, data, Instant::now());
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Snapshot of cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }

    // -- clock-explicit internals (tests drive time through these) ----------

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Arc<SentenceAnalysis>> {
        self.lookup(key, now, true)
    }

    /// Like [`ResponseCache::get_at`] but leaves the hit/miss counters alone.
    pub(crate) fn peek_at(&self, key: &str, now: Instant) -> Option<Arc<SentenceAnalysis>> {
        self.lookup(key, now, false)
    }

    fn lookup(&self, key: &str, now: Instant, record: bool) -> Option<Arc<SentenceAnalysis>> {
        let mut entries = self.lock();
        let expired = entries.get(key).map(|e| self.is_expired(e, now));
        let found = match expired {
            Some(false) => entries.get(key).map(|e| Arc::clone(&e.data)),
            Some(true) => {
                debug!(chars = key.chars().count(), "Cache entry expired, removing");
                entries.remove(key);
                None
            }
            None => None,
        };
        if record {
            let counter = if found.is_some() { &self.hits } else { &self.misses };
            counter.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub(crate) fn put_at(&self, key: String, data: Arc<SentenceAnalysis>, now: Instant) {
        let mut entries = self.lock();
        entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
            },
        );
        if entries.len() > self.sweep_threshold {
            let removed = self.retain_fresh(&mut entries, now);
            debug!(
                removed,
                remaining = entries.len(),
                "Cache passed sweep threshold, removed expired entries"
            );
        }
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        self.retain_fresh(&mut entries, now)
    }

    fn retain_fresh(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| !self.is_expired(e, now));
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        before - entries.len()
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().expect("response cache lock poisoned")
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL, Self::DEFAULT_SWEEP_THRESHOLD)
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    /// Number of entries currently held, expired or not.
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Number of sweeps run, threshold-triggered or explicit.
    pub sweeps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::watashi_wa;

    const HOUR: Duration = Duration::from_secs(3600);

    fn value() -> Arc<SentenceAnalysis> {
        Arc::new(watashi_wa())
    }

    #[test]
    fn test_cache_hit_miss() {
        let cache = ResponseCache::default();
        assert!(cache.get("私は美しい花を見ました。").is_none());
        let v = value();
        cache.put("私は美しい花を見ました。".into(), Arc::clone(&v));
        let hit = cache.get("私は美しい花を見ました。").unwrap();
        assert!(Arc::ptr_eq(&hit, &v));
    }

    #[test]
    fn test_keys_not_normalized() {
        let cache = ResponseCache::default();
        cache.put("花".into(), value());
        assert!(cache.get("花。").is_none());
        assert!(cache.get(" 花").is_none());
        assert!(cache.get("花").is_some());
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.put_at("k".into(), value(), t0);
        let mut other = watashi_wa();
        other.is_fragment = true;
        cache.put_at("k".into(), Arc::new(other), t0 + Duration::from_secs(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("k", t0 + Duration::from_secs(2)).unwrap().is_fragment);
    }

    #[test]
    fn test_entry_at_exact_ttl_is_fresh() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        cache.put_at("k".into(), value(), t0);
        assert!(cache.get_at("k", t0 + HOUR).is_some());
    }

    #[test]
    fn test_expired_entry_removed_on_get() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        cache.put_at("k".into(), value(), t0);
        assert!(cache
            .get_at("k", t0 + HOUR + Duration::from_millis(1))
            .is_none());
        assert!(cache.is_empty(), "lazy expiry must evict the entry");
    }

    #[test]
    fn test_insert_past_threshold_sweeps_expired() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        for i in 0..100 {
            cache.put_at(format!("old-{i}"), value(), t0);
        }
        assert_eq!(cache.len(), 100);
        // The 101st insert crosses the threshold; every old entry is stale.
        let later = t0 + HOUR + Duration::from_secs(1);
        cache.put_at("fresh".into(), value(), later);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("fresh", later).is_some());
        assert_eq!(cache.stats().sweeps, 1);
    }

    #[test]
    fn test_sweep_never_removes_fresh_entries() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        for i in 0..100 {
            cache.put_at(format!("k-{i}"), value(), t0);
        }
        cache.put_at("k-100".into(), value(), t0 + Duration::from_secs(600));
        // Threshold is a trigger, not a bound: nothing is stale, nothing goes.
        assert_eq!(cache.len(), 101);
    }

    #[test]
    fn test_sweep_is_partial() {
        let cache = ResponseCache::new(HOUR, 3);
        let t0 = Instant::now();
        cache.put_at("a".into(), value(), t0);
        cache.put_at("b".into(), value(), t0);
        cache.put_at("c".into(), value(), t0 + Duration::from_secs(1800));
        cache.put_at("d".into(), value(), t0 + HOUR + Duration::from_secs(1));
        assert_eq!(cache.len(), 2);
        let now = t0 + HOUR + Duration::from_secs(2);
        assert!(cache.get_at("c", now).is_some());
        assert!(cache.get_at("d", now).is_some());
    }

    #[test]
    fn test_no_sweep_at_threshold() {
        let cache = ResponseCache::new(HOUR, 2);
        let t0 = Instant::now();
        cache.put_at("a".into(), value(), t0);
        cache.put_at("b".into(), value(), t0 + HOUR * 2);
        // len == threshold: no sweep yet, stale "a" still stored.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().sweeps, 0);
    }

    #[test]
    fn test_explicit_sweep() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        cache.put_at("a".into(), value(), t0);
        cache.put_at("b".into(), value(), t0 + HOUR);
        assert_eq!(cache.sweep_at(t0 + HOUR + Duration::from_secs(1)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_peek_does_not_count() {
        let cache = ResponseCache::new(HOUR, 100);
        let t0 = Instant::now();
        cache.put_at("k".into(), value(), t0);
        assert!(cache.peek_at("k", t0).is_some());
        assert!(cache.peek_at("missing", t0).is_none());
        // Still expires lazily.
        assert!(cache.peek_at("k", t0 + HOUR + Duration::from_secs(1)).is_none());
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = ResponseCache::default();
        cache.put("k".into(), value());
        let _ = cache.get("k");
        let _ = cache.get("k");
        let _ = cache.get("missing");
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::default();
        cache.put("k".into(), value());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(ResponseCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.put(format!("k{i}"), value());
                    cache.get(&format!("k{i}")).is_some()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(cache.len(), 8);
    }
}
