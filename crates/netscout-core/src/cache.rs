//! In-process result cache with TTL expiry.
//!
//! [`ResultCache`] stores serialized tool responses under keys produced by
//! [`CacheKey`]. Entries expire lazily: a lookup that finds a stale entry
//! removes it and reports a miss. Nothing is evicted by size, and nothing
//! runs in the background.
//!
//! The cache itself is a plain owned value; callers that share it across
//! tasks wrap it in their own lock. It provides no single-flight guarantee:
//! two callers that miss on the same key both compute, and the last
//! [`ResultCache::put`] wins.
//!
//! ```rust
//! use netscout_core::cache::{CacheKey, ResultCache};
//! use std::time::Duration;
//!
//! let mut cache = ResultCache::new(Duration::from_secs(300));
//! let key = CacheKey::new("markdown")
//!     .arg("https://example.com")
//!     .arg(10_000)
//!     .finish();
//!
//! assert!(cache.get(&key).is_none());
//! cache.put(key.clone(), "{\"status\": \"success\"}".to_string());
//! assert_eq!(cache.get(&key).as_deref(), Some("{\"status\": \"success\"}"));
//! ```

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of monotonic time for expiry checks.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced [`Clock`] for tests.
///
/// ```rust
/// use netscout_core::cache::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now() - start, Duration::from_secs(5));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Cached value with its insertion time and lifetime.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

/// Key-value store of serialized results with per-entry TTL.
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    /// Create an empty cache using the system clock.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Create an empty cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            clock,
        }
    }

    /// TTL applied by [`ResultCache::put`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the stored value if present and unexpired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                debug!(key, "result cache hit");
                Some(entry.value.clone())
            },
            Some(_) => {
                debug!(key, "result cache entry expired");
                self.entries.remove(key);
                None
            },
            None => None,
        }
    }

    /// Store `value` under `key` with the default TTL, replacing any prior entry.
    pub fn put(&mut self, key: String, value: String) {
        let ttl = self.default_ttl;
        self.put_with_ttl(key, value, ttl);
    }

    /// Store `value` under `key` with an explicit TTL, replacing any prior entry.
    pub fn put_with_ttl(&mut self, key: String, value: String, ttl: Duration) {
        let entry = CacheEntry {
            value,
            inserted_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Drop every entry, returning how many were held.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Number of stored entries, expired ones included until they are looked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry (fresh or not) is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Builder for deterministic cache keys.
///
/// The key is the hex SHA-256 of the JSON document
/// `[operation, [positional...], {keyword: value}]`. Keyword arguments live
/// in a sorted map, so their order never changes the key; positional order
/// does.
///
/// ```rust
/// use netscout_core::cache::CacheKey;
///
/// let a = CacheKey::new("pdf").kwarg("a", 1).kwarg("b", 2).finish();
/// let b = CacheKey::new("pdf").kwarg("b", 2).kwarg("a", 1).finish();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
///
/// let x = CacheKey::new("pdf").arg(1).arg(2).finish();
/// let y = CacheKey::new("pdf").arg(2).arg(1).finish();
/// assert_ne!(x, y);
/// ```
#[derive(Debug, Clone)]
pub struct CacheKey {
    operation: String,
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
}

impl CacheKey {
    /// Start a key for the named operation.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            positional: Vec::new(),
            keyword: BTreeMap::new(),
        }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Serialize) -> Self {
        self.positional.push(to_value(value));
        self
    }

    /// Set a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.keyword.insert(name.into(), to_value(value));
        self
    }

    /// Hash the arguments into a 64-character hex key.
    #[must_use]
    pub fn finish(self) -> String {
        let keyword: serde_json::Map<String, Value> = self.keyword.into_iter().collect();
        let document = Value::Array(vec![
            Value::String(self.operation),
            Value::Array(self.positional),
            Value::Object(keyword),
        ]);

        let mut hasher = Sha256::new();
        hasher.update(document.to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut acc, b| {
                // write! to String is infallible
                let _ = write!(acc, "{b:02x}");
                acc
            })
    }
}

// Unrepresentable values still hash to a stable key.
fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache_with_clock(ttl_secs: u64) -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_get_after_put_returns_value() {
        let (mut cache, _clock) = cache_with_clock(300);
        cache.put("k".into(), "v".into());
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key_is_miss() {
        let (mut cache, _clock) = cache_with_clock(300);
        assert!(cache.get("absent").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_valid_until_ttl_elapses() {
        let (mut cache, clock) = cache_with_clock(300);
        cache.put("k".into(), "v".into());

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        // now - inserted_at == ttl is already stale
        clock.advance(Duration::from_secs(1));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_expired_entry_removed_on_lookup() {
        let (mut cache, clock) = cache_with_clock(10);
        cache.put("k".into(), "v".into());
        clock.advance(Duration::from_secs(11));

        assert!(cache.contains("k"), "expiry is lazy");
        assert!(cache.get("k").is_none());
        assert!(!cache.contains("k"), "lookup removes the stale entry");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites_and_resets_timestamp() {
        let (mut cache, clock) = cache_with_clock(10);
        cache.put("k".into(), "old".into());
        clock.advance(Duration::from_secs(8));
        cache.put("k".into(), "new".into());
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("k").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_per_entry_ttl_is_honored() {
        let (mut cache, clock) = cache_with_clock(300);
        cache.put_with_ttl("short".into(), "a".into(), Duration::from_secs(5));
        cache.put("long".into(), "b".into());

        clock.advance(Duration::from_secs(6));
        assert!(cache.get("short").is_none());
        assert_eq!(cache.get("long").as_deref(), Some("b"));
    }

    #[test]
    fn test_clear_drops_everything() {
        let (mut cache, _clock) = cache_with_clock(300);
        cache.put("a".into(), "1".into());
        cache.put("b".into(), "2".into());

        assert_eq!(cache.clear(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_no_size_eviction() {
        let (mut cache, _clock) = cache_with_clock(300);
        for i in 0..5_000 {
            cache.put(format!("k{i}"), i.to_string());
        }
        assert_eq!(cache.len(), 5_000);
        assert_eq!(cache.get("k0").as_deref(), Some("0"));
    }

    #[test]
    fn test_key_keyword_order_independent() {
        let a = CacheKey::new("op").kwarg("a", 1).kwarg("b", 2).finish();
        let b = CacheKey::new("op").kwarg("b", 2).kwarg("a", 1).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_positional_order_dependent() {
        let a = CacheKey::new("op").arg("x").arg("y").finish();
        let b = CacheKey::new("op").arg("y").arg("x").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_distinguishes_inputs() {
        let base = CacheKey::new("markdown").arg("https://a.example").arg(100).finish();
        let other_url = CacheKey::new("markdown").arg("https://b.example").arg(100).finish();
        let other_len = CacheKey::new("markdown").arg("https://a.example").arg(101).finish();
        let other_op = CacheKey::new("pdf").arg("https://a.example").arg(100).finish();
        let as_string = CacheKey::new("markdown").arg("https://a.example").arg("100").finish();

        assert_ne!(base, other_url);
        assert_ne!(base, other_len);
        assert_ne!(base, other_op);
        assert_ne!(base, as_string);
    }

    #[test]
    fn test_key_is_fixed_length_hex_and_stable() {
        let first = CacheKey::new("youtube").arg("dQw4w9WgXcQ").arg("en").finish();
        let second = CacheKey::new("youtube").arg("dQw4w9WgXcQ").arg("en").finish();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_positional_and_keyword_do_not_collide() {
        let positional = CacheKey::new("op").arg(1).finish();
        let keyword = CacheKey::new("op").kwarg("0", 1).finish();
        assert_ne!(positional, keyword);
    }

    // Property-based tests
    proptest! {
        #[test]
        fn test_put_then_get_returns_value(key in ".*", value in ".*") {
            let (mut cache, _clock) = cache_with_clock(300);
            cache.put(key.clone(), value.clone());
            prop_assert_eq!(cache.get(&key), Some(value));
        }

        #[test]
        fn test_entry_expires_after_ttl(ttl_secs in 1u64..=3600, extra_ms in 0u64..=10_000) {
            let (mut cache, clock) = cache_with_clock(ttl_secs);
            cache.put("k".into(), "v".into());
            clock.advance(Duration::from_secs(ttl_secs) + Duration::from_millis(extra_ms));
            prop_assert!(cache.get("k").is_none());
            prop_assert!(cache.is_empty());
        }

        #[test]
        fn test_keyword_order_never_matters(
            pairs in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)
        ) {
            let forward = pairs
                .iter()
                .fold(CacheKey::new("op"), |key, (name, value)| key.kwarg(name.clone(), value))
                .finish();
            let reverse = pairs
                .iter()
                .rev()
                .fold(CacheKey::new("op"), |key, (name, value)| key.kwarg(name.clone(), value))
                .finish();
            prop_assert_eq!(forward, reverse);
        }
    }
}
