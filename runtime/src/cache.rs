//! Time-bounded memoization cache.
//!
//! Keys are derived from an operation name plus a canonical serialization of
//! its parameters, so two logically identical requests always collide and
//! different ones never do. Expiry is lazy: nothing is purged on a timer,
//! an entry past its TTL is simply dropped the next time it is read.
//!
//! The cache is purely advisory. Callers must always be able to recompute a
//! missing or stale value; nothing may depend on retention for correctness.

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

/// Derive a deterministic cache key from an operation name and its
/// parameter set.
///
/// Parameters are serialized canonically (object keys recursively sorted),
/// so insertion order never affects the key. The key itself is the
/// hex-encoded SHA-256 of `operation + "\n" + canonical_params`.
#[must_use]
pub fn cache_key(operation: &str, params: &serde_json::Value) -> String {
    let mut canonical = String::new();
    write_canonical(params, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();

    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Serialize a JSON value with object keys in sorted order.
fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // serde_json handles the string escaping.
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

struct Entry<T> {
    payload: T,
    cached_at: Instant,
}

/// Snapshot of cache occupancy for the observability surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored, live or not.
    pub entries: usize,
    /// Entries still within their TTL.
    pub live: usize,
}

/// Memoization map with a fixed per-instance TTL and lazy expiry.
///
/// Typically one instance per data view, not shared across views. There is
/// no size-bounded eviction: entries live until they expire on read or the
/// whole cache is cleared.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: HashMap<String, Entry<T>>,
}

impl<T: Clone> TtlCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up a key, returning the payload only while the entry is within
    /// its TTL. An expired entry is dropped and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.cached_at.elapsed() < self.ttl {
            return Some(entry.payload.clone());
        }
        tracing::debug!(key, "cache entry expired on read");
        self.entries.remove(key);
        None
    }

    /// Store or overwrite a key with a fresh timestamp.
    pub fn put(&mut self, key: impl Into<String>, payload: T) {
        self.entries.insert(
            key.into(),
            Entry {
                payload,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop one key regardless of freshness.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry across every operation name. Called whenever the
    /// caller knows upstream data has mutated.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let live = self
            .entries
            .values()
            .filter(|e| e.cached_at.elapsed() < self.ttl)
            .count();
        CacheStats {
            entries: self.entries.len(),
            live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::advance;

    #[test]
    fn key_is_param_order_independent() {
        let a = cache_key("x", &json!({"a": 1, "b": 2}));
        let b = cache_key("x", &json!({"b": 2, "a": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_sorts_nested_objects_too() {
        let a = cache_key("x", &json!({"outer": {"p": 1, "q": [{"z": 0, "y": 1}]}}));
        let b = cache_key("x", &json!({"outer": {"q": [{"y": 1, "z": 0}], "p": 1}}));
        assert_eq!(a, b);
    }

    #[test]
    fn key_separates_operations_and_params() {
        let params = json!({"base": "X"});
        assert_ne!(cache_key("bases", &params), cache_key("filiais", &params));
        assert_ne!(
            cache_key("bases", &json!({"base": "X"})),
            cache_key("bases", &json!({"base": "Y"})),
        );
    }

    #[test]
    fn array_order_still_matters() {
        // Arrays are positional; only object key order is canonicalized.
        assert_ne!(
            cache_key("x", &json!({"ids": [1, 2]})),
            cache_key("x", &json!({"ids": [2, 1]})),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_within_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(300));
        let key = cache_key("bases", &json!({"base": "X"}));

        cache.put(key.clone(), json!([1, 2, 3]));
        assert_eq!(cache.get(&key), Some(json!([1, 2, 3])));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(300));
        let key = cache_key("bases", &json!({"base": "X"}));
        cache.put(key.clone(), json!("payload"));

        advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&key), Some(json!("payload")));

        advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&key), None);
        // Lazy expiry dropped the entry on that read.
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn put_refreshes_the_timestamp() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.put("k", 1u32);

        advance(Duration::from_secs(8)).await;
        cache.put("k", 2u32);

        advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_everything() {
        let mut cache = TtlCache::new(Duration::from_secs(300));
        let key = cache_key("bases", &json!({"base": "X"}));
        cache.put(key.clone(), json!([1, 2, 3]));
        cache.put(cache_key("filiais", &json!({})), json!([4]));

        cache.clear();

        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.stats(), CacheStats { entries: 0, live: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn stats_distinguish_live_from_stale() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.put("old", json!(1));
        advance(Duration::from_secs(11)).await;
        cache.put("fresh", json!(2));

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.live, 1);
    }
}
