//! Size- and age-bounded byte cache backing the Block1 request-assembly
//! and Block2 response-session stores.
//!
//! One process-wide instance serves both uses; the key constructors keep
//! the namespaces disjoint so an assembly entry can never shadow a
//! session entry for the same method and URL.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

/// Default total capacity: 10 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 10_485_760;
/// Default per-entry maximum age.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);

/// Key for an in-progress Block1 upload (assembled HTTP request).
pub fn assembly_key(method: &str, url: &str) -> String {
    format!("REQ {method} {url}")
}

/// Key for a Block2 download session (materialized HTTP response).
pub fn session_key(method: &str, url: &str) -> String {
    format!("RES {method} {url}")
}

struct Entry {
    data: Bytes,
    /// Last write; entries expire `max_age` after this.
    stored: Instant,
    /// Position in the recency index.
    seq: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Monotonic sequence -> key, least recently used first.
    recency: BTreeMap<u64, String>,
    total_bytes: u64,
    next_seq: u64,
}

impl Inner {
    fn touch(&mut self, key: &str) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.seq);
            entry.seq = seq;
            self.recency.insert(seq, key.to_owned());
        }
    }

    fn drop_entry(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.seq);
            self.total_bytes -= entry.data.len() as u64;
        }
    }

    fn prune_expired(&mut self, now: Instant, max_age: Duration) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.stored) >= max_age)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.drop_entry(&key);
        }
    }
}

/// Bounded cache of opaque byte blobs, safe for concurrent use.
///
/// `get` refreshes an entry's recency but not its age; rewriting the
/// entry with `set` restarts the age clock.
pub struct ByteCache {
    inner: Mutex<Inner>,
    max_size: u64,
    max_age: Duration,
}

impl ByteCache {
    pub fn new(max_size: u64, max_age: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                total_bytes: 0,
                next_seq: 0,
            }),
            max_size,
            max_age,
        }
    }

    /// Look up a key. An entry past its maximum age is dropped and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let expired = match inner.entries.get(key) {
            Some(entry) => now.duration_since(entry.stored) >= self.max_age,
            None => return None,
        };
        if expired {
            inner.drop_entry(key);
            return None;
        }
        inner.touch(key);
        Some(inner.entries[key].data.clone())
    }

    /// Insert or overwrite a key, then prune expired entries and evict
    /// least-recently-used ones until total bytes fit the budget.
    pub fn set(&self, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        inner.drop_entry(key);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.total_bytes += data.len() as u64;
        inner.recency.insert(seq, key.to_owned());
        inner.entries.insert(
            key.to_owned(),
            Entry {
                data,
                stored: now,
                seq,
            },
        );

        inner.prune_expired(now, self.max_age);
        while inner.total_bytes > self.max_size {
            let oldest = match inner.recency.keys().next() {
                Some(seq) => inner.recency[seq].clone(),
                None => break,
            };
            inner.drop_entry(&oldest);
        }
    }

    /// Drop a key outright (used to retire a finished assembly slot).
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.drop_entry(key);
    }

    /// Total bytes currently held.
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().expect("cache lock poisoned").total_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_never_collide() {
        assert_ne!(
            assembly_key("GET", "http://b/x"),
            session_key("GET", "http://b/x")
        );
        assert_eq!(assembly_key("GET", "http://b/x"), "REQ GET http://b/x");
        assert_eq!(session_key("GET", "http://b/x"), "RES GET http://b/x");
    }

    #[test]
    fn get_set_remove() {
        let cache = ByteCache::new(1024, Duration::from_secs(600));
        assert_eq!(cache.get("k"), None);

        cache.set("k", Bytes::from_static(b"value"));
        assert_eq!(cache.get("k").as_deref(), Some(&b"value"[..]));
        assert_eq!(cache.total_bytes(), 5);

        cache.set("k", Bytes::from_static(b"other"));
        assert_eq!(cache.get("k").as_deref(), Some(&b"other"[..]));
        assert_eq!(cache.total_bytes(), 5);

        cache.remove("k");
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn evicts_least_recently_used_when_over_budget() {
        let cache = ByteCache::new(10, Duration::from_secs(600));
        cache.set("a", Bytes::from_static(b"aaaa"));
        cache.set("b", Bytes::from_static(b"bbbb"));

        // Touch "a" so "b" is the eviction candidate.
        assert!(cache.get("a").is_some());

        cache.set("c", Bytes::from_static(b"cccc"));
        assert!(cache.get("a").is_some());
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("c").is_some());
        assert!(cache.total_bytes() <= 10);
    }

    #[test]
    fn oversized_entry_evicts_everything_else() {
        let cache = ByteCache::new(8, Duration::from_secs(600));
        cache.set("a", Bytes::from_static(b"aaaa"));
        cache.set("big", Bytes::from_static(b"0123456789"));
        // The new entry alone exceeds the budget; nothing else survives
        // and the loop stops once the recency index is drained.
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_by_age() {
        let cache = ByteCache::new(1024, Duration::from_secs(600));
        cache.set("k", Bytes::from_static(b"value"));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rewrite_restarts_the_age_clock() {
        let cache = ByteCache::new(1024, Duration::from_secs(600));
        cache.set("k", Bytes::from_static(b"value"));

        tokio::time::advance(Duration::from_secs(500)).await;
        let blob = cache.get("k").unwrap();
        cache.set("k", blob);

        tokio::time::advance(Duration::from_secs(500)).await;
        assert!(cache.get("k").is_some(), "rewrite extended the lifetime");
    }

    #[tokio::test(start_paused = true)]
    async fn get_does_not_extend_age() {
        let cache = ByteCache::new(1024, Duration::from_secs(600));
        cache.set("k", Bytes::from_static(b"value"));

        tokio::time::advance(Duration::from_secs(400)).await;
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(400)).await;
        assert_eq!(cache.get("k"), None);
    }
}
