//! Rendered-result cache.
//!
//! Keys are content hashes of everything that determines the output, so two
//! requests for the same page of the same bytes share one render. The cache
//! is best-effort: a miss or a failed write means the caller recomputes, never
//! that the request fails. Concurrent misses on the same key each render.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Key-value store for rendered outputs.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` for `ttl`. Failures are the implementation's to log.
    fn set(&self, key: &str, bytes: &[u8], ttl: Duration);
}

/// `"{folder}/{sha256(parts)}.{extension}"`.
///
/// Parts are length-prefixed before hashing so `["ab", "c"]` and
/// `["a", "bc"]` get different keys.
pub fn cache_key(folder: &str, parts: &[&[u8]], extension: &str) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    format!("{}/{}.{}", folder, hex::encode(hasher.finalize()), extension)
}

/// In-process [`ResultCache`] with per-entry expiry.
///
/// Every write first drops the entries whose TTL has passed, so memory held
/// by one-off keys is released on the next store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Instant, Vec<u8>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|(expires, _)| *expires > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("Cache lock poisoned; treating {} as a miss", key);
                return None;
            }
        };
        match entries.get(key) {
            Some((expires, bytes)) if *expires > Instant::now() => {
                debug!("Cache hit: {}", key);
                Some(bytes.clone())
            }
            Some(_) => {
                debug!("Cache entry expired: {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, bytes: &[u8], ttl: Duration) {
        match self.entries.lock() {
            Ok(mut entries) => {
                let now = Instant::now();
                let before = entries.len();
                entries.retain(|_, (expires, _)| *expires > now);
                if entries.len() < before {
                    debug!("Evicted {} expired cache entries", before - entries.len());
                }
                entries.insert(key.to_string(), (now + ttl, bytes.to_vec()));
            }
            Err(_) => warn!("Cache lock poisoned; dropping write for {}", key),
        }
    }
}
