//! On-disk, time-boxed cache for POI query results.
//!
//! One JSON file per query key. Concurrent writers for the same key are
//! idempotent (the payload is reproducible from the query), so no locking
//! is used; a lost update only costs one extra live query later.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::overpass::PointOfInterest;

/// Entries older than this are treated as absent and refreshed live.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize)]
struct CachePayload {
    fetched_at: DateTime<Utc>,
    pois: Vec<PointOfInterest>,
}

/// Derives the cache key for a query: coordinates rounded to five decimals,
/// radius, and the tag filter in sorted order (`BTreeMap` iteration).
pub fn cache_key(lat: f64, lon: f64, radius_m: u32, tags: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{lat:.5}_{lon:.5}_{radius_m}"));
    for (k, v) in tags {
        hasher.update("_");
        hasher.update(k);
        hasher.update("=");
        hasher.update(v);
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct PoiCache {
    dir: PathBuf,
    ttl: Duration,
}

impl PoiCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, ttl: CACHE_TTL }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Returns the cached POI list for `key`, or `None` when the entry is
    /// missing, unreadable, malformed, or older than the TTL. Corruption is
    /// a miss, never an error.
    pub fn load(&self, key: &str) -> Option<Vec<PointOfInterest>> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).ok()?;
        let payload: CachePayload = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "corrupt poi cache entry, treating as miss");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(payload.fetched_at);
        if age.to_std().map_or(true, |age| age >= self.ttl) {
            debug!(key, "poi cache entry expired");
            return None;
        }

        debug!(key, count = payload.pois.len(), "poi cache hit");
        Some(payload.pois)
    }

    /// Writes a fresh entry for `key`. Failures are logged and swallowed;
    /// a missed write never propagates to the analysis path.
    pub fn store(&self, key: &str, pois: &[PointOfInterest]) {
        let payload = CachePayload {
            fetched_at: Utc::now(),
            pois: pois.to_vec(),
        };

        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %err, "unable to create poi cache dir");
            return;
        }

        let path = self.entry_path(key);
        match serde_json::to_string(&payload) {
            Ok(serialized) => {
                if let Err(err) = fs::write(&path, serialized) {
                    warn!(path = %path.display(), error = %err, "unable to write poi cache entry");
                } else {
                    debug!(key, count = pois.len(), "poi cache entry written");
                }
            }
            Err(err) => warn!(error = %err, "unable to serialize poi cache entry"),
        }
    }

    /// Backdates an entry's `fetched_at`, for expiry tests.
    #[cfg(test)]
    pub(crate) fn backdate(&self, key: &str, age: chrono::Duration) {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).expect("cache entry exists");
        let mut payload: CachePayload = serde_json::from_str(&raw).expect("cache entry parses");
        payload.fetched_at = Utc::now() - age;
        fs::write(&path, serde_json::to_string(&payload).expect("serializes"))
            .expect("cache entry rewritten");
    }
}
