//! In-memory username to location cache with per-entry expiry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A cached resolution as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resolved location, `None` if the resolver had nothing
    pub location: Option<String>,
    /// When the entry stops being valid
    #[serde(rename = "expiry", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    /// When the entry was written
    #[serde(rename = "cachedAt", with = "chrono::serde::ts_milliseconds")]
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is usable only before expiry and with a location present
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && self.location.is_some()
    }
}

/// Shared cache of resolved locations keyed by username
///
/// Expired entries are never swept; they are skipped on read and on load and
/// replaced by the next successful resolution.
#[derive(Debug, Clone)]
pub struct LocationCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl LocationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the location for `username` if a live entry exists
    pub async fn get(&self, username: &str) -> Option<String> {
        self.get_at(username, Utc::now()).await
    }

    pub async fn get_at(&self, username: &str, now: DateTime<Utc>) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(username)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.location.clone())
    }

    /// Stores `location` for `username`, valid for the cache TTL from now
    pub async fn put(&self, username: &str, location: String) {
        self.put_at(username, location, Utc::now()).await
    }

    pub async fn put_at(&self, username: &str, location: String, now: DateTime<Utc>) {
        let entry = CacheEntry {
            location: Some(location),
            expires_at: now + self.ttl,
            cached_at: now,
        };
        self.entries.write().await.insert(username.to_string(), entry);
    }

    /// Admits the live entries of a persisted record, returning how many were kept
    ///
    /// Entries that are expired, have a null location, or do not parse are
    /// dropped without error.
    pub async fn admit(&self, record: &Value, now: DateTime<Utc>) -> usize {
        let Some(map) = record.as_object() else {
            return 0;
        };

        let mut entries = self.entries.write().await;
        let mut admitted = 0;
        for (username, raw) in map {
            let Ok(entry) = serde_json::from_value::<CacheEntry>(raw.clone()) else {
                continue;
            };
            if entry.is_live(now) {
                entries.insert(username.clone(), entry);
                admitted += 1;
            }
        }
        admitted
    }

    /// Live entries suitable for persisting
    pub async fn snapshot(&self, now: DateTime<Utc>) -> HashMap<String, CacheEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(username, entry)| (username.clone(), entry.clone()))
            .collect()
    }

    /// Number of entries held, live or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
