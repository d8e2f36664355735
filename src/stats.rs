//! Summary of the persisted location cache
//!
//! Reads the stored record directly rather than going through a live
//! `LocationCache`, so it works while no session is running.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Write as _;

use crate::cache::{CacheEntry, KeyValueStore, StoreError};
use crate::flags;

/// Shown when nothing has been cached yet
pub const EMPTY_HINT: &str = "No profiles cached yet. Hover over usernames to resolve their locations!";

/// One line of the recent-entries list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub username: String,
    pub location: String,
    pub flag: &'static str,
    pub cached_at: DateTime<Utc>,
}

/// Counts and recent entries of the persisted cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live entries
    pub total: usize,
    /// Most recently cached live entries, newest first
    pub recent: Vec<RecentEntry>,
}

impl CacheStats {
    /// Loads stats for the record stored under `namespace`
    pub fn load(
        store: &dyn KeyValueStore,
        namespace: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Self, StoreError> {
        Ok(match store.get(namespace)? {
            Some(record) => Self::from_record(&record, now, limit),
            None => Self::default(),
        })
    }

    /// Builds stats from a raw record, ignoring malformed and dead entries
    pub fn from_record(record: &Value, now: DateTime<Utc>, limit: usize) -> Self {
        let Some(map) = record.as_object() else {
            return Self::default();
        };

        let mut live: Vec<(String, CacheEntry)> = map
            .iter()
            .filter_map(|(username, raw)| {
                let entry: CacheEntry = serde_json::from_value(raw.clone()).ok()?;
                entry.is_live(now).then(|| (username.clone(), entry))
            })
            .collect();
        live.sort_by(|a, b| b.1.cached_at.cmp(&a.1.cached_at));

        let total = live.len();
        let recent = live
            .into_iter()
            .take(limit)
            .filter_map(|(username, entry)| {
                let location = entry.location?;
                Some(RecentEntry {
                    flag: flags::flag_for(&location),
                    username,
                    location,
                    cached_at: entry.cached_at,
                })
            })
            .collect();

        Self { total, recent }
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        let mut out = format!("Cached profiles: {}\n", self.total);
        if self.recent.is_empty() {
            out.push_str(EMPTY_HINT);
            out.push('\n');
            return out;
        }

        out.push_str("\nRecent:\n");
        let width = self
            .recent
            .iter()
            .map(|e| e.username.chars().count() + 1)
            .max()
            .unwrap_or(0);
        for entry in &self.recent {
            let handle = format!("@{}", entry.username);
            let _ = writeln!(out, "  {:<width$}  {} {}", handle, entry.flag, entry.location);
        }
        out
    }
}
