//! Loading and saving the location cache
//!
//! `CachePersistence` moves the cache to and from a `KeyValueStore`. The
//! `PersistHandle` task owns the write schedule: a trailing debounce after
//! each mutation plus a fixed interval as a safety net, so a burst of
//! resolutions turns into a single write.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::location::LocationCache;
use super::store::{KeyValueStore, StoreError};

/// Binds a cache to the store record it is persisted under
#[derive(Clone)]
pub struct CachePersistence {
    cache: LocationCache,
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl CachePersistence {
    pub fn new(cache: LocationCache, store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            cache,
            store,
            namespace: namespace.into(),
        }
    }

    /// Reads the persisted record and admits its live entries
    ///
    /// Failures are logged and otherwise ignored; the cache simply starts empty.
    pub async fn load_from_store(&self) {
        let record = match self.store.get(&self.namespace) {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(e) => return report("load", e),
        };

        let admitted = self.cache.admit(&record, Utc::now()).await;
        info!(count = admitted, "loaded cached locations");
    }

    /// Writes every live entry back to the store
    pub async fn persist(&self) {
        let snapshot = self.cache.snapshot(Utc::now()).await;
        let count = snapshot.len();

        let result = serde_json::to_value(&snapshot)
            .map_err(StoreError::from)
            .and_then(|record| self.store.set(&self.namespace, &record));

        match result {
            Ok(()) => debug!(count, "persisted location cache"),
            Err(e) => report("save", e),
        }
    }

    /// Invalidates the underlying store
    pub fn invalidate(&self) {
        self.store.invalidate();
    }
}

/// Logs a store failure unless the host context is going away
fn report(operation: &str, err: StoreError) {
    if err.is_context_invalidated() {
        return;
    }
    warn!(error = %err, "failed to {} location cache", operation);
}

/// Signals understood by the persist task
#[derive(Debug)]
enum PersistSignal {
    /// The cache changed; restart the debounce window
    Touched,
    /// Write now and acknowledge
    Flush(oneshot::Sender<()>),
    /// Write once more and stop
    Shutdown(oneshot::Sender<()>),
}

/// Handle for scheduling writes of the location cache
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistSignal>,
}

impl PersistHandle {
    /// Spawns the persist task
    ///
    /// # Arguments
    /// * `persistence` - What to write
    /// * `debounce` - Quiet period after the last mutation before writing
    /// * `interval` - Period of unconditional writes
    pub fn spawn(persistence: CachePersistence, debounce: Duration, interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            ticker.tick().await;

            let mut deadline: Option<Instant> = None;

            loop {
                tokio::select! {
                    signal = rx.recv() => match signal {
                        Some(PersistSignal::Touched) => {
                            deadline = Some(Instant::now() + debounce);
                        }
                        Some(PersistSignal::Flush(ack)) => {
                            deadline = None;
                            persistence.persist().await;
                            let _ = ack.send(());
                        }
                        Some(PersistSignal::Shutdown(ack)) => {
                            persistence.persist().await;
                            let _ = ack.send(());
                            break;
                        }
                        None => {
                            persistence.persist().await;
                            break;
                        }
                    },
                    _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        deadline = None;
                        persistence.persist().await;
                    }
                    _ = ticker.tick() => {
                        persistence.persist().await;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Records a cache mutation; a write follows once mutations stop for the debounce window
    pub fn touch(&self) {
        let _ = self.tx.send(PersistSignal::Touched);
    }

    /// Writes immediately and waits for the write to finish
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(PersistSignal::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Performs a final write and stops the task
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(PersistSignal::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{FileStore, MemoryStore};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    const NAMESPACE: &str = "x_location_cache";

    fn setup() -> (LocationCache, Arc<MemoryStore>, CachePersistence) {
        let cache = LocationCache::new(ChronoDuration::days(30));
        let store = Arc::new(MemoryStore::default());
        let persistence = CachePersistence::new(cache.clone(), store.clone(), NAMESPACE);
        (cache, store, persistence)
    }

    fn stored_count(store: &MemoryStore) -> usize {
        store
            .get(NAMESPACE)
            .unwrap()
            .and_then(|v| v.as_object().map(|m| m.len()))
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_persist_and_reload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf()));

        let cache = LocationCache::new(ChronoDuration::days(30));
        cache.put("jdoe", "Canada".to_string()).await;
        CachePersistence::new(cache, store.clone(), NAMESPACE).persist().await;

        let restored = LocationCache::new(ChronoDuration::days(30));
        CachePersistence::new(restored.clone(), store, NAMESPACE)
            .load_from_store()
            .await;

        assert_eq!(restored.get("jdoe").await.as_deref(), Some("Canada"));
    }

    #[tokio::test]
    async fn test_reload_drops_entries_past_ttl() {
        let (_, store, _) = setup();
        let now = Utc::now();
        let cached_at = now - ChronoDuration::days(30) - ChronoDuration::seconds(1);
        store
            .set(
                NAMESPACE,
                &json!({"stale": {
                    "location": "Italy",
                    "expiry": (cached_at + ChronoDuration::days(30)).timestamp_millis(),
                    "cachedAt": cached_at.timestamp_millis(),
                }}),
            )
            .unwrap();

        let cache = LocationCache::new(ChronoDuration::days(30));
        CachePersistence::new(cache.clone(), store, NAMESPACE)
            .load_from_store()
            .await;

        assert!(cache.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn test_load_errors_are_swallowed() {
        let (cache, store, persistence) = setup();
        store.invalidate();

        persistence.load_from_store().await;
        persistence.persist().await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_cache_in_memory() {
        let (cache, store, persistence) = setup();
        store.fail_writes.store(true, Ordering::SeqCst);

        cache.put("alice", "Norway".to_string()).await;
        persistence.persist().await;

        assert_eq!(cache.get("alice").await.as_deref(), Some("Norway"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_touches_writes_once_after_debounce() {
        let (cache, store, persistence) = setup();
        let handle = PersistHandle::spawn(
            persistence,
            Duration::from_secs(5),
            Duration::from_secs(30),
        );

        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            cache.put(name, format!("Place {}", i)).await;
            handle.touch();
            time::sleep(Duration::from_secs(1)).await;
        }

        // 2s after the last touch: still inside the debounce window
        assert_eq!(stored_count(&store), 0);

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(stored_count(&store), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_writes_without_touch() {
        let (cache, store, persistence) = setup();
        let _handle = PersistHandle::spawn(
            persistence,
            Duration::from_secs(5),
            Duration::from_secs(30),
        );

        cache.put("quiet", "Kenya".to_string()).await;
        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(stored_count(&store), 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(stored_count(&store), 1);
    }

    #[tokio::test]
    async fn test_flush_and_shutdown_write_immediately() {
        let (cache, store, persistence) = setup();
        let handle = PersistHandle::spawn(
            persistence,
            Duration::from_secs(5),
            Duration::from_secs(30),
        );

        cache.put("alice", "Egypt".to_string()).await;
        handle.flush().await;
        assert_eq!(stored_count(&store), 1);

        cache.put("bob", "Chile".to_string()).await;
        handle.shutdown().await;
        assert_eq!(stored_count(&store), 2);

        // The task has stopped; further calls are no-ops
        handle.flush().await;
    }
}
