//! Cache-first location lookup

use tracing::debug;

use crate::cache::LocationCache;
use crate::scheduler::Scheduler;

/// Answers from the cache when it can and queues a resolution otherwise
#[derive(Clone)]
pub struct Locator {
    cache: LocationCache,
    scheduler: Scheduler,
}

impl Locator {
    pub fn new(cache: LocationCache, scheduler: Scheduler) -> Self {
        Self { cache, scheduler }
    }

    /// Location for `username`, or `None` when it cannot be resolved
    ///
    /// Failures are logged and reported as `None`; nothing here is fatal.
    pub async fn location_for(&self, username: &str) -> Option<String> {
        if let Some(location) = self.cache.get(username).await {
            return Some(location);
        }

        match self.scheduler.enqueue(username).await.await {
            Ok(location) => location,
            Err(e) => {
                debug!(username, error = %e, "location lookup failed");
                None
            }
        }
    }
}
