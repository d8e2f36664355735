//! Rate-limited, coalescing location request scheduler
//!
//! All outbound resolutions go through one FIFO queue drained by a single
//! task. The drain loop waits out any server-imposed cooldown, keeps a
//! minimum spacing between dispatches, sends exactly one request at a time
//! and pauses briefly after each one settles. Concurrent lookups for the
//! same username share one pending future.

pub mod rate_limit;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{self, Duration};
use tracing::debug;

use crate::bridge::BridgeError;
use crate::config::Config;
pub use rate_limit::{RateLimitState, RateLimiter};

/// Outcome of a single resolution
pub type Resolution = Result<Option<String>, BridgeError>;

/// A pending lookup, cloneable so every caller for a username awaits the same result
pub type Lookup = Shared<BoxFuture<'static, Resolution>>;

/// Something that can turn a username into a location
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Resolution;
}

/// A queued resolution waiting for dispatch
struct QueueItem {
    username: String,
    reply: oneshot::Sender<Resolution>,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<QueueItem>,
    pending: HashMap<String, Lookup>,
    draining: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    resolver: Arc<dyn LocationResolver>,
    limiter: RateLimiter,
    settle_delay: Duration,
    cooldown_recheck: Duration,
}

/// Serializes resolutions behind the rate limiter
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(resolver: Arc<dyn LocationResolver>, limiter: RateLimiter, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                resolver,
                limiter,
                settle_delay: config.settle_delay,
                cooldown_recheck: config.cooldown_recheck,
            }),
        }
    }

    /// Queues a resolution for `username`, or joins the one already pending
    pub async fn enqueue(&self, username: &str) -> Lookup {
        let mut state = self.inner.state.lock().await;
        if let Some(lookup) = state.pending.get(username) {
            debug!(username, "joining pending lookup");
            return lookup.clone();
        }

        let (reply, rx) = oneshot::channel();
        let lookup = rx
            .map(|result| result.unwrap_or(Err(BridgeError::Disconnected)))
            .boxed()
            .shared();

        state.pending.insert(username.to_string(), lookup.clone());
        state.queue.push_back(QueueItem {
            username: username.to_string(),
            reply,
        });
        debug!(username, queued = state.queue.len(), "queued location lookup");

        if !state.draining {
            state.draining = true;
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }

        lookup
    }

    /// Number of lookups waiting for dispatch
    pub async fn queue_len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    pub async fn is_draining(&self) -> bool {
        self.inner.state.lock().await.draining
    }
}

/// Dispatches queued items one at a time until the queue is empty
async fn drain(inner: Arc<Inner>) {
    loop {
        {
            let mut state = inner.state.lock().await;
            if state.queue.is_empty() {
                state.draining = false;
                return;
            }
        }

        wait_until_ready(&inner).await;

        // Only this task pops, so the item checked above is still there
        let Some(item) = inner.state.lock().await.queue.pop_front() else {
            continue;
        };

        inner.limiter.record_dispatch().await;
        debug!(username = %item.username, "dispatching location lookup");
        let result = inner.resolver.resolve(&item.username).await;

        inner.state.lock().await.pending.remove(&item.username);
        let _ = item.reply.send(result);

        time::sleep(inner.settle_delay).await;
    }
}

/// Sleeps through any cooldown, then through the remaining dispatch spacing
async fn wait_until_ready(inner: &Inner) {
    loop {
        if let Some(wait) = inner.limiter.cooldown_remaining().await {
            debug!(wait_ms = wait.as_millis() as u64, "cooldown active; draining paused");
            time::sleep(wait.min(inner.cooldown_recheck)).await;
            continue;
        }
        match inner.limiter.spacing_remaining().await {
            Some(wait) => time::sleep(wait).await,
            None => return,
        }
    }
}
