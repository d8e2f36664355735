//! Request/response bridge to the location resolver
//!
//! The resolver lives on the other side of a message channel. Every request
//! carries a fresh request id and only a reply with the same username and id
//! completes it. A request with no reply inside the timeout resolves to
//! `None`. Rate-limited replies are never cached and push the reset time
//! into the shared `RateLimiter`; out-of-band `rateLimitInfo` notices do the
//! same whenever they arrive.

pub mod peer;
pub mod protocol;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{self, Duration};
use tracing::{debug, warn};

use crate::cache::{LocationCache, PersistHandle};
use crate::scheduler::{LocationResolver, RateLimiter, Resolution};
pub use protocol::{InboundMessage, LocationResponse, OutboundMessage};

/// Errors that end a resolution without an answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The resolver side of the channel has gone away
    #[error("resolver channel disconnected")]
    Disconnected,

    /// The resolver transport reported a failure
    #[error("resolver transport failed: {0}")]
    Transport(String),
}

/// Our end of the resolver channel
#[derive(Debug)]
pub struct ResolverChannel {
    pub outbound: mpsc::UnboundedSender<OutboundMessage>,
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// The resolver's end of the channel
#[derive(Debug)]
pub struct PeerEnd {
    pub requests: mpsc::UnboundedReceiver<OutboundMessage>,
    pub replies: mpsc::UnboundedSender<InboundMessage>,
}

impl ResolverChannel {
    /// Creates a connected channel pair
    pub fn pair() -> (ResolverChannel, PeerEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            ResolverChannel {
                outbound: out_tx,
                inbound: in_rx,
            },
            PeerEnd {
                requests: out_rx,
                replies: in_tx,
            },
        )
    }
}

type Waiters = Arc<Mutex<HashMap<(String, u64), oneshot::Sender<LocationResponse>>>>;

/// Correlates resolver requests with their replies
pub struct ResolverBridge {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    waiters: Waiters,
    next_request_id: AtomicU64,
    cache: LocationCache,
    persist: PersistHandle,
    limiter: RateLimiter,
    timeout: Duration,
}

impl ResolverBridge {
    /// Connects to a resolver and starts routing its replies
    pub fn connect(
        channel: ResolverChannel,
        cache: LocationCache,
        persist: PersistHandle,
        limiter: RateLimiter,
        timeout: Duration,
    ) -> Self {
        let waiters: Waiters = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(route_replies(
            channel.inbound,
            Arc::clone(&waiters),
            limiter.clone(),
        ));

        Self {
            outbound: channel.outbound,
            waiters,
            next_request_id: AtomicU64::new(1),
            cache,
            persist,
            limiter,
            timeout,
        }
    }

    /// Asks the resolver for `username`'s location
    ///
    /// # Returns
    /// * `Ok(Some(location))` - the resolver found a location
    /// * `Ok(None)` - no location known, or no reply before the timeout
    /// * `Err(BridgeError::Disconnected)` - the resolver channel is closed
    pub async fn resolve(&self, username: &str) -> Resolution {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let key = (username.to_string(), request_id);

        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(key.clone(), tx);

        let request = OutboundMessage::FetchLocation {
            screen_name: username.to_string(),
            request_id,
        };
        if self.outbound.send(request).is_err() {
            self.waiters.lock().await.remove(&key);
            return Err(BridgeError::Disconnected);
        }

        let response = match time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(BridgeError::Disconnected),
            Err(_) => {
                self.waiters.lock().await.remove(&key);
                debug!(username, request_id, "location request timed out");
                return Ok(None);
            }
        };

        if response.is_rate_limited {
            if let Some(reset_time) = response.reset_time {
                self.limiter.cooldown_until_epoch(reset_time).await;
            }
            return Ok(response.location);
        }

        if let Some(location) = &response.location {
            self.cache.put(username, location.clone()).await;
            self.persist.touch();
        }
        Ok(response.location)
    }
}

#[async_trait]
impl LocationResolver for ResolverBridge {
    async fn resolve(&self, username: &str) -> Resolution {
        ResolverBridge::resolve(self, username).await
    }
}

/// Delivers each reply to the request waiting for exactly that username and id
async fn route_replies(
    mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
    waiters: Waiters,
    limiter: RateLimiter,
) {
    while let Some(message) = inbound.recv().await {
        match message {
            InboundMessage::RateLimitInfo { reset_time, .. } => {
                limiter.cooldown_until_epoch(reset_time).await;
            }
            InboundMessage::LocationResponse(response) => {
                let key = (response.screen_name.clone(), response.request_id);
                match waiters.lock().await.remove(&key) {
                    Some(waiter) => {
                        let _ = waiter.send(response);
                    }
                    None => debug!(
                        username = %response.screen_name,
                        request_id = response.request_id,
                        "dropping uncorrelated location response"
                    ),
                }
            }
        }
    }

    // Dropping the waiters wakes every pending request with a disconnect
    let orphaned = {
        let mut waiters = waiters.lock().await;
        let count = waiters.len();
        waiters.clear();
        count
    };
    if orphaned > 0 {
        warn!(orphaned, "resolver channel closed with requests in flight");
    }
}
