//! Explicit wiring of the whole pipeline
//!
//! A `Session` owns every piece of shared state: the cache and its persist
//! task, the rate limiter, the resolver bridge, the scheduler, the page
//! watcher and the hover controller. It is built once at start-up and torn
//! down with `shutdown`.

use std::sync::Arc;
use tracing::info;

use crate::bridge::{ResolverBridge, ResolverChannel};
use crate::cache::{CachePersistence, KeyValueStore, LocationCache, PersistHandle};
use crate::config::Config;
use crate::hover::HoverController;
use crate::locator::Locator;
use crate::page::scanner::Scanner;
use crate::page::watcher::WatcherHandle;
use crate::page::Page;
use crate::scheduler::{RateLimiter, Scheduler};

pub struct Session {
    pub config: Config,
    pub cache: LocationCache,
    pub limiter: RateLimiter,
    pub scheduler: Scheduler,
    pub locator: Locator,
    pub hover: HoverController,
    pub page: Page,
    pub watcher: WatcherHandle,
    persistence: CachePersistence,
    persist: PersistHandle,
}

impl Session {
    /// Loads the cache, connects to the resolver and starts watching `page`
    pub async fn start(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        channel: ResolverChannel,
        page: Page,
    ) -> Self {
        let cache = LocationCache::new(config.cache_ttl);
        let persistence = CachePersistence::new(cache.clone(), store, config.namespace.clone());
        persistence.load_from_store().await;

        let persist = PersistHandle::spawn(
            persistence.clone(),
            config.persist_debounce,
            config.persist_interval,
        );

        let limiter = RateLimiter::new(config.min_request_interval);
        let bridge = Arc::new(ResolverBridge::connect(
            channel,
            cache.clone(),
            persist.clone(),
            limiter.clone(),
            config.resolve_timeout,
        ));
        let scheduler = Scheduler::new(bridge, limiter.clone(), &config);
        let locator = Locator::new(cache.clone(), scheduler.clone());

        let watcher = WatcherHandle::spawn(
            page.clone(),
            Arc::new(Scanner::new(config.max_walk_depth)),
            config.rescan_debounce,
            config.navigation_rescan_delay,
        );
        let hover = HoverController::new(page.clone(), locator.clone(), &config);

        info!("session started");
        Self {
            config,
            cache,
            limiter,
            scheduler,
            locator,
            hover,
            page,
            watcher,
            persistence,
            persist,
        }
    }

    /// Flushes the cache, stops background tasks and invalidates the store
    pub async fn shutdown(&self) {
        self.watcher.shutdown().await;
        self.persist.shutdown().await;
        self.persistence.invalidate();
        info!("session stopped");
    }
}
