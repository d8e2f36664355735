//! Tunables for the location pipeline and the hover surface
//!
//! Every delay, interval and bound used by the cache, scheduler, bridge,
//! scanner and hover controller lives here so a `Session` can be built from
//! one value.

use std::time::Duration;

/// Storage key the location cache is persisted under
pub const CACHE_NAMESPACE: &str = "x_location_cache";

/// Configuration for a `Session`
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage key for the persisted cache record
    pub namespace: String,
    /// How long a resolved location stays valid
    pub cache_ttl: chrono::Duration,
    /// Trailing-edge delay after the last cache mutation before persisting
    pub persist_debounce: Duration,
    /// Safety-net interval between unconditional persists
    pub persist_interval: Duration,
    /// Minimum spacing between two outbound resolutions
    pub min_request_interval: Duration,
    /// Pause after a dispatched request settles before the next one
    pub settle_delay: Duration,
    /// Longest single wait while a cooldown is active before re-checking it
    pub cooldown_recheck: Duration,
    /// How long the bridge waits for a correlated reply
    pub resolve_timeout: Duration,
    /// Delay between pointer-leave and the start of the tooltip fade
    pub hide_debounce: Duration,
    /// Fade duration before the tooltip is removed
    pub fade_duration: Duration,
    /// Quiet period after structural insertions before rescanning
    pub rescan_debounce: Duration,
    /// Delay before the first scan and before rescanning after navigation
    pub navigation_rescan_delay: Duration,
    /// Offset applied to the pointer position when placing the tooltip
    pub tooltip_offset: i32,
    /// How many ancestor levels username extraction inspects
    pub max_walk_depth: usize,
    /// Number of recent entries the stats view lists
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: CACHE_NAMESPACE.to_string(),
            cache_ttl: chrono::Duration::days(30),
            persist_debounce: Duration::from_secs(5),
            persist_interval: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(800),
            settle_delay: Duration::from_millis(100),
            cooldown_recheck: Duration::from_secs(60),
            resolve_timeout: Duration::from_secs(10),
            hide_debounce: Duration::from_millis(50),
            fade_duration: Duration::from_millis(300),
            rescan_debounce: Duration::from_millis(300),
            navigation_rescan_delay: Duration::from_secs(2),
            tooltip_offset: 15,
            max_walk_depth: 5,
            recent_limit: 10,
        }
    }
}
