//! Background rescanning of a changing page
//!
//! Subscribes to `PageChange` notifications and re-runs the scanner: once
//! after a quiet period following structural insertions, and once after a
//! delay following navigation. The first scan runs after the same delay
//! from start-up.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Duration, Instant};
use tracing::debug;

use super::scanner::Scanner;
use super::{Page, PageChange};

/// Result of one rescan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Elements attached by this scan
    pub attached: usize,
    /// Page URL at scan time
    pub url: String,
}

/// Handle for the background watcher
pub struct WatcherHandle {
    /// Reports from each completed scan
    pub reports: mpsc::UnboundedReceiver<ScanReport>,
    shutdown_tx: mpsc::Sender<()>,
}

impl WatcherHandle {
    /// Spawns the watcher
    ///
    /// # Arguments
    /// * `page` - Page to observe and scan
    /// * `scanner` - Scanner to run
    /// * `debounce` - Quiet period after insertions before rescanning
    /// * `navigation_delay` - Delay before the first scan and after each navigation
    pub fn spawn(
        page: Page,
        scanner: Arc<Scanner>,
        debounce: Duration,
        navigation_delay: Duration,
    ) -> Self {
        let (report_tx, reports) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut changes = page.subscribe();

        tokio::spawn(async move {
            let mut insertion_deadline: Option<Instant> = None;
            let mut navigation_deadline = Some(Instant::now() + navigation_delay);

            loop {
                let fire = tokio::select! {
                    change = changes.recv() => {
                        match change {
                            Ok(PageChange::NodesAdded(count)) if count > 0 => {
                                insertion_deadline = Some(Instant::now() + debounce);
                            }
                            Ok(PageChange::NodesAdded(_)) => {}
                            Ok(PageChange::Navigated(url)) => {
                                debug!(%url, "navigation detected");
                                navigation_deadline = Some(Instant::now() + navigation_delay);
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => {
                                insertion_deadline = Some(Instant::now() + debounce);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                        false
                    }
                    _ = time::sleep_until(insertion_deadline.unwrap_or_else(Instant::now)), if insertion_deadline.is_some() => {
                        insertion_deadline = None;
                        true
                    }
                    _ = time::sleep_until(navigation_deadline.unwrap_or_else(Instant::now)), if navigation_deadline.is_some() => {
                        navigation_deadline = None;
                        true
                    }
                    _ = shutdown_rx.recv() => break,
                };

                if fire {
                    let attached = scanner.scan(&page).await.len();
                    let url = page.read().await.url().to_string();
                    let _ = report_tx.send(ScanReport { attached, url });
                }
            }
        });

        Self {
            reports,
            shutdown_tx,
        }
    }

    /// Stops the watcher
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
