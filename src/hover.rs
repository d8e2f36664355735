//! Hover lifecycle and tooltip state
//!
//! One element at a time is the active hover target. Entering an element
//! looks its username up and, if the pointer is still on that same element
//! once the lookup finishes, shows a tooltip next to the pointer. Leaving
//! starts a short hide debounce so crossing an inner boundary does not
//! flicker; hiding fades the tooltip and removes it afterwards unless it was
//! shown again in the meantime.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::debug;

use crate::config::Config;
use crate::flags;
use crate::locator::Locator;
use crate::page::scanner::extract_username;
use crate::page::{ElementId, Page};

/// Pointer position in surface coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn offset(self, by: i32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    FadingOut,
}

/// Tooltip currently on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    /// Flag and location text
    pub label: String,
    /// Top-left corner
    pub position: Point,
    pub visibility: Visibility,
    /// Element the tooltip was shown for
    pub owner: ElementId,
}

/// What a pointer-enter ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// No username could be extracted from the element
    NoUsername,
    /// The username has no known location
    Unresolved,
    /// The pointer moved to another element before the lookup finished
    Stale,
    /// A tooltip is now showing this label
    Shown(String),
}

#[derive(Debug, Default)]
struct HoverState {
    active: Option<ElementId>,
    pointer: Point,
    hide_timer: Option<JoinHandle<()>>,
    tooltip: Option<Tooltip>,
    /// Bumped every time a tooltip is shown
    generation: u64,
}

/// Drives the tooltip from pointer events
#[derive(Clone)]
pub struct HoverController {
    state: Arc<Mutex<HoverState>>,
    page: Page,
    locator: Locator,
    offset: i32,
    max_depth: usize,
    hide_debounce: Duration,
    fade_duration: Duration,
}

impl HoverController {
    pub fn new(page: Page, locator: Locator, config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(HoverState::default())),
            page,
            locator,
            offset: config.tooltip_offset,
            max_depth: config.max_walk_depth,
            hide_debounce: config.hide_debounce,
            fade_duration: config.fade_duration,
        }
    }

    /// Handles the pointer entering `element` at `at`
    pub async fn on_pointer_enter(&self, element: ElementId, at: Point) -> HoverOutcome {
        self.begin_enter(element, at).await;
        self.finish_enter(element).await
    }

    /// Makes `element` the active target and cancels any pending hide
    ///
    /// This is the ordered half of an enter: it must run before any later
    /// pointer event is applied, while `finish_enter` may run concurrently.
    pub async fn begin_enter(&self, element: ElementId, at: Point) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.hide_timer.take() {
            timer.abort();
        }
        state.active = Some(element);
        state.pointer = at;
    }

    /// Looks up the username behind `element` and shows its tooltip if the
    /// pointer is still there
    pub async fn finish_enter(&self, element: ElementId) -> HoverOutcome {
        let username = {
            let doc = self.page.read().await;
            extract_username(&doc, element, self.max_depth)
        };
        let Some(username) = username else {
            self.dismiss_foreign(element).await;
            return HoverOutcome::NoUsername;
        };

        let Some(location) = self.locator.location_for(&username).await else {
            self.dismiss_foreign(element).await;
            return HoverOutcome::Unresolved;
        };

        let mut state = self.state.lock().await;
        if state.active != Some(element) {
            debug!(%username, "pointer moved on before lookup finished");
            return HoverOutcome::Stale;
        }

        let label = flags::label_for(&location);
        state.generation += 1;
        state.tooltip = Some(Tooltip {
            label: label.clone(),
            position: state.pointer.offset(self.offset),
            visibility: Visibility::Visible,
            owner: element,
        });
        HoverOutcome::Shown(label)
    }

    /// Tracks the pointer; a visible tooltip follows it
    pub async fn on_pointer_move(&self, at: Point) {
        let mut state = self.state.lock().await;
        state.pointer = at;
        if let Some(tooltip) = state.tooltip.as_mut() {
            if tooltip.visibility == Visibility::Visible {
                tooltip.position = at.offset(self.offset);
            }
        }
    }

    /// Handles the pointer leaving `element`
    pub async fn on_pointer_leave(&self, element: ElementId) {
        let mut state = self.state.lock().await;
        if state.active == Some(element) {
            state.active = None;
        }
        if let Some(timer) = state.hide_timer.take() {
            timer.abort();
        }

        let controller = self.clone();
        let debounce = self.hide_debounce;
        state.hide_timer = Some(tokio::spawn(async move {
            time::sleep(debounce).await;
            controller.hide().await;
        }));
    }

    /// Starts fading the tooltip, removing it once the fade completes
    async fn hide(&self) {
        let generation = {
            let mut state = self.state.lock().await;
            match state.tooltip.as_mut() {
                Some(tooltip) if tooltip.visibility == Visibility::Visible => {
                    tooltip.visibility = Visibility::FadingOut;
                }
                _ => return,
            }
            state.generation
        };

        let state = Arc::clone(&self.state);
        let fade = self.fade_duration;
        tokio::spawn(async move {
            time::sleep(fade).await;
            let mut state = state.lock().await;
            let still_fading = state
                .tooltip
                .as_ref()
                .is_some_and(|t| t.visibility == Visibility::FadingOut);
            if still_fading && state.generation == generation {
                state.tooltip = None;
            }
        });
    }

    /// Hides a tooltip left over from another element
    async fn dismiss_foreign(&self, element: ElementId) {
        let foreign = {
            let state = self.state.lock().await;
            state.active == Some(element)
                && state.tooltip.as_ref().is_some_and(|t| t.owner != element)
        };
        if foreign {
            self.hide().await;
        }
    }

    /// Snapshot of the tooltip for rendering
    pub async fn tooltip(&self) -> Option<Tooltip> {
        self.state.lock().await.tooltip.clone()
    }

    /// Element currently under the pointer, if any
    pub async fn active(&self) -> Option<ElementId> {
        self.state.lock().await.active
    }
}
