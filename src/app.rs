//! Application state for the flagtip terminal host
//!
//! The `App` plays the browser's part: it owns the simulated page through a
//! `Session`, turns mouse movement into pointer enter, move and leave events
//! on the elements under the cursor, and mutates the page on key presses so
//! the watcher has insertions and navigations to react to.

use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::feed::{self, FeedPost, ROUTES};
use crate::hover::{HoverController, Point, Tooltip};
use crate::page::ElementId;
use crate::session::Session;
use crate::ui::HitMap;

/// Everything besides the document needed to draw one frame
#[derive(Debug, Clone)]
pub struct View {
    pub tooltip: Option<Tooltip>,
    /// Element under the mouse, if hoverable
    pub hovered: Option<ElementId>,
    /// Entries in the location cache
    pub cached: usize,
    /// Lookups waiting to be sent
    pub queued: usize,
    /// Remaining rate-limit cooldown
    pub cooldown: Option<Duration>,
    pub show_help: bool,
}

/// Pointer transitions, applied strictly in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerEvent {
    Enter(ElementId, Point),
    Move(Point),
    Leave(ElementId),
}

/// Applies pointer events from one task so a later leave can never overtake
/// an earlier enter
///
/// Lookups run in their own tasks once the enter has been recorded, so a
/// slow resolution never holds back the events behind it.
fn spawn_pointer_events(hover: HoverController) -> mpsc::UnboundedSender<PointerEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PointerEvent::Enter(element, at) => {
                    hover.begin_enter(element, at).await;
                    let hover = hover.clone();
                    tokio::spawn(async move {
                        let outcome = hover.finish_enter(element).await;
                        debug!(?element, ?outcome, "hover finished");
                    });
                }
                PointerEvent::Move(at) => hover.on_pointer_move(at).await,
                PointerEvent::Leave(element) => hover.on_pointer_leave(element).await,
            }
        }
    });
    tx
}

/// Main application struct
pub struct App {
    pub session: Session,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    posts: Vec<FeedPost>,
    /// Next post `l` appends
    next_post: usize,
    /// Index into `ROUTES` of the current page
    route: usize,
    hits: HitMap,
    hovered: Option<ElementId>,
    pointer: mpsc::UnboundedSender<PointerEvent>,
}

impl App {
    pub fn new(session: Session, posts: Vec<FeedPost>) -> Self {
        let pointer = spawn_pointer_events(session.hover.clone());
        Self {
            session,
            should_quit: false,
            show_help: false,
            posts,
            next_post: 0,
            route: 0,
            hits: HitMap::default(),
            hovered: None,
            pointer,
        }
    }

    /// Snapshot for rendering
    pub async fn view(&self) -> View {
        let cooldown = self
            .session
            .limiter
            .state()
            .await
            .cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .filter(|wait| !wait.is_zero());

        View {
            tooltip: self.session.hover.tooltip().await,
            hovered: self.hovered,
            cached: self.session.cache.len().await,
            queued: self.session.scheduler.queue_len().await,
            cooldown,
            show_help: self.show_help,
        }
    }

    /// Stores where hoverable elements were drawn in the last frame
    pub fn set_hits(&mut self, hits: HitMap) {
        self.hits = hits;
    }

    pub fn hovered(&self) -> Option<ElementId> {
        self.hovered
    }

    /// Handles keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Esc | KeyCode::Char('?') => self.show_help = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('l') => self.load_more().await,
            KeyCode::Char('g') => self.navigate().await,
            _ => {}
        }
    }

    /// Handles mouse input; only movement matters for hovering
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.pointer_at(mouse.column, mouse.row);
            }
            _ => {}
        }
    }

    /// Dispatches hover events for the pointer now at (`column`, `row`)
    ///
    /// Leaving the previous element always precedes entering the next one.
    pub fn pointer_at(&mut self, column: u16, row: u16) {
        let target = self.hits.hit_test(column, row);
        let previous = std::mem::replace(&mut self.hovered, target);
        let at = Point::new(i32::from(column), i32::from(row));

        if previous == target {
            self.send_pointer(PointerEvent::Move(at));
            return;
        }
        if let Some(element) = previous {
            self.send_pointer(PointerEvent::Leave(element));
        }
        match target {
            Some(element) => self.send_pointer(PointerEvent::Enter(element, at)),
            None => self.send_pointer(PointerEvent::Move(at)),
        }
    }

    fn send_pointer(&self, event: PointerEvent) {
        if self.pointer.send(event).is_err() {
            debug!(?event, "pointer task gone; event dropped");
        }
    }

    /// Appends the next post to the feed
    async fn load_more(&mut self) {
        let Some(post) = self.posts.get(self.next_post % self.posts.len().max(1)) else {
            return;
        };
        self.next_post += 1;
        let page = &self.session.page;
        let body = page.read().await.body();
        page.insert(body, feed::post_node(post)).await;
    }

    /// Moves to the next route, replacing the page content
    async fn navigate(&mut self) {
        self.route = (self.route + 1) % ROUTES.len();
        let url = format!("https://x.com/{}", ROUTES[self.route]);

        if let Some(element) = self.hovered.take() {
            self.send_pointer(PointerEvent::Leave(element));
        }
        self.hits = HitMap::default();

        // Each route shows the feed rotated so content visibly changes
        let mut posts = self.posts.clone();
        if !posts.is_empty() {
            let shift = self.route % posts.len();
            posts.rotate_left(shift);
        }
        self.session
            .page
            .navigate(&url, feed::page_content(&posts))
            .await;
    }
}
