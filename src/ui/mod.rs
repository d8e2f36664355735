//! UI rendering for flagtip
//!
//! Lays out the feed, the status line and the overlays (tooltip and help)
//! with ratatui. Rendering borrows the page's document alongside an
//! `app::View` snapshot and reports where the hoverable elements were drawn.

pub mod feed;
pub mod help_overlay;
pub mod tooltip;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::View;
use crate::page::Document;
pub use feed::HitMap;

/// Renders the whole screen and returns the hover regions
pub fn render(frame: &mut Frame, document: &Document, view: &View) -> HitMap {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let hits = feed::render(frame, document, chunks[0], view.hovered);
    render_status(frame, view, chunks[1]);

    if let Some(tip) = &view.tooltip {
        tooltip::render(frame, tip);
    }
    if view.show_help {
        help_overlay::render(frame);
    }
    hits
}

/// Status line: cache size, queue depth and any active cooldown
fn render_status(frame: &mut Frame, view: &View, area: Rect) {
    let mut spans = vec![
        Span::styled(
            format!(" cached: {} ", view.cached),
            Style::default().fg(Color::Green),
        ),
        Span::raw(format!(" queued: {} ", view.queued)),
    ];
    if let Some(wait) = view.cooldown {
        spans.push(Span::styled(
            format!(" rate limited, resuming in {}s ", wait.as_secs()),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(
        " l: more  g: navigate  ?: help  q: quit",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
