//! Feed screen rendering
//!
//! Draws the page's posts top to bottom and records where each hoverable
//! element landed, so mouse positions can be mapped back to elements.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::page::scanner::is_attached;
use crate::page::{Document, ElementId};

/// Avatar glyph drawn for every post
const AVATAR: &str = "(◉)";

/// Screen regions of hoverable elements from the last draw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitMap {
    /// Outer elements first, so later regions are nested deeper
    regions: Vec<(Rect, ElementId)>,
}

impl HitMap {
    /// Records `id` at `rect` when hover listeners are attached to it
    fn push(&mut self, doc: &Document, rect: Rect, id: ElementId) {
        if is_attached(doc, id) && rect.width > 0 && rect.height > 0 {
            self.regions.push((rect, id));
        }
    }

    /// Innermost hoverable element under the given cell
    pub fn hit_test(&self, column: u16, row: u16) -> Option<ElementId> {
        self.regions
            .iter()
            .rev()
            .find(|(rect, _)| {
                column >= rect.x
                    && column < rect.x.saturating_add(rect.width)
                    && row >= rect.y
                    && row < rect.y.saturating_add(rect.height)
            })
            .map(|(_, id)| *id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn child_with_testid(doc: &Document, parent: ElementId, prefix: &str) -> Option<ElementId> {
    doc.children(parent)
        .iter()
        .copied()
        .find(|&id| doc.attribute(id, "data-testid").is_some_and(|v| v.starts_with(prefix)))
}

fn link_style(id: ElementId, hovered: Option<ElementId>, base: Style) -> Style {
    if hovered == Some(id) {
        base.add_modifier(Modifier::UNDERLINED)
    } else {
        base
    }
}

/// Renders one post starting at `y`; returns the number of rows used
fn render_post(
    frame: &mut Frame,
    doc: &Document,
    article: ElementId,
    area: Rect,
    y: u16,
    hovered: Option<ElementId>,
    hits: &mut HitMap,
) -> u16 {
    let rows = 2.min(area.bottom().saturating_sub(y));
    if rows == 0 {
        return 0;
    }
    hits.push(doc, Rect::new(area.x, y, area.width, rows), article);

    let mut x = area.x;
    let mut header = Vec::new();

    if let Some(avatar) = child_with_testid(doc, article, "UserAvatar-Container-") {
        let width = Span::raw(AVATAR).width() as u16;
        let rect = Rect::new(x, y, width.min(area.width), 1);
        hits.push(doc, rect, avatar);
        if let Some(&inner) = doc.children(avatar).first() {
            hits.push(doc, rect, inner);
        }
        header.push(Span::styled(AVATAR, Style::default().fg(Color::Cyan)));
        header.push(Span::raw(" "));
        x += width + 1;
    }

    if let Some(names) = child_with_testid(doc, article, "User-Name") {
        let start = x;
        let mut link_rects = Vec::new();
        for (i, &link) in doc.children(names).iter().enumerate() {
            let text = doc.text_content(link);
            let base = if i == 0 {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let span = Span::styled(text, link_style(link, hovered, base));
            let width = span.width() as u16;
            link_rects.push((Rect::new(x, y, width, 1), link));
            header.push(span);
            header.push(Span::raw(" "));
            x += width + 1;
        }
        let block_width = x.saturating_sub(start + 1);
        hits.push(doc, Rect::new(start, y, block_width, 1).intersection(area), names);
        for (rect, link) in link_rects {
            hits.push(doc, rect.intersection(area), link);
        }
    }

    frame.render_widget(Paragraph::new(Line::from(header)), Rect::new(area.x, y, area.width, 1));

    if rows > 1 {
        if let Some(body) = child_with_testid(doc, article, "tweetText") {
            let indent = (AVATAR.chars().count() as u16 + 1).min(area.width);
            let rect = Rect::new(area.x + indent, y + 1, area.width - indent, 1);
            frame.render_widget(Paragraph::new(doc.text_content(body)), rect);
        }
    }
    rows
}

/// Renders the feed and returns where its hoverable elements are
pub fn render(frame: &mut Frame, doc: &Document, area: Rect, hovered: Option<ElementId>) -> HitMap {
    let block = Block::default()
        .title(format!(" {} ", doc.url()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut hits = HitMap::default();
    let mut y = inner.y;
    for &child in doc.children(doc.body()) {
        if y >= inner.bottom() {
            break;
        }
        match doc.tag(child) {
            "article" => {
                let used = render_post(frame, doc, child, inner, y, hovered, &mut hits);
                // Blank line between posts
                y += used + 1;
            }
            "header" => {
                let nav = nav_labels(doc, child);
                frame.render_widget(
                    Paragraph::new(Line::from(Span::styled(nav, Style::default().fg(Color::Blue)))),
                    Rect::new(inner.x, y, inner.width, 1),
                );
                y += 2;
            }
            _ => {}
        }
    }
    hits
}

fn nav_labels(doc: &Document, header: ElementId) -> String {
    doc.descendants(header)
        .into_iter()
        .filter(|&id| doc.tag(id) == "a")
        .map(|id| doc.text_content(id))
        .collect::<Vec<_>>()
        .join("  ")
}
