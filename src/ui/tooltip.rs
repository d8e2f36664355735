//! Flag tooltip overlay
//!
//! Drawn last, on top of the feed, at the position the hover controller
//! chose. It is kept inside the screen and dims while fading out.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::hover::{Tooltip, Visibility};

/// Where a tooltip of `width` x `height` lands inside `area`
pub fn placement(tooltip: &Tooltip, width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let clamp = |value: i32, origin: u16, extent: u16, size: u16| -> u16 {
        let max = i32::from(origin) + i32::from(extent.saturating_sub(size));
        value.clamp(i32::from(origin), max) as u16
    };
    Rect::new(
        clamp(tooltip.position.x, area.x, area.width, width),
        clamp(tooltip.position.y, area.y, area.height, height),
        width,
        height,
    )
}

/// Renders the tooltip over whatever is already drawn
pub fn render(frame: &mut Frame, tooltip: &Tooltip) {
    let label = Span::raw(tooltip.label.as_str());
    let width = label.width() as u16 + 4;
    let rect = placement(tooltip, width, 3, frame.area());

    let style = match tooltip.visibility {
        Visibility::Visible => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        Visibility::FadingOut => Style::default().fg(Color::DarkGray),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style);

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(format!(" {}", tooltip.label)).style(style).block(block),
        rect,
    );
}
