//! Screen layout for the prompt randomizer TUI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// The main screen areas.
pub struct AppLayout {
    pub title_area: Rect,
    pub tabs_area: Rect,
    pub preview_area: Rect,
    pub cards_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    pub fn calculate(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(1), // tabs
                Constraint::Length(5), // output preview
                Constraint::Min(5),    // card grid
                Constraint::Length(1), // status line
            ])
            .split(area);

        Self {
            title_area: chunks[0],
            tabs_area: chunks[1],
            preview_area: chunks[2],
            cards_area: chunks[3],
            status_area: chunks[4],
        }
    }
}

/// A fixed-size rect centered in `area`, clamped to it.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
