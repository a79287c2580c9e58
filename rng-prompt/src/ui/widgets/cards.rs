//! Category card list widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::PromptTheme;

/// One selectable item chip on a card.
pub struct ItemChip {
    pub value: String,
    pub pinned: bool,
    pub active: bool,
    pub drawn: bool,
}

/// View model for one category card.
pub struct CardRow {
    pub label: String,
    pub group: String,
    pub checked: bool,
    pub frozen: bool,
    pub qty: Option<u32>,
    pub range: (u32, u32),
    pub draw: Vec<String>,
    pub items: Vec<ItemChip>,
}

/// Renders the visible category cards with selection markers.
pub struct CardListWidget<'a> {
    rows: &'a [CardRow],
    theme: &'a PromptTheme,
    selected_card: usize,
    selected_item: usize,
}

const LINES_PER_CARD: usize = 4;

impl<'a> CardListWidget<'a> {
    pub fn new(rows: &'a [CardRow], theme: &'a PromptTheme) -> Self {
        Self {
            rows,
            theme,
            selected_card: 0,
            selected_item: 0,
        }
    }

    pub fn selection(mut self, card: usize, item: usize) -> Self {
        self.selected_card = card;
        self.selected_item = item;
        self
    }

    fn header_line(&self, row: &CardRow, selected: bool) -> Line<'_> {
        let mut spans = vec![
            Span::styled(
                if row.checked { "[x] " } else { "[ ] " },
                if row.checked {
                    ratatui::style::Style::default().fg(self.theme.checked)
                } else {
                    self.theme.muted_style()
                },
            ),
            Span::styled(
                row.label.clone(),
                if selected {
                    self.theme.selected_style()
                } else {
                    self.theme.label_style(row.checked)
                },
            ),
            Span::styled(format!("  ({})", row.group), self.theme.muted_style()),
        ];

        let (min, max) = row.range;
        let quota = match row.qty {
            Some(qty) => format!("  qty {qty}"),
            None => format!("  {min}-{max}"),
        };
        spans.push(Span::styled(quota, self.theme.muted_style()));

        if row.frozen {
            spans.push(Span::styled("  [frozen]", self.theme.frozen_style()));
        }

        Line::from(spans)
    }

    fn draw_line(&self, row: &CardRow) -> Line<'_> {
        if row.draw.is_empty() {
            return Line::from(Span::styled("    - empty -", self.theme.muted_style()));
        }
        Line::from(vec![
            Span::raw("    "),
            Span::styled(row.draw.join(", "), self.theme.value_style()),
        ])
    }

    fn items_line(&self, row: &CardRow, selected: bool) -> Line<'_> {
        let mut spans = vec![Span::raw("    ")];
        for (index, chip) in row.items.iter().enumerate() {
            let mut style = if chip.pinned {
                self.theme.pinned_style()
            } else if !chip.active {
                self.theme.muted_style()
            } else if chip.drawn {
                self.theme.value_style()
            } else {
                self.theme.label_style(true)
            };
            if selected && index == self.selected_item {
                style = style.add_modifier(ratatui::style::Modifier::REVERSED);
            }

            let marker = if chip.pinned { "*" } else { "" };
            spans.push(Span::styled(format!("{marker}{}", chip.value), style));
            if index + 1 < row.items.len() {
                spans.push(Span::raw("  "));
            }
        }
        Line::from(spans)
    }
}

impl Widget for CardListWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Categories ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.rows.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "No categories in this tab",
                self.theme.muted_style(),
            )))
            .render(inner, buf);
            return;
        }

        // Keep the selected card in view.
        let visible_cards = (inner.height as usize / LINES_PER_CARD).max(1);
        let start = self
            .selected_card
            .saturating_sub(visible_cards.saturating_sub(1));

        let mut lines: Vec<Line> = Vec::new();
        for (offset, row) in self.rows.iter().enumerate().skip(start) {
            let selected = offset == self.selected_card;
            lines.push(self.header_line(row, selected));
            lines.push(self.draw_line(row));
            lines.push(self.items_line(row, selected));
            lines.push(Line::from(""));
            if lines.len() >= inner.height as usize {
                break;
            }
        }

        Paragraph::new(lines).render(inner, buf);
    }
}
