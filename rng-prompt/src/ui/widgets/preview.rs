//! Output preview widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::PromptTheme;

/// Shows the rendered output text and its length.
pub struct PreviewWidget<'a> {
    text: &'a str,
    theme: &'a PromptTheme,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(text: &'a str, theme: &'a PromptTheme) -> Self {
        Self { text, theme }
    }
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" Output ({} chars) ", self.text.chars().count());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        let line = if self.text.is_empty() {
            Line::from(Span::styled(
                "Nothing rolled yet - press r",
                self.theme.muted_style(),
            ))
        } else {
            Line::from(Span::styled(self.text, self.theme.value_style()))
        };

        Paragraph::new(line)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
