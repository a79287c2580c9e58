//! Color theme and styling for the prompt randomizer TUI

use ratatui::style::{Color, Modifier, Style};

/// UI color theme
#[derive(Debug, Clone)]
pub struct PromptTheme {
    // Base colors
    pub border: Color,
    pub border_focused: Color,

    // Card state colors
    pub checked: Color,
    pub unchecked: Color,
    pub frozen: Color,
    pub pinned: Color,

    // Text colors
    pub label_text: Color,
    pub value_text: Color,
    pub muted_text: Color,
    pub accent: Color,
}

impl Default for PromptTheme {
    fn default() -> Self {
        Self {
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            checked: Color::Green,
            unchecked: Color::DarkGray,
            frozen: Color::Yellow,
            pinned: Color::Magenta,

            label_text: Color::White,
            value_text: Color::Cyan,
            muted_text: Color::DarkGray,
            accent: Color::LightBlue,
        }
    }
}

impl PromptTheme {
    /// Style for category labels.
    pub fn label_style(&self, checked: bool) -> Style {
        if checked {
            Style::default()
                .fg(self.label_text)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.unchecked)
                .add_modifier(Modifier::DIM)
        }
    }

    /// Style for drawn values.
    pub fn value_style(&self) -> Style {
        Style::default().fg(self.value_text)
    }

    /// Style for a pinned item marker.
    pub fn pinned_style(&self) -> Style {
        Style::default()
            .fg(self.pinned)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for a frozen card marker.
    pub fn frozen_style(&self) -> Style {
        Style::default().fg(self.frozen)
    }

    /// Style for secondary text.
    pub fn muted_style(&self) -> Style {
        Style::default()
            .fg(self.muted_text)
            .add_modifier(Modifier::DIM)
    }

    /// Border style by focus.
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Style for the selected row or item.
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }
}
