//! Event handling for the prompt randomizer TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use rng_core::LimitBound;

use crate::app::App;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.select_prev_card();
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.select_next_card();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.show_help {
        return handle_help_key(app, key);
    }

    match key.code {
        KeyCode::Char('q') => EventResult::Quit,
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }

        // Rerolls
        KeyCode::Char('r') => {
            app.roll_all();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('R') => {
            app.refresh_tab();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('f') => {
            app.refresh_selected();
            EventResult::NeedsRedraw
        }

        // Checks and locks
        KeyCode::Char(' ') | KeyCode::Enter => {
            app.toggle_checked_selected();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('x') => {
            app.toggle_card_lock_selected();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('t') => {
            app.toggle_tag_lock_selected();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('L') => {
            app.unlock_all();
            EventResult::NeedsRedraw
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next_card();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_prev_card();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('l') | KeyCode::Right => {
            app.select_next_item();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('h') | KeyCode::Left => {
            app.select_prev_item();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(']') | KeyCode::Tab => {
            app.next_tab();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('[') | KeyCode::BackTab => {
            app.prev_tab();
            EventResult::NeedsRedraw
        }

        // Quantity stepper
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.change_qty_selected(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('-') => {
            app.change_qty_selected(-1);
            EventResult::NeedsRedraw
        }

        // Group budget steppers
        KeyCode::Char('m') => {
            app.change_limit(LimitBound::Min, -1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('M') => {
            app.change_limit(LimitBound::Min, 1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('n') => {
            app.change_limit(LimitBound::Max, -1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('N') => {
            app.change_limit(LimitBound::Max, 1);
            EventResult::NeedsRedraw
        }

        // Persistence
        KeyCode::Char('s') => {
            app.request_save();
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

fn handle_help_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}
