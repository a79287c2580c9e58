//! Render orchestration for the prompt randomizer TUI

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use rng_core::{catalog, quota};

use crate::app::{App, TabKind};
use crate::ui::layout::{centered_rect_fixed, AppLayout};
use crate::ui::widgets::cards::{CardRow, ItemChip};
use crate::ui::widgets::{CardListWidget, PreviewWidget};

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let layout = AppLayout::calculate(area);

    render_title_bar(frame, app, layout.title_area);
    render_tab_bar(frame, app, layout.tabs_area);

    let output = app.session.output_text();
    frame.render_widget(PreviewWidget::new(&output, &app.theme), layout.preview_area);

    let rows = card_rows(app);
    let cards = CardListWidget::new(&rows, &app.theme)
        .selection(app.selected_card, app.selected_item);
    frame.render_widget(cards, layout.cards_area);

    render_status_bar(frame, app, layout.status_area);

    if app.show_help {
        render_help_overlay(frame, app, area);
    }
}

/// Build view models for the visible categories.
fn card_rows(app: &App) -> Vec<CardRow> {
    let state = app.session.state();
    app.visible_categories()
        .into_iter()
        .map(|cat| {
            let drawn: Vec<String> = state
                .draw(&cat.slug)
                .iter()
                .map(|item| item.value.clone())
                .collect();
            let pins = state.tag_locks_for(&cat.slug);
            let range = quota::mul_range(cat);

            CardRow {
                label: cat.label.clone(),
                group: catalog::normalized_group_id(cat).to_string(),
                checked: state.is_checked(&cat.slug),
                frozen: state.is_card_locked(&cat.slug),
                qty: state.qty(&cat.slug),
                range: (range.min, range.max),
                draw: drawn.clone(),
                items: cat
                    .items
                    .iter()
                    .map(|item| ItemChip {
                        value: item.value.clone(),
                        pinned: pins.map(|keys| keys.contains(&item.key())).unwrap_or(false),
                        active: item.active(),
                        drawn: drawn.iter().any(|value| value == &item.value),
                    })
                    .collect(),
            }
        })
        .collect()
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let source = if app.session.used_fallback() {
        "built-in data"
    } else {
        "content API"
    };
    let title = format!(
        " rng-prompt | {} categories | {source} ",
        app.session.catalog().len()
    );

    let line = Line::from(Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    for (index, tab) in app.tabs.iter().enumerate() {
        let mut label = tab.label.clone();
        if let TabKind::Group(id) = &tab.kind {
            let limit = app.session.group_limit(id);
            label = format!("{label} {}-{}", limit.min, limit.max);
        }
        let style = if index == app.active_tab {
            app.theme.selected_style()
        } else {
            app.theme.muted_style()
        };
        spans.push(Span::styled(format!("[{label}]"), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let message = app
        .status_message()
        .unwrap_or("r roll | R tab | f card | space check | x freeze | t pin | ? help");
    let line = Line::from(Span::styled(
        format!(" {message}"),
        app.theme.muted_style(),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(52, 22, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            " Prompt Randomizer - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Rerolls:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  r       Reroll everything"),
        Line::from("  R       Reroll the current tab"),
        Line::from("  f       Reroll the selected card"),
        Line::from(""),
        Line::from(Span::styled(
            "Locks:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  space   Check / uncheck the selected card"),
        Line::from("  x       Freeze / unfreeze the selected card"),
        Line::from("  t       Pin / unpin the selected item"),
        Line::from("  L       Release every lock"),
        Line::from(""),
        Line::from(Span::styled(
            "Counts:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  + -     Quantity override for the selected card"),
        Line::from("  m M n N Group budget min/max steppers"),
        Line::from(""),
        Line::from(Span::styled(
            "Other:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  j k h l Navigate cards and items"),
        Line::from("  [ ]     Switch tabs, s save, q quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}
