//! Main application state and logic

use std::path::PathBuf;

use rng_core::catalog;
use rng_core::{Category, LimitBound, PromptSession};

use crate::ui::theme::PromptTheme;

/// What a tab shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabKind {
    /// Every category.
    All,
    /// One named group.
    Group(String),
    /// The general bucket.
    General,
}

/// One entry in the tab bar.
#[derive(Debug, Clone)]
pub struct Tab {
    pub label: String,
    pub kind: TabKind,
}

/// Main application state
pub struct App {
    pub session: PromptSession,
    pub theme: PromptTheme,

    // Tab bar
    pub tabs: Vec<Tab>,
    pub active_tab: usize,

    // Card grid selection
    pub selected_card: usize,
    pub selected_item: usize,

    // UI state
    pub show_help: bool,
    pub should_quit: bool,
    pub pending_save: Option<PathBuf>,
    status_message: Option<String>,
    status_ticks: u16,
}

impl App {
    pub fn new(session: PromptSession) -> Self {
        let tabs = build_tabs(session.catalog());
        let mut app = Self {
            session,
            theme: PromptTheme::default(),
            tabs,
            active_tab: 0,
            selected_card: 0,
            selected_item: 0,
            show_help: false,
            should_quit: false,
            pending_save: None,
            status_message: None,
            status_ticks: 0,
        };

        if app.session.used_fallback() {
            app.set_status("Content API unreachable - using built-in dataset");
        } else {
            app.set_status("Press r to roll, ? for help");
        }
        app
    }

    /// Categories visible under the active tab, in display order.
    pub fn visible_categories(&self) -> Vec<&Category> {
        let kind = match self.tabs.get(self.active_tab) {
            Some(tab) => tab.kind.clone(),
            None => TabKind::All,
        };

        catalog::sorted(self.session.catalog())
            .into_iter()
            .filter(|cat| match &kind {
                TabKind::All => true,
                TabKind::Group(id) => catalog::group_id(cat) == id.as_str(),
                TabKind::General => catalog::is_general_group(catalog::group_id(cat)),
            })
            .collect()
    }

    /// The currently selected category, if any.
    pub fn selected_category(&self) -> Option<&Category> {
        self.visible_categories().get(self.selected_card).copied()
    }

    fn selected_slug(&self) -> Option<String> {
        self.selected_category().map(|cat| cat.slug.clone())
    }

    /// Keep card and item selection inside the visible range.
    pub fn clamp_selection(&mut self) {
        let cards = self.visible_categories().len();
        if cards == 0 {
            self.selected_card = 0;
            self.selected_item = 0;
            return;
        }
        self.selected_card = self.selected_card.min(cards - 1);
        let items = self
            .selected_category()
            .map(|cat| cat.items.len())
            .unwrap_or(0);
        self.selected_item = self.selected_item.min(items.saturating_sub(1));
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn next_tab(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        self.active_tab = (self.active_tab + 1) % self.tabs.len();
        self.selected_card = 0;
        self.selected_item = 0;
    }

    pub fn prev_tab(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        self.active_tab = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
        self.selected_card = 0;
        self.selected_item = 0;
    }

    pub fn select_next_card(&mut self) {
        self.selected_card = self.selected_card.saturating_add(1);
        self.selected_item = 0;
        self.clamp_selection();
    }

    pub fn select_prev_card(&mut self) {
        self.selected_card = self.selected_card.saturating_sub(1);
        self.selected_item = 0;
        self.clamp_selection();
    }

    pub fn select_next_item(&mut self) {
        self.selected_item = self.selected_item.saturating_add(1);
        self.clamp_selection();
    }

    pub fn select_prev_item(&mut self) {
        self.selected_item = self.selected_item.saturating_sub(1);
        self.clamp_selection();
    }

    // ========================================================================
    // Engine operations
    // ========================================================================

    pub fn roll_all(&mut self) {
        self.session.roll_all();
        self.set_status("Rolled everything");
    }

    /// Reroll whatever the active tab shows.
    pub fn refresh_tab(&mut self) {
        let kind = self
            .tabs
            .get(self.active_tab)
            .map(|tab| tab.kind.clone())
            .unwrap_or(TabKind::All);
        match kind {
            TabKind::All => self.roll_all(),
            TabKind::Group(id) => {
                self.session.refresh_group(&id);
                self.set_status(format!("Rerolled group {id}"));
            }
            TabKind::General => {
                self.session.refresh_group(catalog::GENERAL_GROUP);
                self.set_status("Rerolled general categories");
            }
        }
    }

    pub fn refresh_selected(&mut self) {
        let Some(slug) = self.selected_slug() else {
            return;
        };
        self.session.refresh_category(&slug);
        self.set_status(format!("Rerolled {slug}"));
    }

    pub fn toggle_checked_selected(&mut self) {
        let Some(slug) = self.selected_slug() else {
            return;
        };
        let next = !self.session.state().is_checked(&slug);
        self.session.toggle_checked(&slug, next);
    }

    pub fn toggle_card_lock_selected(&mut self) {
        let Some(slug) = self.selected_slug() else {
            return;
        };
        self.session.toggle_card_lock(&slug);
        let locked = self.session.state().is_card_locked(&slug);
        self.set_status(if locked {
            format!("Froze {slug}")
        } else {
            format!("Unfroze {slug}")
        });
    }

    pub fn toggle_tag_lock_selected(&mut self) {
        let Some(key) = self
            .selected_category()
            .and_then(|cat| cat.items.get(self.selected_item))
            .map(|item| item.key())
        else {
            return;
        };
        let Some(slug) = self.selected_slug() else {
            return;
        };
        self.session.toggle_tag_lock(&slug, key);
    }

    pub fn unlock_all(&mut self) {
        self.session.unlock_all();
        self.set_status("Released every lock");
    }

    pub fn change_qty_selected(&mut self, delta: i32) {
        let Some(slug) = self.selected_slug() else {
            return;
        };
        self.session.change_qty(&slug, delta);
        let qty = self.session.state().qty(&slug).unwrap_or(0);
        self.set_status(format!("{slug} quantity: {qty}"));
    }

    pub fn change_limit(&mut self, bound: LimitBound, delta: i32) {
        let TabKind::Group(id) = self
            .tabs
            .get(self.active_tab)
            .map(|tab| tab.kind.clone())
            .unwrap_or(TabKind::All)
        else {
            self.set_status("Group budgets apply on group tabs only");
            return;
        };
        self.session.change_group_limit(&id, bound, delta);
        let limit = self.session.group_limit(&id);
        self.set_status(format!("{id} budget: {}-{}", limit.min, limit.max));
    }

    pub fn request_save(&mut self) {
        self.pending_save = Some(PathBuf::from("rng_session.json"));
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_ticks = 0;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Advance idle animations; stale status messages fade out.
    pub fn tick(&mut self) {
        if self.status_message.is_some() {
            self.status_ticks = self.status_ticks.saturating_add(1);
            if self.status_ticks > 80 {
                self.status_message = None;
            }
        }
    }
}

/// All / named groups / General, mirroring the catalog.
fn build_tabs(categories: &[Category]) -> Vec<Tab> {
    let mut tabs = vec![Tab {
        label: "All".to_string(),
        kind: TabKind::All,
    }];

    for group_id in catalog::named_group_ids(categories) {
        let has_items = categories.iter().any(|cat| {
            catalog::group_id(cat) == group_id && !cat.items.is_empty()
        });
        if has_items {
            tabs.push(Tab {
                label: group_id.clone(),
                kind: TabKind::Group(group_id),
            });
        }
    }

    let general_has_items = categories
        .iter()
        .any(|cat| catalog::is_general_group(catalog::group_id(cat)) && !cat.items.is_empty());
    if general_has_items {
        tabs.push(Tab {
            label: "General".to_string(),
            kind: TabKind::General,
        });
    }

    tabs
}
