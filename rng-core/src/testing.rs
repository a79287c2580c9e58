//! Testing utilities for the sampling engine.
//!
//! This module provides:
//! - `sample_catalog` - the static fallback dataset, also handy in tests
//! - `CategoryBuilder` - terse catalog construction for test scenarios
//! - `TestHarness` - an offline session with a seeded RNG

use crate::roll::PoolState;
use crate::session::PromptSession;
use content_api::{Category, CategoryKind, PromptItem};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The static default dataset used when the content API is unreachable.
pub fn sample_catalog() -> Vec<Category> {
    vec![
        CategoryBuilder::new(1, "subject")
            .label("Subject")
            .range(1, 1)
            .sort_order(1)
            .items(["girl", "cat", "robot"])
            .build(),
        CategoryBuilder::new(2, "style")
            .label("Style")
            .range(1, 1)
            .sort_order(2)
            .items(["oil painting", "watercolor", "cyberpunk"])
            .build(),
        CategoryBuilder::new(4, "environment")
            .label("Environment")
            .kind(CategoryKind::Group)
            .range(1, 2)
            .sort_order(3)
            .items(["forest", "city ruins", "ocean"])
            .build(),
    ]
}

/// Builder for test categories.
///
/// Item ids follow the fixture convention `category_id * 100 + position`.
#[derive(Debug, Clone)]
pub struct CategoryBuilder {
    id: i64,
    slug: String,
    label: Option<String>,
    kind: CategoryKind,
    ui_group: Option<String>,
    is_optional: Option<bool>,
    min_count: Option<u32>,
    max_count: Option<u32>,
    sort_order: Option<i64>,
    items: Vec<PromptItem>,
}

impl CategoryBuilder {
    pub fn new(id: i64, slug: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            label: None,
            kind: CategoryKind::Required,
            ui_group: None,
            is_optional: None,
            min_count: None,
            max_count: None,
            sort_order: None,
            items: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(mut self, kind: CategoryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.ui_group = Some(group.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.is_optional = Some(optional);
        self
    }

    pub fn range(mut self, min: u32, max: u32) -> Self {
        self.min_count = Some(min);
        self.max_count = Some(max);
        self
    }

    pub fn sort_order(mut self, order: i64) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn items<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| PromptItem {
                id: Some(self.id * 100 + index as i64 + 1),
                value: value.into(),
                label: None,
                is_active: None,
            })
            .collect();
        self
    }

    /// Mark one item (by value) inactive.
    pub fn deactivate(mut self, value: &str) -> Self {
        for item in &mut self.items {
            if item.value == value {
                item.is_active = Some(false);
            }
        }
        self
    }

    pub fn build(self) -> Category {
        Category {
            id: self.id,
            slug: self.slug.clone(),
            label: self.label.unwrap_or(self.slug),
            kind: self.kind,
            ui_group: self.ui_group,
            is_optional: self.is_optional,
            min_count: self.min_count,
            max_count: self.max_count,
            sort_order: self.sort_order,
            items: self.items,
        }
    }
}

/// An offline session plus a seeded RNG for deterministic scenarios.
pub struct TestHarness {
    /// The session under test.
    pub session: PromptSession,
    /// The seeded random source driving every operation.
    pub rng: StdRng,
}

impl TestHarness {
    /// Harness over the sample catalog with a fixed seed.
    pub fn new() -> Self {
        Self::with_catalog(sample_catalog(), 0xD1CE)
    }

    /// Harness over a custom catalog and seed.
    pub fn with_catalog(catalog: Vec<Category>, seed: u64) -> Self {
        Self {
            session: PromptSession::with_catalog(catalog),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Reroll the whole pool.
    pub fn roll_all(&mut self) -> &mut Self {
        self.session.roll_all_with_rng(&mut self.rng);
        self
    }

    /// Reroll one category.
    pub fn refresh(&mut self, slug: &str) -> &mut Self {
        self.session.refresh_category_with_rng(slug, &mut self.rng);
        self
    }

    /// Values currently drawn for a category.
    pub fn draw_values(&self, slug: &str) -> Vec<String> {
        self.session
            .draw(slug)
            .iter()
            .map(|item| item.value.clone())
            .collect()
    }

    /// Rendered output text.
    pub fn output(&self) -> String {
        self.session.output_text()
    }

    /// The underlying state, for assertions.
    pub fn state(&self) -> &PoolState {
        self.session.state()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_shape() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[2].slug, "environment");
        assert_eq!(catalog[2].items[0].id, Some(401));
    }

    #[test]
    fn test_harness_rolls_deterministically() {
        let mut first = TestHarness::new();
        let mut second = TestHarness::new();

        first.roll_all();
        second.roll_all();

        assert_eq!(first.draw_values("subject"), second.draw_values("subject"));
        assert_eq!(first.output(), second.output());
    }

    #[test]
    fn test_builder_defaults() {
        let cat = CategoryBuilder::new(7, "weather").build();
        assert_eq!(cat.label, "weather");
        assert_eq!(cat.kind, CategoryKind::Required);
        assert!(cat.items.is_empty());
    }
}
