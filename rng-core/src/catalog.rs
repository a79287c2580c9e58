//! Helpers over the content API's catalog types.
//!
//! The category list itself is fetched from the content service and is
//! read-only to the engine; everything here derives views of it (group
//! membership, optionality, sampling pools, sort order).

use content_api::{Category, CategoryKind, PromptItem};
use lazy_static::lazy_static;
use std::collections::HashSet;

/// Canonical id for the bucket of categories without a meaningful group.
pub const GENERAL_GROUP: &str = "General";

lazy_static! {
    /// Group ids that all mean "no named group".
    static ref GENERAL_GROUP_IDS: HashSet<&'static str> =
        ["Base", "Default", "General", "general", "一般"]
            .into_iter()
            .collect();
}

/// The raw group id of a category (trimmed, defaulting when absent).
pub fn group_id(category: &Category) -> &str {
    match category.ui_group.as_deref().map(str::trim) {
        Some(group) if !group.is_empty() => group,
        _ => "Default",
    }
}

/// Whether a group id is one of the general-bucket aliases.
pub fn is_general_group(group_id: &str) -> bool {
    GENERAL_GROUP_IDS.contains(group_id)
}

/// Group id with all general aliases collapsed to [`GENERAL_GROUP`].
pub fn normalized_group_id(category: &Category) -> &str {
    let id = group_id(category);
    if is_general_group(id) {
        GENERAL_GROUP
    } else {
        id
    }
}

/// Whether the category can be toggled off (explicit flag wins over kind).
pub fn is_optional(category: &Category) -> bool {
    category
        .is_optional
        .unwrap_or(category.kind == CategoryKind::Optional)
}

/// Sort key: explicit sort order, else the row id.
pub fn sort_key(category: &Category) -> i64 {
    category.sort_order.unwrap_or(category.id)
}

/// Categories in display order.
pub fn sorted(categories: &[Category]) -> Vec<&Category> {
    let mut ordered: Vec<&Category> = categories.iter().collect();
    ordered.sort_by_key(|cat| sort_key(cat));
    ordered
}

/// Look up a category by slug.
pub fn find<'a>(categories: &'a [Category], slug: &str) -> Option<&'a Category> {
    categories.iter().find(|cat| cat.slug == slug)
}

/// Items that participate in sampling.
pub fn active_items(category: &Category) -> Vec<&PromptItem> {
    category.items.iter().filter(|item| item.active()).collect()
}

/// Distinct named (non-general) group ids, in catalog order.
pub fn named_group_ids(categories: &[Category]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for cat in categories {
        let id = group_id(cat);
        if is_general_group(id) {
            continue;
        }
        if !ids.iter().any(|known| known.as_str() == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Whether any category falls into the general bucket.
pub fn has_general(categories: &[Category]) -> bool {
    categories
        .iter()
        .any(|cat| is_general_group(group_id(cat)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CategoryBuilder;

    #[test]
    fn test_group_id_defaults_and_trims() {
        let plain = CategoryBuilder::new(1, "subject").build();
        assert_eq!(group_id(&plain), "Default");
        assert_eq!(normalized_group_id(&plain), GENERAL_GROUP);

        let spaced = CategoryBuilder::new(2, "style").group("  Scene  ").build();
        assert_eq!(group_id(&spaced), "Scene");
        assert_eq!(normalized_group_id(&spaced), "Scene");
    }

    #[test]
    fn test_general_aliases() {
        for alias in ["Base", "Default", "General", "general", "一般"] {
            assert!(is_general_group(alias), "{alias} should be general");
        }
        assert!(!is_general_group("Scene"));
    }

    #[test]
    fn test_optional_override_wins() {
        let cat = CategoryBuilder::new(1, "weather")
            .kind(CategoryKind::Required)
            .optional(true)
            .build();
        assert!(is_optional(&cat));

        let cat = CategoryBuilder::new(2, "mood")
            .kind(CategoryKind::Optional)
            .build();
        assert!(is_optional(&cat));
    }

    #[test]
    fn test_sorted_uses_sort_order_then_id() {
        let categories = vec![
            CategoryBuilder::new(10, "c").build(),
            CategoryBuilder::new(2, "a").sort_order(99).build(),
            CategoryBuilder::new(5, "b").build(),
        ];
        let order: Vec<&str> = sorted(&categories)
            .into_iter()
            .map(|cat| cat.slug.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_named_group_ids_dedup_in_order() {
        let categories = vec![
            CategoryBuilder::new(1, "a").group("Scene").build(),
            CategoryBuilder::new(2, "b").build(),
            CategoryBuilder::new(3, "c").group("Cast").build(),
            CategoryBuilder::new(4, "d").group("Scene").build(),
        ];
        assert_eq!(named_group_ids(&categories), vec!["Scene", "Cast"]);
        assert!(has_general(&categories));
    }

    #[test]
    fn test_active_items_skips_disabled() {
        let cat = CategoryBuilder::new(1, "subject")
            .items(["girl", "cat", "robot"])
            .deactivate("cat")
            .build();
        let values: Vec<&str> = active_items(&cat)
            .into_iter()
            .map(|item| item.value.as_str())
            .collect();
        assert_eq!(values, vec!["girl", "robot"]);
    }
}
