//! Draw state and the reroll orchestrator.
//!
//! All functions here are transitions over an explicit [`PoolState`]: they
//! take the current catalog and state, mutate the state, and never touch
//! ambient globals. Randomness comes in through the caller's `Rng` so tests
//! can drive sampling deterministically.

use crate::bag::{draw_from_bag, ShuffleBags};
use crate::catalog;
use crate::quota;
use content_api::{Category, GroupLimit, ItemKey, PromptItem};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Session-scoped sampling state, keyed by category slug throughout.
///
/// Categories the catalog no longer contains are left in place; new ones
/// get default entries via [`PoolState::init_from_catalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolState {
    /// Current selection per category.
    #[serde(default)]
    pub draws: HashMap<String, Vec<PromptItem>>,

    /// Whether a category participates in rerolls. Missing means checked.
    #[serde(default)]
    pub checked: HashMap<String, bool>,

    /// Frozen categories: their current draw survives rerolls untouched.
    #[serde(default)]
    pub card_locks: HashMap<String, bool>,

    /// Individually pinned items per category.
    #[serde(default)]
    pub tag_locks: HashMap<String, HashSet<ItemKey>>,

    /// Manual quantity overrides from the per-card stepper.
    #[serde(default)]
    pub qty_overrides: HashMap<String, u32>,

    /// Per named group, the budget on total items drawn across the group.
    #[serde(default)]
    pub group_limits: HashMap<String, GroupLimit>,
}

impl PoolState {
    /// Whether the category is checked (unknown slugs default to checked).
    pub fn is_checked(&self, slug: &str) -> bool {
        self.checked.get(slug).copied().unwrap_or(true)
    }

    /// Whether the category's draw is frozen.
    pub fn is_card_locked(&self, slug: &str) -> bool {
        self.card_locks.get(slug).copied().unwrap_or(false)
    }

    /// Pinned item keys for a category.
    pub fn tag_locks_for(&self, slug: &str) -> Option<&HashSet<ItemKey>> {
        self.tag_locks.get(slug).filter(|locks| !locks.is_empty())
    }

    /// Manual quantity override, if the stepper set one.
    pub fn qty(&self, slug: &str) -> Option<u32> {
        self.qty_overrides.get(slug).copied()
    }

    /// The current draw for a category.
    pub fn draw(&self, slug: &str) -> &[PromptItem] {
        self.draws.get(slug).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Seed default entries for categories not seen before.
    ///
    /// Existing entries are preserved; removed categories are not pruned.
    /// Stored group limits (from the persistence layer) win over the
    /// computed default for groups seen for the first time.
    pub fn init_from_catalog(
        &mut self,
        categories: &[Category],
        stored_limits: &HashMap<String, GroupLimit>,
    ) {
        if categories.is_empty() {
            return;
        }

        let mut group_counts: HashMap<String, u32> = HashMap::new();

        for cat in categories {
            self.checked.entry(cat.slug.clone()).or_insert(true);
            self.card_locks.entry(cat.slug.clone()).or_insert(false);
            self.tag_locks.entry(cat.slug.clone()).or_default();
            self.draws.entry(cat.slug.clone()).or_default();

            if cat.kind == content_api::CategoryKind::Group {
                self.qty_overrides
                    .entry(cat.slug.clone())
                    .or_insert_with(|| cat.min_count.unwrap_or(1).max(1));
            }

            if cat.items.is_empty() {
                continue;
            }
            let group_id = catalog::group_id(cat);
            if catalog::is_general_group(group_id) {
                continue;
            }
            *group_counts.entry(group_id.to_string()).or_insert(0) += 1;
        }

        for (group_id, count) in group_counts {
            if self.group_limits.contains_key(&group_id) {
                continue;
            }
            let limit = match stored_limits.get(&group_id) {
                Some(stored) => GroupLimit {
                    min: stored.min,
                    max: stored.max.max(stored.min),
                },
                None => default_group_limit(count),
            };
            self.group_limits.insert(group_id, limit);
        }
    }
}

/// Default budget for a named group with `count` item-bearing categories.
pub fn default_group_limit(count: u32) -> GroupLimit {
    let max = count.max(1);
    GroupLimit {
        min: max.min(1),
        max,
    }
}

/// Which bound of a group limit a stepper adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitBound {
    Min,
    Max,
}

// ============================================================================
// Sampler
// ============================================================================

/// Strategy for the random portion of a draw.
///
/// `Uniform` draws fresh per call (shuffle-and-slice). `Cycled` draws
/// through persisted shuffle bags, exhausting every item once before any
/// repeats; its `dirty` flag tells the owner when to write the bags back.
#[derive(Debug, Clone, Default)]
pub enum Sampler {
    #[default]
    Uniform,
    Cycled { bags: ShuffleBags, dirty: bool },
}

impl Sampler {
    /// A bag-backed sampler over previously persisted bags.
    pub fn cycled(bags: ShuffleBags) -> Self {
        Sampler::Cycled { bags, dirty: false }
    }

    /// The underlying bags, when cycled.
    pub fn bags(&self) -> Option<&ShuffleBags> {
        match self {
            Sampler::Uniform => None,
            Sampler::Cycled { bags, .. } => Some(bags),
        }
    }

    /// Whether bag state changed since the last call; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        match self {
            Sampler::Uniform => false,
            Sampler::Cycled { dirty, .. } => std::mem::take(dirty),
        }
    }

    /// Pick up to `count` distinct active items, skipping `exclude`.
    fn pick<R: Rng + ?Sized>(
        &mut self,
        category: &Category,
        count: usize,
        exclude: &HashSet<ItemKey>,
        rng: &mut R,
    ) -> Vec<PromptItem> {
        if count == 0 {
            return Vec::new();
        }
        match self {
            Sampler::Uniform => {
                let mut pool: Vec<&PromptItem> = category
                    .items
                    .iter()
                    .filter(|item| item.active() && !exclude.contains(&item.key()))
                    .collect();
                if pool.is_empty() {
                    return Vec::new();
                }
                pool.shuffle(rng);
                pool.into_iter().take(count).cloned().collect()
            }
            Sampler::Cycled { bags, dirty } => {
                let active = catalog::active_items(category);
                let draw = draw_from_bag(
                    bags,
                    &category.slug,
                    &active,
                    |item| item.key(),
                    count,
                    exclude,
                    rng,
                );
                *dirty |= draw.changed;
                draw.picked.into_iter().map(|item| (*item).clone()).collect()
            }
        }
    }
}

// ============================================================================
// Per-category draws
// ============================================================================

/// Active tag-locked items of a category, in item order.
pub fn locked_items<'a>(category: &'a Category, state: &PoolState) -> Vec<&'a PromptItem> {
    match state.tag_locks_for(&category.slug) {
        Some(locks) => category
            .items
            .iter()
            .filter(|item| item.active() && locks.contains(&item.key()))
            .collect(),
        None => Vec::new(),
    }
}

/// Build the draw for one category: pinned items first, then enough fresh
/// picks to reach the target. Locks are never evicted to satisfy a smaller
/// target, so the result can exceed it.
pub fn build_draws_for_category<R: Rng + ?Sized>(
    category: &Category,
    target: u32,
    state: &PoolState,
    sampler: &mut Sampler,
    rng: &mut R,
) -> Vec<PromptItem> {
    let locked = locked_items(category, state);
    let target = (target as usize).max(locked.len());
    if target == 0 {
        return Vec::new();
    }

    let exclude: HashSet<ItemKey> = locked.iter().map(|item| item.key()).collect();
    let needed = target - locked.len();

    let mut draws: Vec<PromptItem> = locked.into_iter().cloned().collect();
    draws.extend(sampler.pick(category, needed, &exclude, rng));
    draws
}

/// Reroll a single category from its card refresh control.
///
/// Card-locked and unchecked categories are left untouched.
pub fn refresh_category<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    slug: &str,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let Some(category) = catalog::find(categories, slug) else {
        return;
    };
    if state.is_card_locked(slug) || !state.is_checked(slug) {
        return;
    }
    let target = quota::draw_count_with_rng(category, state.qty(slug), rng);
    let draws = build_draws_for_category(category, target, state, sampler, rng);
    state.draws.insert(slug.to_string(), draws);
}

// ============================================================================
// Group rerolls
// ============================================================================

fn group_members<'a>(categories: &'a [Category], group_id: &str) -> Vec<&'a Category> {
    let general = catalog::is_general_group(group_id);
    categories
        .iter()
        .filter(|cat| {
            let id = catalog::group_id(cat);
            if general {
                catalog::is_general_group(id)
            } else {
                id == group_id
            }
        })
        .collect()
}

/// Reroll one group: the general bucket independently per category, a named
/// group under its shared budget.
pub fn refresh_group<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    group_id: &str,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let members = group_members(categories, group_id);
    if members.is_empty() {
        return;
    }
    if catalog::is_general_group(group_id) {
        refresh_general(&members, state, sampler, rng);
    } else {
        refresh_budgeted(&members, state, group_id, sampler, rng);
    }
}

fn refresh_general<R: Rng + ?Sized>(
    members: &[&Category],
    state: &mut PoolState,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    for cat in members {
        if state.is_card_locked(&cat.slug) {
            continue;
        }
        if !state.is_checked(&cat.slug) {
            state.draws.insert(cat.slug.clone(), Vec::new());
            continue;
        }
        let target = quota::draw_count_with_rng(cat, state.qty(&cat.slug), rng);
        let draws = build_draws_for_category(cat, target, state, sampler, rng);
        state.draws.insert(cat.slug.clone(), draws);
    }
}

/// The budgeted reroll for a named group.
///
/// Every category first contributes its locked count. Unlocked, checked
/// categories with active items then offer extra slots: up to their
/// individually desired count into the preferred pool, the rest of their
/// capacity into the fallback pool. A total budget is drawn from the
/// configured group limit clamped into `[totalLocked, totalLocked +
/// capacity]`; the preferred pool fills first and fallback only covers the
/// shortfall, so each category approaches its own desired count before
/// spare capacity is spread to hit the group target.
fn refresh_budgeted<R: Rng + ?Sized>(
    members: &[&Category],
    state: &mut PoolState,
    group_id: &str,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let limit = state
        .group_limits
        .get(group_id)
        .copied()
        .unwrap_or_else(|| default_group_limit(members.len() as u32));
    let min = limit.min;
    let max = limit.max.max(min);

    let mut locked_counts: HashMap<&str, u32> = HashMap::new();
    let mut preferred: Vec<&str> = Vec::new();
    let mut fallback: Vec<&str> = Vec::new();
    let mut total_locked: u32 = 0;

    for cat in members {
        let locked = locked_items(cat, state).len() as u32;
        let current = state.draw(&cat.slug).len() as u32;
        let locked_count = if state.is_card_locked(&cat.slug) {
            current.max(locked)
        } else if state.is_checked(&cat.slug) {
            locked
        } else {
            0
        };
        locked_counts.insert(cat.slug.as_str(), locked_count);
        total_locked += locked_count;

        if !state.is_checked(&cat.slug) || state.is_card_locked(&cat.slug) {
            continue;
        }
        if !cat.items.iter().any(|item| item.active()) {
            continue;
        }

        let effective_max = state
            .qty(&cat.slug)
            .unwrap_or_else(|| quota::mul_range(cat).max);
        let available = effective_max.saturating_sub(locked_count);
        if available == 0 {
            continue;
        }

        let desired = quota::draw_count_with_rng(cat, state.qty(&cat.slug), rng);
        let wanted = desired.saturating_sub(locked_count).min(available);
        for _ in 0..wanted {
            preferred.push(cat.slug.as_str());
        }
        for _ in 0..(available - wanted) {
            fallback.push(cat.slug.as_str());
        }
    }

    let capacity = (preferred.len() + fallback.len()) as u32;
    let max_budget = total_locked + capacity;
    let min_budget = total_locked.max(min.min(max_budget));
    let upper_budget = min_budget.max(max.min(max_budget));
    let target_budget = if upper_budget <= min_budget {
        min_budget
    } else {
        rng.gen_range(min_budget..=upper_budget)
    };
    let remain = target_budget.saturating_sub(total_locked) as usize;

    debug!(
        group = group_id,
        total_locked, capacity, target_budget, "group reroll budget"
    );

    // Fallback only covers what the preferred pool cannot; the preferred
    // pool is never discarded in its favour.
    let mut pool: Vec<&str> = if remain > preferred.len() {
        preferred.iter().chain(fallback.iter()).copied().collect()
    } else {
        preferred.clone()
    };
    pool.shuffle(rng);

    let mut tallies: HashMap<&str, u32> = HashMap::new();
    for slug in pool.into_iter().take(remain) {
        *tallies.entry(slug).or_insert(0) += 1;
    }

    for cat in members {
        if state.is_card_locked(&cat.slug) {
            // Frozen draws persist; only an empty one with pending pins is
            // backfilled.
            if state.draw(&cat.slug).is_empty() {
                let locked = locked_items(cat, state);
                if !locked.is_empty() {
                    state
                        .draws
                        .insert(cat.slug.clone(), locked.into_iter().cloned().collect());
                }
            }
            continue;
        }

        let locked_count = locked_counts.get(cat.slug.as_str()).copied().unwrap_or(0);
        let extra = tallies.get(cat.slug.as_str()).copied().unwrap_or(0);
        let target = locked_count + extra;

        if (!state.is_checked(&cat.slug) && locked_count == 0) || target == 0 {
            state.draws.insert(cat.slug.clone(), Vec::new());
            continue;
        }

        let draws = build_draws_for_category(cat, target, state, sampler, rng);
        state.draws.insert(cat.slug.clone(), draws);
    }
}

/// Reroll the whole pool: every distinct named group, then the general
/// bucket. Groups are independent; the general bucket goes last for UI
/// stability only.
pub fn roll_all<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    for group_id in catalog::named_group_ids(categories) {
        refresh_group(categories, state, &group_id, sampler, rng);
    }
    if catalog::has_general(categories) {
        refresh_group(categories, state, catalog::GENERAL_GROUP, sampler, rng);
    }
}

// ============================================================================
// Check / lock / quantity transitions
// ============================================================================

/// Check or uncheck one category. Unchecking clears its draw; checking an
/// unlocked category with an empty draw fills it.
pub fn toggle_checked<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    slug: &str,
    checked: bool,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    state.checked.insert(slug.to_string(), checked);
    let Some(category) = catalog::find(categories, slug) else {
        return;
    };
    if !checked {
        state.draws.insert(slug.to_string(), Vec::new());
        return;
    }
    if state.is_card_locked(slug) {
        return;
    }
    if state.draw(slug).is_empty() {
        let target = quota::draw_count_with_rng(category, state.qty(slug), rng);
        let draws = build_draws_for_category(category, target, state, sampler, rng);
        state.draws.insert(slug.to_string(), draws);
    }
}

/// Bulk-check the optional categories of one group.
pub fn toggle_group_checked<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    group_id: &str,
    checked: bool,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let slugs: Vec<String> = group_members(categories, group_id)
        .into_iter()
        .filter(|cat| catalog::is_optional(cat))
        .map(|cat| cat.slug.clone())
        .collect();
    toggle_bulk(categories, state, &slugs, checked, sampler, rng);
}

/// Bulk-check every optional category in the pool.
pub fn toggle_all_optional<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    checked: bool,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let slugs: Vec<String> = categories
        .iter()
        .filter(|cat| catalog::is_optional(cat))
        .map(|cat| cat.slug.clone())
        .collect();
    toggle_bulk(categories, state, &slugs, checked, sampler, rng);
}

fn toggle_bulk<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    slugs: &[String],
    checked: bool,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    for slug in slugs {
        state.checked.insert(slug.clone(), checked);
    }
    for slug in slugs {
        let Some(category) = catalog::find(categories, slug) else {
            continue;
        };
        if !checked {
            state.draws.insert(slug.clone(), Vec::new());
            continue;
        }
        if state.is_card_locked(slug) || !state.draw(slug).is_empty() {
            continue;
        }
        let target = quota::draw_count_with_rng(category, state.qty(slug), rng);
        let draws = build_draws_for_category(category, target, state, sampler, rng);
        state.draws.insert(slug.clone(), draws);
    }
}

/// Freeze or unfreeze a category's current draw.
pub fn toggle_card_lock(state: &mut PoolState, slug: &str) {
    let locked = state.is_card_locked(slug);
    state.card_locks.insert(slug.to_string(), !locked);
}

/// Pin or unpin one item of a category.
///
/// Pinning pulls the pinned set into the draw immediately (even on a frozen
/// card, matching the manual gesture). Unpinning rerolls an unlocked,
/// checked category and clears an unchecked one.
pub fn toggle_tag_lock<R: Rng + ?Sized>(
    categories: &[Category],
    state: &mut PoolState,
    slug: &str,
    key: ItemKey,
    sampler: &mut Sampler,
    rng: &mut R,
) {
    let Some(category) = catalog::find(categories, slug) else {
        return;
    };
    if !category.items.iter().any(|item| item.key() == key) {
        return;
    }

    let locks = state.tag_locks.entry(slug.to_string()).or_default();
    let removing = locks.contains(&key);
    if removing {
        locks.remove(&key);
    } else {
        locks.insert(key);
    }

    if !removing {
        let pinned: Vec<PromptItem> = locked_items(category, state)
            .into_iter()
            .cloned()
            .collect();
        state.draws.insert(slug.to_string(), pinned);
        return;
    }

    if !state.is_checked(slug) {
        state.draws.insert(slug.to_string(), Vec::new());
        return;
    }
    if state.is_card_locked(slug) {
        return;
    }
    let target = quota::draw_count_with_rng(category, state.qty(slug), rng);
    let draws = build_draws_for_category(category, target, state, sampler, rng);
    state.draws.insert(slug.to_string(), draws);
}

/// Release every card lock and every tag lock.
pub fn unlock_all(state: &mut PoolState) {
    for locked in state.card_locks.values_mut() {
        *locked = false;
    }
    for locks in state.tag_locks.values_mut() {
        locks.clear();
    }
}

/// Set a manual quantity override.
pub fn set_qty(state: &mut PoolState, slug: &str, qty: u32) {
    state.qty_overrides.insert(slug.to_string(), qty);
}

/// Step a manual quantity override, floored at zero.
pub fn change_qty(state: &mut PoolState, slug: &str, delta: i32) {
    let current = state.qty(slug).unwrap_or(0) as i64;
    let next = (current + delta as i64).max(0) as u32;
    state.qty_overrides.insert(slug.to_string(), next);
}

/// Set a group limit, restoring `max >= min`.
pub fn set_group_limit(state: &mut PoolState, group_id: &str, limit: GroupLimit) {
    let normalized = GroupLimit {
        min: limit.min,
        max: limit.max.max(limit.min),
    };
    state.group_limits.insert(group_id.to_string(), normalized);
}

/// Step one bound of a group limit; the other bound is dragged along so the
/// pair stays ordered.
pub fn change_group_limit(state: &mut PoolState, group_id: &str, bound: LimitBound, delta: i32) {
    let current = state
        .group_limits
        .get(group_id)
        .copied()
        .unwrap_or(GroupLimit { min: 0, max: 0 });
    let mut min = current.min as i64;
    let mut max = current.max as i64;

    match bound {
        LimitBound::Min => {
            min = (min + delta as i64).max(0);
            if min > max {
                max = min;
            }
        }
        LimitBound::Max => {
            max = (max + delta as i64).max(0);
            if max < min {
                min = max;
            }
        }
    }

    state.group_limits.insert(
        group_id.to_string(),
        GroupLimit {
            min: min as u32,
            max: max as u32,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_catalog, CategoryBuilder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene_catalog() -> Vec<Category> {
        vec![
            CategoryBuilder::new(1, "weather")
                .group("Scene")
                .range(0, 2)
                .items(["sunny", "rain", "storm", "fog"])
                .build(),
            CategoryBuilder::new(2, "terrain")
                .group("Scene")
                .range(0, 2)
                .items(["forest", "desert", "coast"])
                .build(),
            CategoryBuilder::new(3, "time")
                .group("Scene")
                .range(0, 1)
                .items(["dawn", "dusk"])
                .build(),
        ]
    }

    fn init(categories: &[Category]) -> PoolState {
        let mut state = PoolState::default();
        state.init_from_catalog(categories, &HashMap::new());
        state
    }

    #[test]
    fn test_init_defaults() {
        let catalog = sample_catalog();
        let state = init(&catalog);

        assert!(state.is_checked("subject"));
        assert!(!state.is_card_locked("subject"));
        assert!(state.tag_locks_for("subject").is_none());
        // Group-kind categories get a quantity override seeded from min.
        assert_eq!(state.qty("environment"), Some(1));
        assert_eq!(state.qty("subject"), None);
    }

    #[test]
    fn test_init_group_limit_default_and_stored() {
        let catalog = scene_catalog();

        let state = init(&catalog);
        assert_eq!(
            state.group_limits.get("Scene"),
            Some(&GroupLimit { min: 1, max: 3 })
        );

        let stored: HashMap<String, GroupLimit> =
            [("Scene".to_string(), GroupLimit { min: 2, max: 1 })]
                .into_iter()
                .collect();
        let mut state = PoolState::default();
        state.init_from_catalog(&catalog, &stored);
        // Stored limits win but are re-normalized.
        assert_eq!(
            state.group_limits.get("Scene"),
            Some(&GroupLimit { min: 2, max: 2 })
        );
    }

    #[test]
    fn test_build_draws_meets_override_target() {
        // The environment scenario: min 1, max 2, override 2, no locks.
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        set_qty(&mut state, "environment", 2);

        let cat = catalog::find(&catalog, "environment").unwrap();
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(17);

        let target = quota::draw_count_with_rng(cat, state.qty("environment"), &mut rng);
        assert_eq!(target, 2);
        let draws = build_draws_for_category(cat, target, &state, &mut sampler, &mut rng);

        assert_eq!(draws.len(), 2);
        let unique: HashSet<ItemKey> = draws.iter().map(|item| item.key()).collect();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_locks_survive_and_exceed_target() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        state
            .tag_locks
            .get_mut("environment")
            .unwrap()
            .extend([ItemKey::Id(401), ItemKey::Id(403)]);

        let cat = catalog::find(&catalog, "environment").unwrap();
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(5);

        // Target below the lock count: locks are never evicted.
        let draws = build_draws_for_category(cat, 1, &state, &mut sampler, &mut rng);
        assert_eq!(draws.len(), 2);
        let keys: HashSet<ItemKey> = draws.iter().map(|item| item.key()).collect();
        assert!(keys.contains(&ItemKey::Id(401)));
        assert!(keys.contains(&ItemKey::Id(403)));

        // Locks come first in the result.
        let lock_keys: HashSet<ItemKey> = [ItemKey::Id(401), ItemKey::Id(403)].into_iter().collect();
        assert!(lock_keys.contains(&draws[0].key()));
        assert!(lock_keys.contains(&draws[1].key()));
    }

    #[test]
    fn test_refresh_category_respects_guards() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(1);

        // Card-locked: untouched.
        state.card_locks.insert("subject".to_string(), true);
        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert!(state.draw("subject").is_empty());

        // Unchecked: untouched too.
        state.card_locks.insert("subject".to_string(), false);
        state.checked.insert("subject".to_string(), false);
        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert!(state.draw("subject").is_empty());

        // Checked and unlocked: draws.
        state.checked.insert("subject".to_string(), true);
        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert_eq!(state.draw("subject").len(), 1);
    }

    #[test]
    fn test_general_refresh_is_independent() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(2);

        state.checked.insert("style".to_string(), false);
        refresh_group(
            &catalog,
            &mut state,
            catalog::GENERAL_GROUP,
            &mut sampler,
            &mut rng,
        );

        assert_eq!(state.draw("subject").len(), 1);
        assert!(state.draw("style").is_empty());
    }

    #[test]
    fn test_budgeted_group_respects_limits() {
        let catalog = scene_catalog();
        let mut rng = StdRng::seed_from_u64(23);

        for _ in 0..50 {
            let mut state = init(&catalog);
            set_group_limit(&mut state, "Scene", GroupLimit { min: 2, max: 3 });
            let mut sampler = Sampler::Uniform;
            refresh_group(&catalog, &mut state, "Scene", &mut sampler, &mut rng);

            let total: usize = ["weather", "terrain", "time"]
                .iter()
                .map(|slug| state.draw(slug).len())
                .sum();
            assert!((2..=3).contains(&total), "total {total} outside budget");
        }
    }

    #[test]
    fn test_budgeted_group_counts_locked_draws() {
        let catalog = scene_catalog();
        let mut rng = StdRng::seed_from_u64(31);

        for _ in 0..50 {
            let mut state = init(&catalog);
            set_group_limit(&mut state, "Scene", GroupLimit { min: 0, max: 2 });

            // Freeze weather with a two-item draw already in place.
            let weather = catalog::find(&catalog, "weather").unwrap();
            state.draws.insert(
                "weather".to_string(),
                weather.items[..2].to_vec(),
            );
            state.card_locks.insert("weather".to_string(), true);

            let mut sampler = Sampler::Uniform;
            refresh_group(&catalog, &mut state, "Scene", &mut sampler, &mut rng);

            // The frozen draw survives verbatim.
            assert_eq!(state.draw("weather").len(), 2);
            assert_eq!(state.draw("weather")[0].value, "sunny");

            // Locked contribution already fills the budget.
            let extra = state.draw("terrain").len() + state.draw("time").len();
            assert_eq!(extra, 0, "budget exceeded by {extra} extra items");
        }
    }

    #[test]
    fn test_budgeted_group_keeps_tag_locks() {
        let catalog = scene_catalog();
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..50 {
            let mut state = init(&catalog);
            set_group_limit(&mut state, "Scene", GroupLimit { min: 1, max: 2 });
            let terrain_key = ItemKey::Id(202);
            state
                .tag_locks
                .get_mut("terrain")
                .unwrap()
                .insert(terrain_key.clone());

            let mut sampler = Sampler::Uniform;
            refresh_group(&catalog, &mut state, "Scene", &mut sampler, &mut rng);

            let keys: HashSet<ItemKey> =
                state.draw("terrain").iter().map(|item| item.key()).collect();
            assert!(keys.contains(&terrain_key), "pinned item evicted");
        }
    }

    #[test]
    fn test_budget_clamps_to_capacity() {
        let catalog = vec![CategoryBuilder::new(1, "weather")
            .group("Scene")
            .range(0, 1)
            .items(["sunny"])
            .build()];
        let mut state = init(&catalog);
        // Budget far above what one single-item category can provide.
        set_group_limit(&mut state, "Scene", GroupLimit { min: 5, max: 9 });

        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(8);
        refresh_group(&catalog, &mut state, "Scene", &mut sampler, &mut rng);

        assert_eq!(state.draw("weather").len(), 1);
    }

    #[test]
    fn test_roll_all_covers_groups_then_general() {
        let mut catalog = scene_catalog();
        catalog.extend(sample_catalog());
        let mut state = init(&catalog);
        set_group_limit(&mut state, "Scene", GroupLimit { min: 3, max: 3 });

        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(77);
        roll_all(&catalog, &mut state, &mut sampler, &mut rng);

        let scene_total: usize = ["weather", "terrain", "time"]
            .iter()
            .map(|slug| state.draw(slug).len())
            .sum();
        assert_eq!(scene_total, 3);
        assert_eq!(state.draw("subject").len(), 1);
        assert_eq!(state.draw("style").len(), 1);
    }

    #[test]
    fn test_toggle_checked_clears_and_refills() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(4);

        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert!(!state.draw("subject").is_empty());

        toggle_checked(&catalog, &mut state, "subject", false, &mut sampler, &mut rng);
        assert!(state.draw("subject").is_empty());
        assert!(!state.is_checked("subject"));

        toggle_checked(&catalog, &mut state, "subject", true, &mut sampler, &mut rng);
        assert_eq!(state.draw("subject").len(), 1);
    }

    #[test]
    fn test_toggle_tag_lock_pins_and_releases() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        let mut sampler = Sampler::Uniform;
        let mut rng = StdRng::seed_from_u64(6);

        toggle_tag_lock(
            &catalog,
            &mut state,
            "subject",
            ItemKey::Id(102),
            &mut sampler,
            &mut rng,
        );
        assert_eq!(state.draw("subject").len(), 1);
        assert_eq!(state.draw("subject")[0].key(), ItemKey::Id(102));
        assert!(state.tag_locks_for("subject").is_some());

        // A reroll keeps the pin.
        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert!(state
            .draw("subject")
            .iter()
            .any(|item| item.key() == ItemKey::Id(102)));

        // Releasing rerolls freely.
        toggle_tag_lock(
            &catalog,
            &mut state,
            "subject",
            ItemKey::Id(102),
            &mut sampler,
            &mut rng,
        );
        assert!(state.tag_locks_for("subject").is_none());
        assert_eq!(state.draw("subject").len(), 1);
    }

    #[test]
    fn test_unlock_all() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        state.card_locks.insert("subject".to_string(), true);
        state
            .tag_locks
            .get_mut("style")
            .unwrap()
            .insert(ItemKey::Id(201));

        unlock_all(&mut state);
        assert!(!state.is_card_locked("subject"));
        assert!(state.tag_locks_for("style").is_none());
    }

    #[test]
    fn test_change_group_limit_drags_bounds() {
        let mut state = PoolState::default();
        change_group_limit(&mut state, "Scene", LimitBound::Min, 2);
        assert_eq!(
            state.group_limits["Scene"],
            GroupLimit { min: 2, max: 2 }
        );

        change_group_limit(&mut state, "Scene", LimitBound::Max, -1);
        assert_eq!(
            state.group_limits["Scene"],
            GroupLimit { min: 1, max: 1 }
        );

        change_group_limit(&mut state, "Scene", LimitBound::Min, -5);
        assert_eq!(
            state.group_limits["Scene"],
            GroupLimit { min: 0, max: 1 }
        );
    }

    #[test]
    fn test_change_qty_floors_at_zero() {
        let mut state = PoolState::default();
        change_qty(&mut state, "subject", -3);
        assert_eq!(state.qty("subject"), Some(0));
        change_qty(&mut state, "subject", 2);
        assert_eq!(state.qty("subject"), Some(2));
    }

    #[test]
    fn test_cycled_sampler_marks_dirty() {
        let catalog = sample_catalog();
        let mut state = init(&catalog);
        let mut sampler = Sampler::cycled(ShuffleBags::new());
        let mut rng = StdRng::seed_from_u64(99);

        refresh_category(&catalog, &mut state, "subject", &mut sampler, &mut rng);
        assert!(sampler.take_dirty());
        assert!(!sampler.take_dirty());
        assert_eq!(sampler.bags().map(|bags| bags.len()), Some(1));
    }
}
