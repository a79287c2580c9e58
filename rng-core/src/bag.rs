//! Without-replacement cyclic sampler ("shuffle bag").
//!
//! Each bag holds a full permutation of the currently active item keys plus
//! a cursor. Draws read sequentially from the permutation and reshuffle a
//! fresh one on exhaustion, so every key is seen once before any repeats.
//! Bags survive across sessions; callers persist the map when a draw
//! reports a change.

use content_api::ItemKey;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One bag: a permutation of item keys and a cursor into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BagState {
    #[serde(default)]
    pub order: Vec<ItemKey>,
    #[serde(default)]
    pub index: usize,
}

/// All bags, keyed by pool (typically a category slug).
pub type ShuffleBags = HashMap<String, BagState>;

/// Outcome of one bag draw.
#[derive(Debug)]
pub struct BagDraw<'a, T> {
    /// Picked items, in draw order.
    pub picked: Vec<&'a T>,
    /// Whether the stored bag state was replaced and should be persisted.
    pub changed: bool,
}

/// A stored permutation is only valid if it is an exact set match (same
/// keys, no duplicates) for the current active key set.
fn has_same_members(active: &[ItemKey], order: &[ItemKey]) -> bool {
    if active.len() != order.len() {
        return false;
    }
    let set: HashSet<&ItemKey> = active.iter().collect();
    if set.len() != active.len() {
        return false;
    }
    order.iter().all(|key| set.contains(key))
}

fn fresh_permutation<R: Rng + ?Sized>(keys: &[ItemKey], rng: &mut R) -> Vec<ItemKey> {
    let mut order = keys.to_vec();
    order.shuffle(rng);
    order
}

/// Draw up to `count` distinct items from the bag for `bag_key`.
///
/// `items` is authoritative for membership: a stale stored permutation is
/// discarded and regenerated. Keys in `exclude`, keys already picked in
/// this call, and keys absent from `items` are skipped. If exclusions make
/// `count` unsatisfiable the draw returns short rather than erroring; the
/// attempt bound is twice the active key count.
pub fn draw_from_bag<'a, T, K, R>(
    bags: &mut ShuffleBags,
    bag_key: &str,
    items: &'a [T],
    key_of: K,
    count: usize,
    exclude: &HashSet<ItemKey>,
    rng: &mut R,
) -> BagDraw<'a, T>
where
    K: Fn(&T) -> ItemKey,
    R: Rng + ?Sized,
{
    if count == 0 || items.is_empty() {
        return BagDraw {
            picked: Vec::new(),
            changed: false,
        };
    }

    let mut item_map: HashMap<ItemKey, &T> = HashMap::with_capacity(items.len());
    let mut active_keys: Vec<ItemKey> = Vec::with_capacity(items.len());
    for item in items {
        let key = key_of(item);
        active_keys.push(key.clone());
        item_map.insert(key, item);
    }

    let stored = bags.get(bag_key);
    let mut bag = match stored {
        Some(current) if has_same_members(&active_keys, &current.order) => {
            let mut bag = current.clone();
            bag.index = bag.index.min(bag.order.len());
            bag
        }
        _ => BagState {
            order: fresh_permutation(&active_keys, rng),
            index: 0,
        },
    };

    let mut picked: Vec<&T> = Vec::new();
    let mut seen: HashSet<ItemKey> = HashSet::new();
    let max_attempts = active_keys.len() * 2;
    let mut attempts = 0;

    while picked.len() < count && attempts < max_attempts {
        if bag.index >= bag.order.len() {
            bag.order = fresh_permutation(&active_keys, rng);
            bag.index = 0;
        }
        let key = bag.order[bag.index].clone();
        bag.index += 1;
        attempts += 1;

        if exclude.contains(&key) || seen.contains(&key) {
            continue;
        }
        let Some(item) = item_map.get(&key) else {
            continue;
        };
        picked.push(*item);
        seen.insert(key);
    }

    let changed = bags.get(bag_key) != Some(&bag);
    if changed {
        bags.insert(bag_key.to_string(), bag);
    }

    BagDraw { picked, changed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_api::PromptItem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn items(values: &[&str]) -> Vec<PromptItem> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| PromptItem {
                id: Some(i as i64 + 1),
                value: value.to_string(),
                label: None,
                is_active: None,
            })
            .collect()
    }

    #[test]
    fn test_exhausts_full_set_before_repeating() {
        let pool = items(&["a", "b", "c", "d", "e"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(11);
        let exclude = HashSet::new();

        let mut first_cycle: HashSet<String> = HashSet::new();
        for _ in 0..pool.len() {
            let draw = draw_from_bag(&mut bags, "pool", &pool, |i| i.key(), 1, &exclude, &mut rng);
            assert_eq!(draw.picked.len(), 1);
            assert!(first_cycle.insert(draw.picked[0].value.clone()));
        }
        assert_eq!(first_cycle.len(), pool.len());
    }

    #[test]
    fn test_membership_change_reshuffles() {
        let pool = items(&["a", "b", "c"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(3);
        let exclude = HashSet::new();

        draw_from_bag(&mut bags, "pool", &pool, |i| i.key(), 1, &exclude, &mut rng);
        let before = bags["pool"].clone();

        // Shrink the pool: the stale permutation must be discarded.
        let smaller = items(&["a", "b"]);
        let draw = draw_from_bag(&mut bags, "pool", &smaller, |i| i.key(), 1, &exclude, &mut rng);
        assert!(draw.changed);
        let after = &bags["pool"];
        assert_eq!(after.order.len(), 2);
        assert_ne!(after.order, before.order);
    }

    #[test]
    fn test_excluded_keys_are_skipped() {
        let pool = items(&["a", "b", "c"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(5);
        let exclude: HashSet<ItemKey> = [ItemKey::Id(1), ItemKey::Id(2)].into_iter().collect();

        let draw = draw_from_bag(&mut bags, "pool", &pool, |i| i.key(), 3, &exclude, &mut rng);
        // Only "c" is drawable; the draw returns short instead of looping.
        assert_eq!(draw.picked.len(), 1);
        assert_eq!(draw.picked[0].value, "c");
    }

    #[test]
    fn test_zero_count_leaves_state_untouched() {
        let pool = items(&["a", "b"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(9);

        let draw = draw_from_bag(
            &mut bags,
            "pool",
            &pool,
            |i| i.key(),
            0,
            &HashSet::new(),
            &mut rng,
        );
        assert!(draw.picked.is_empty());
        assert!(!draw.changed);
        assert!(bags.is_empty());
    }

    #[test]
    fn test_draws_are_distinct_within_one_call() {
        let pool = items(&["a", "b", "c", "d"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(21);

        let draw = draw_from_bag(
            &mut bags,
            "pool",
            &pool,
            |i| i.key(),
            4,
            &HashSet::new(),
            &mut rng,
        );
        let unique: HashSet<&str> = draw.picked.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_cursor_survives_between_draws() {
        let pool = items(&["a", "b", "c", "d"]);
        let mut bags = ShuffleBags::new();
        let mut rng = StdRng::seed_from_u64(2);
        let exclude = HashSet::new();

        draw_from_bag(&mut bags, "pool", &pool, |i| i.key(), 2, &exclude, &mut rng);
        assert_eq!(bags["pool"].index, 2);
        draw_from_bag(&mut bags, "pool", &pool, |i| i.key(), 2, &exclude, &mut rng);
        assert_eq!(bags["pool"].index, 4);
    }
}
