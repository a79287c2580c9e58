//! Draw-count sizing for a single category.
//!
//! The count produced here is a target, not a guarantee: tag locks can push
//! the final draw above it, and a starved pool can leave it unmet.

use content_api::Category;
use rand::Rng;

/// Normalized draw-count range of a category (`max >= min >= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulRange {
    pub min: u32,
    pub max: u32,
}

/// The category's normalized multiplicity range.
///
/// Missing `min_count` defaults to 1; missing `max_count` defaults to the
/// minimum; an inverted pair collapses upward to the minimum.
pub fn mul_range(category: &Category) -> MulRange {
    let min = category.min_count.unwrap_or(1);
    let max = category.max_count.unwrap_or(min).max(min);
    MulRange { min, max }
}

/// How many items to draw for this category.
pub fn draw_count(category: &Category, override_qty: Option<u32>) -> u32 {
    draw_count_with_rng(category, override_qty, &mut rand::thread_rng())
}

/// How many items to draw, with a caller-supplied random source.
///
/// A manual override wins outright. Otherwise a collapsed range is
/// deterministic and anything else samples uniformly over `[min, max]`.
pub fn draw_count_with_rng<R: Rng + ?Sized>(
    category: &Category,
    override_qty: Option<u32>,
    rng: &mut R,
) -> u32 {
    if let Some(qty) = override_qty {
        return qty;
    }
    let MulRange { min, max } = mul_range(category);
    if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CategoryBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_range_defaults() {
        let cat = CategoryBuilder::new(1, "subject").build();
        assert_eq!(mul_range(&cat), MulRange { min: 1, max: 1 });
    }

    #[test]
    fn test_range_inverted_pair_collapses() {
        let cat = CategoryBuilder::new(1, "subject").range(3, 1).build();
        assert_eq!(mul_range(&cat), MulRange { min: 3, max: 3 });
    }

    #[test]
    fn test_collapsed_range_is_deterministic() {
        let cat = CategoryBuilder::new(1, "subject").range(2, 2).build();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(draw_count_with_rng(&cat, None, &mut rng), 2);
        }
    }

    #[test]
    fn test_open_range_covers_all_values() {
        let cat = CategoryBuilder::new(1, "subject").range(1, 3).build();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let count = draw_count_with_rng(&cat, None, &mut rng) as usize;
            assert!((1..=3).contains(&count));
            seen[count] = true;
        }
        assert!(seen[1] && seen[2] && seen[3]);
    }

    #[test]
    fn test_override_wins() {
        let cat = CategoryBuilder::new(1, "subject").range(1, 1).build();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(draw_count_with_rng(&cat, Some(5), &mut rng), 5);
        assert_eq!(draw_count_with_rng(&cat, Some(0), &mut rng), 0);
    }
}
