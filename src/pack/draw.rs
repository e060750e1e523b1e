use rand::{seq::IndexedRandom, Rng};

use crate::cards::models::CardTemplateModel;

/// Draws `count` templates uniformly at random with replacement, so the same
/// template can appear more than once in a single pack.
///
/// Returns an empty vec when the pool is empty.
pub fn draw_with_replacement<R: Rng + ?Sized>(
    pool: &[CardTemplateModel],
    count: usize,
    rng: &mut R,
) -> Vec<CardTemplateModel> {
    (0..count)
        .filter_map(|_| pool.choose(rng).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn pool(size: usize) -> Vec<CardTemplateModel> {
        (0..size)
            .map(|i| {
                CardTemplateModel::new(
                    format!("Teacher {}", i),
                    "Math".into(),
                    "q".into(),
                    "s1".into(),
                )
            })
            .collect()
    }

    #[test]
    fn draws_exact_count_from_pool() {
        let pool = pool(5);
        let mut rng = StdRng::seed_from_u64(42);

        let drawn = draw_with_replacement(&pool, 3, &mut rng);

        assert_eq!(drawn.len(), 3);
        assert!(drawn.iter().all(|d| pool.contains(d)));
    }

    #[test]
    fn single_card_pool_repeats() {
        let pool = pool(1);
        let mut rng = StdRng::seed_from_u64(1);

        let drawn = draw_with_replacement(&pool, 3, &mut rng);

        assert_eq!(drawn.len(), 3);
        assert!(drawn.iter().all(|d| d.type_id == pool[0].type_id));
    }

    #[test]
    fn long_draw_reaches_every_template() {
        let pool = pool(3);
        let mut rng = StdRng::seed_from_u64(7);

        let drawn = draw_with_replacement(&pool, 60, &mut rng);

        assert!(pool.iter().all(|t| drawn.contains(t)));
    }

    #[test]
    fn empty_pool_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(draw_with_replacement(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_draw() {
        let pool = pool(10);
        let a = draw_with_replacement(&pool, 3, &mut StdRng::seed_from_u64(9));
        let b = draw_with_replacement(&pool, 3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
