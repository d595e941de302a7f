//! Genetic operators over genomes.
//!
//! These functions implement the variation steps of a generation. They are used
//! by [`genetic::GeneticAlgorithm`](crate::genetic::GeneticAlgorithm):
//!
//! - **Crossover**: [`uniform_crossover`] picks every weight from one of two parents
//! - **Normalization**: [`normalize_magnitude`] rescales a genome to a target mean
//!   absolute weight
//! - **Mutation**: [`mutate`] adds bounded uniform noise, with a per-slot strength
//!   from [`mutation_strength`]
//! - **Initialization**: [`randomize`] spreads a seed genome with Gaussian noise
//!
//! # Reference weight
//!
//! Every operator takes `reference: Option<usize>`. When set, that weight is a
//! fixed reference constant: crossover copies it from the first parent, mutation
//! and randomization leave it alone, and normalization reaches the target
//! magnitude by scaling the other weights only.
//!
//! # Why normalize
//!
//! Only the ratios between weights change which move a minimax player picks, so
//! genomes that differ by a constant factor play identically. Rescaling every
//! offspring to the same mean absolute weight removes that redundancy and keeps
//! mutation from growing the weights without bound over many generations.

use checkers_evaluator::Genome;
use rand::Rng;
use rand_distr::Normal;

fn is_free(i: usize, reference: Option<usize>) -> bool {
    reference != Some(i)
}

/// Builds an offspring by taking each weight from `a` or `b` with equal
/// probability (uniform crossover).
///
/// The reference weight, if any, is always copied from `a`.
///
/// # Examples
///
/// ```
/// use checkers_evaluator::Genome;
/// use checkers_training::weights;
///
/// let parent = Genome::default();
/// let child = weights::uniform_crossover(&parent, &parent, None, &mut rand::rng());
/// assert_eq!(child, parent);
/// ```
pub fn uniform_crossover<R>(a: &Genome, b: &Genome, reference: Option<usize>, rng: &mut R) -> Genome
where
    R: Rng + ?Sized,
{
    let mut child = *a;
    for i in 0..Genome::LEN {
        if is_free(i, reference) && !rng.random_bool(0.5) {
            child[i] = b[i];
        }
    }
    child
}

/// Mutation strength for the genome in `slot` of a population of
/// `population_size`.
///
/// Grows linearly from 0 for slot 0 (the elite) to `max` for the last slot, so
/// weaker lineages explore more while near-elite genomes stay close to it.
///
/// ```
/// use checkers_training::weights::mutation_strength;
///
/// assert_eq!(mutation_strength(0, 5, 0.4), 0.0);
/// assert_eq!(mutation_strength(2, 5, 0.4), 0.2);
/// assert_eq!(mutation_strength(4, 5, 0.4), 0.4);
/// ```
#[must_use]
pub fn mutation_strength(slot: usize, population_size: usize, max: f64) -> f64 {
    if population_size <= 1 {
        return 0.0;
    }
    #[expect(clippy::cast_precision_loss)]
    let fraction = slot as f64 / (population_size - 1) as f64;
    max * fraction
}

/// Adds `strength × uniform(-1, 1)` to every free weight, with an independent
/// draw per weight.
pub fn mutate<R>(genome: &mut Genome, strength: f64, reference: Option<usize>, rng: &mut R)
where
    R: Rng + ?Sized,
{
    if strength <= 0.0 {
        return;
    }
    for i in (0..Genome::LEN).filter(|&i| is_free(i, reference)) {
        genome[i] += strength * rng.random_range(-1.0..=1.0);
    }
}

/// Rescales `genome` so that its mean absolute weight equals `target`.
///
/// Without a reference weight every weight is multiplied by
/// `target / (Σ|wᵢ| / N)`. With a reference weight only the free weights are
/// scaled, by the factor that still brings the mean over all `N` weights to
/// `target`.
///
/// Returns `false` and leaves the genome untouched when that is impossible: the
/// weights to scale are all zero, or the reference weight alone already
/// exceeds the target mass.
///
/// ```
/// use checkers_evaluator::Genome;
/// use checkers_training::weights;
///
/// let mut genome = Genome::default();
/// assert!(weights::normalize_magnitude(&mut genome, 2.0, None));
/// assert!((genome.mean_abs_weight() - 2.0).abs() < 1e-12);
/// ```
pub fn normalize_magnitude(genome: &mut Genome, target: f64, reference: Option<usize>) -> bool {
    let free_mass = (0..Genome::LEN)
        .filter(|&i| is_free(i, reference))
        .map(|i| genome[i].abs())
        .sum::<f64>();
    let fixed_mass = reference.map_or(0.0, |i| genome[i].abs());
    #[expect(clippy::cast_precision_loss)]
    let wanted_free_mass = target * Genome::LEN as f64 - fixed_mass;
    if free_mass == 0.0 || wanted_free_mass <= 0.0 {
        return false;
    }

    let scale = wanted_free_mass / free_mass;
    for i in (0..Genome::LEN).filter(|&i| is_free(i, reference)) {
        genome[i] *= scale;
    }
    true
}

/// Adds Gaussian noise `N(0, sigma²)` to every free weight.
///
/// Used to spread the initial population around a seed genome. Does nothing
/// when `sigma` is not a positive finite number.
pub fn randomize<R>(genome: &mut Genome, sigma: f64, reference: Option<usize>, rng: &mut R)
where
    R: Rng + ?Sized,
{
    if !(sigma.is_finite() && sigma > 0.0) {
        return;
    }
    let Ok(normal) = Normal::new(0.0, sigma) else {
        return;
    };
    for i in (0..Genome::LEN).filter(|&i| is_free(i, reference)) {
        genome[i] += rng.sample(normal);
    }
}

#[cfg(test)]
mod tests {
    use rand::{RngCore, SeedableRng as _};
    use rand_pcg::Pcg64;

    use super::*;

    /// Produces the same word forever. `Constant(0)` makes every
    /// `random_bool(0.5)` come out `true`, `Constant(u64::MAX)` makes it `false`.
    struct Constant(u64);

    impl RngCore for Constant {
        #[expect(clippy::cast_possible_truncation)]
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, byte) in dst.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 8];
            }
        }
    }

    fn parents() -> (Genome, Genome) {
        let a = Genome::from_weights([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let b = Genome::from_weights([-1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0, -8.0, -9.0]);
        (a, b)
    }

    #[test]
    fn test_crossover_always_first_parent() {
        let (a, b) = parents();
        let child = uniform_crossover(&a, &b, None, &mut Constant(0));
        assert_eq!(child, a);
    }

    #[test]
    fn test_crossover_always_second_parent_keeps_reference() {
        let (a, b) = parents();
        let child = uniform_crossover(&a, &b, Some(0), &mut Constant(u64::MAX));
        assert_eq!(child[0], a[0]);
        for i in 1..Genome::LEN {
            assert_eq!(child[i], b[i]);
        }
    }

    #[test]
    fn test_crossover_only_copies_parent_weights() {
        let (a, b) = parents();
        let mut rng = Pcg64::seed_from_u64(7);
        let mut from_a = 0;
        for _ in 0..200 {
            let child = uniform_crossover(&a, &b, None, &mut rng);
            for i in 0..Genome::LEN {
                assert!(child[i] == a[i] || child[i] == b[i]);
                if child[i] == a[i] {
                    from_a += 1;
                }
            }
        }
        // 1800 coin flips
        assert!((700..1100).contains(&from_a), "from_a = {from_a}");
    }

    #[test]
    fn test_mutation_strength_is_linear() {
        assert_eq!(mutation_strength(0, 1, 1.0), 0.0);
        assert_eq!(mutation_strength(3, 4, 0.3), 0.3);
        assert!((mutation_strength(1, 4, 0.3) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_mutate_is_bounded_and_skips_reference() {
        let original = Genome::default();
        let mut rng = Pcg64::seed_from_u64(11);
        for _ in 0..100 {
            let mut genome = original;
            mutate(&mut genome, 0.25, Some(Genome::REFERENCE_WEIGHT), &mut rng);
            assert_eq!(genome[0], original[0]);
            for i in 1..Genome::LEN {
                assert!((genome[i] - original[i]).abs() <= 0.25);
            }
        }
    }

    #[test]
    fn test_zero_strength_mutation_is_identity() {
        let mut genome = Genome::default();
        mutate(&mut genome, 0.0, None, &mut Pcg64::seed_from_u64(1));
        assert_eq!(genome, Genome::default());
    }

    #[test]
    fn test_normalize_reaches_target() {
        let (_, mut genome) = parents();
        assert!(normalize_magnitude(&mut genome, 0.5, None));
        assert!((genome.mean_abs_weight() - 0.5).abs() < 1e-12);
        // direction is preserved
        assert!(genome.iter().all(|w| w < 0.0));
    }

    #[test]
    fn test_normalize_zero_genome_is_noop() {
        let mut genome = Genome::from_weights([0.0; Genome::LEN]);
        assert!(!normalize_magnitude(&mut genome, 1.0, None));
        assert_eq!(genome, Genome::from_weights([0.0; Genome::LEN]));
    }

    #[test]
    fn test_normalize_with_reference_keeps_it_fixed() {
        let (mut genome, _) = parents();
        assert!(normalize_magnitude(&mut genome, 2.0, Some(0)));
        assert_eq!(genome[0], 1.0);
        assert!((genome.mean_abs_weight() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_with_oversized_reference_is_noop() {
        let mut genome = Genome::from_weights([100.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let before = genome;
        assert!(!normalize_magnitude(&mut genome, 1.0, Some(0)));
        assert_eq!(genome, before);
    }

    #[test]
    fn test_randomize_spreads_free_weights() {
        let mut rng = Pcg64::seed_from_u64(3);
        let mut genome = Genome::default();
        randomize(&mut genome, 10.0, Some(0), &mut rng);
        assert_eq!(genome[0], Genome::default()[0]);
        assert_ne!(genome, Genome::default());
    }

    #[test]
    fn test_randomize_ignores_invalid_sigma() {
        let mut rng = Pcg64::seed_from_u64(3);
        let mut genome = Genome::default();
        randomize(&mut genome, -1.0, None, &mut rng);
        randomize(&mut genome, f64::NAN, None, &mut rng);
        randomize(&mut genome, 0.0, None, &mut rng);
        assert_eq!(genome, Genome::default());
    }
}
