//! Fitness-proportional (roulette) parent selection.
//!
//! A [`RankTable`] orders a generation by descending score and keeps a running
//! sum of the scores of the top `top_fraction` of genomes (the survivors).
//! Drawing `r` uniformly from `[0, total)` and finding the first cumulative sum
//! above `r` selects a survivor with probability proportional to its score.
//!
//! Scores are integral tournament points, so the cumulative table is exact.
//!
//! # Degenerate cases
//!
//! - Total survivor score of zero: the top-ranked genome is returned.
//! - Excluding a genome whose removal leaves zero weight: the best-ranked other
//!   survivor is returned.
//! - Excluding the only survivor: there is nothing else to draw, and
//!   [`RankTable::sample_excluding`] returns `None`.

use rand::Rng;

/// Genomes ranked by score, with cumulative weights over the survivors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTable {
    scores: Vec<u32>,
    ranked: Vec<usize>,
    survivor_count: usize,
    cumulative: Vec<u64>,
}

impl RankTable {
    /// Ranks `scores` (indexed by genome) and keeps the top `top_fraction` as
    /// survivors.
    ///
    /// Ties are broken by lower genome index. At least one genome survives.
    ///
    /// # Examples
    ///
    /// ```
    /// use checkers_training::selection::RankTable;
    ///
    /// let table = RankTable::new(&[2, 6, 2, 0], 0.5);
    /// assert_eq!(table.ranked(), &[1, 0, 2, 3]);
    /// assert_eq!(table.survivors(), &[1, 0]);
    /// assert_eq!(table.total_weight(), 8);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `scores` is empty.
    #[must_use]
    pub fn new(scores: &[u32], top_fraction: f64) -> Self {
        assert!(!scores.is_empty(), "cannot rank an empty population");

        let mut ranked = (0..scores.len()).collect::<Vec<_>>();
        ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));

        #[expect(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let survivor_count =
            ((scores.len() as f64 * top_fraction).ceil() as usize).clamp(1, scores.len());

        let cumulative = ranked[..survivor_count]
            .iter()
            .scan(0_u64, |sum, &genome| {
                *sum += u64::from(scores[genome]);
                Some(*sum)
            })
            .collect();

        Self {
            scores: scores.to_vec(),
            ranked,
            survivor_count,
            cumulative,
        }
    }

    /// Every genome, best first.
    #[must_use]
    pub fn ranked(&self) -> &[usize] {
        &self.ranked
    }

    /// The top-ranked genome.
    #[must_use]
    pub fn top(&self) -> usize {
        self.ranked[0]
    }

    /// Genomes eligible as parents, best first.
    #[must_use]
    pub fn survivors(&self) -> &[usize] {
        &self.ranked[..self.survivor_count]
    }

    /// Score of `genome`.
    #[must_use]
    pub fn score(&self, genome: usize) -> u32 {
        self.scores[genome]
    }

    /// Sum of the survivors' scores.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Draws a survivor with probability proportional to its score.
    pub fn sample<R>(&self, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let total = self.total_weight();
        if total == 0 {
            return self.top();
        }
        let r = rng.random_range(0..total);
        self.survivors()[self.cumulative.partition_point(|&c| c <= r)]
    }

    /// Draws a survivor other than `excluded`, proportionally to score.
    ///
    /// The excluded genome's share of the cumulative range is skipped, so the
    /// draw is taken from `total − score(excluded)`. Returns `None` only when
    /// `excluded` is the sole survivor.
    pub fn sample_excluding<R>(&self, rng: &mut R, excluded: usize) -> Option<usize>
    where
        R: Rng + ?Sized,
    {
        let Some(position) = self.survivors().iter().position(|&g| g == excluded) else {
            return Some(self.sample(rng));
        };
        if self.survivor_count == 1 {
            return None;
        }

        let width = u64::from(self.scores[excluded]);
        let total = self.total_weight() - width;
        if total == 0 {
            return self.survivors().iter().copied().find(|&g| g != excluded);
        }

        let range_start = self.cumulative[position] - width;
        let mut r = rng.random_range(0..total);
        if r >= range_start {
            r += width;
        }
        let chosen = self.survivors()[self.cumulative.partition_point(|&c| c <= r)];
        debug_assert_ne!(chosen, excluded);
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let table = RankTable::new(&[4, 4, 9, 4], 1.0);
        assert_eq!(table.ranked(), &[2, 0, 1, 3]);
        assert_eq!(table.top(), 2);
    }

    #[test]
    fn test_survivor_count_rounds_up_and_is_at_least_one() {
        assert_eq!(RankTable::new(&[1, 2, 3, 4, 5], 0.5).survivors().len(), 3);
        assert_eq!(RankTable::new(&[1, 2, 3], 0.0).survivors(), &[2]);
        assert_eq!(RankTable::new(&[1, 2, 3], 5.0).survivors().len(), 3);
    }

    #[test]
    fn test_draws_stay_in_range() {
        let scores = [0, 3, 8, 1, 0, 5, 2, 2];
        let table = RankTable::new(&scores, 0.75);
        let mut rng = rng();
        for _ in 0..2000 {
            let genome = table.sample(&mut rng);
            assert!(genome < scores.len());
            assert!(table.survivors().contains(&genome));
            assert_ne!(scores[genome], 0);
        }
    }

    #[test]
    fn test_excluded_genome_is_never_drawn() {
        let scores = [6, 3, 8, 1, 0, 5];
        let table = RankTable::new(&scores, 1.0);
        let mut rng = rng();
        for excluded in 0..scores.len() {
            for _ in 0..500 {
                let genome = table.sample_excluding(&mut rng, excluded).unwrap();
                assert_ne!(genome, excluded);
                assert!(genome < scores.len());
            }
        }
    }

    #[test]
    fn test_draws_follow_scores() {
        let table = RankTable::new(&[6, 2, 0, 0], 1.0);
        let mut rng = rng();
        let draws = 20_000;
        let first = (0..draws).filter(|_| table.sample(&mut rng) == 0).count();
        #[expect(clippy::cast_precision_loss)]
        let ratio = first as f64 / f64::from(draws);
        assert!((ratio - 0.75).abs() < 0.02, "ratio = {ratio}");
    }

    #[test]
    fn test_zero_total_returns_top_ranked() {
        let table = RankTable::new(&[0, 0, 0], 1.0);
        let mut rng = rng();
        assert_eq!(table.sample(&mut rng), 0);
        assert_eq!(table.sample_excluding(&mut rng, 0), Some(1));
    }

    #[test]
    fn test_excluding_only_weighted_genome_falls_back_to_next_ranked() {
        let table = RankTable::new(&[0, 7, 0], 1.0);
        let mut rng = rng();
        assert_eq!(table.sample_excluding(&mut rng, 1), Some(0));
    }

    #[test]
    fn test_single_survivor_cannot_be_excluded() {
        let table = RankTable::new(&[1, 9, 4], 0.1);
        let mut rng = rng();
        assert_eq!(table.survivors(), &[1]);
        assert_eq!(table.sample_excluding(&mut rng, 1), None);
        assert_eq!(table.sample_excluding(&mut rng, 0), Some(1));
    }
}
