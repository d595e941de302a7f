//! Match evaluation: the capability the trainer uses to compare two genomes.
//!
//! The trainer never looks at a board. Everything it knows about the relative
//! strength of two genomes comes from [`MatchEvaluator::play_match`], which plays
//! one complete game between them and reports a [`MatchOutcome`].
//!
//! # Contract
//!
//! - `play_match` is called concurrently from several worker threads with
//!   different genome pairs, so implementations must be `Send + Sync`.
//! - Each call owns its own game instance. No board state may survive between
//!   calls.
//! - Calls should not panic. The trainer's worker pool catches a panicking
//!   call, but the generation it belongs to is then aborted.
//!
//! # Scoring
//!
//! A win is worth 2 points, a draw 1 point to each side and a loss nothing, so
//! every game hands out exactly [`POINTS_PER_MATCH`] points.

use std::{fmt, sync::Arc};

use crate::Genome;

/// Points distributed by a single game.
pub const POINTS_PER_MATCH: u32 = 2;

/// Result of one game, seen from the seating order passed to `play_match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// The first genome won.
    FirstWins,
    /// The second genome won.
    SecondWins,
    /// Neither side won.
    Draw,
}

impl MatchOutcome {
    /// Points earned by `(first, second)`.
    ///
    /// ```
    /// use checkers_evaluator::match_evaluator::{MatchOutcome, POINTS_PER_MATCH};
    ///
    /// let (a, b) = MatchOutcome::Draw.points();
    /// assert_eq!((a, b), (1, 1));
    /// assert_eq!(a + b, POINTS_PER_MATCH);
    /// ```
    #[must_use]
    pub const fn points(self) -> (u32, u32) {
        match self {
            Self::FirstWins => (POINTS_PER_MATCH, 0),
            Self::SecondWins => (0, POINTS_PER_MATCH),
            Self::Draw => (POINTS_PER_MATCH / 2, POINTS_PER_MATCH / 2),
        }
    }

    /// Same game seen with the seats swapped.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Self::FirstWins => Self::SecondWins,
            Self::SecondWins => Self::FirstWins,
            Self::Draw => Self::Draw,
        }
    }
}

/// Plays complete games between two genomes.
pub trait MatchEvaluator: fmt::Debug + Send + Sync {
    /// Plays one game with `first` moving first and reports the outcome.
    fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome;
}

impl<T> MatchEvaluator for Box<T>
where
    T: MatchEvaluator + ?Sized,
{
    fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome {
        (**self).play_match(first, second)
    }
}

impl<T> MatchEvaluator for Arc<T>
where
    T: MatchEvaluator + ?Sized,
{
    fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome {
        (**self).play_match(first, second)
    }
}

/// Stand-in engine that judges genomes against a reference brain.
///
/// The strength of a genome is the cosine similarity between its weights and the
/// reference weights, so scaling a genome does not change its strength. Two
/// genomes whose strengths differ by less than the draw margin draw; otherwise
/// the stronger genome wins regardless of seating.
///
/// The search depth narrows the draw margin (`0.05 / (depth + 1)`), mimicking a
/// deeper search telling apart closer brains. The evaluator is pure: the same
/// pair always produces the same outcome.
///
/// # Examples
///
/// ```
/// use checkers_evaluator::{
///     Genome,
///     match_evaluator::{MatchEvaluator, MatchOutcome, ReferenceMatchEvaluator},
/// };
///
/// let reference = Genome::default();
/// let evaluator = ReferenceMatchEvaluator::new(reference, 3);
///
/// let mut weaker = reference;
/// weaker.king = -5.0;
/// assert_eq!(evaluator.play_match(&reference, &weaker), MatchOutcome::FirstWins);
/// assert_eq!(evaluator.play_match(&weaker, &reference), MatchOutcome::SecondWins);
/// assert_eq!(evaluator.play_match(&reference, &reference), MatchOutcome::Draw);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceMatchEvaluator {
    reference: Genome,
    search_depth: u32,
    draw_margin: f64,
}

impl ReferenceMatchEvaluator {
    const BASE_DRAW_MARGIN: f64 = 0.05;

    /// Creates an evaluator judging genomes against `reference`.
    #[must_use]
    pub fn new(reference: Genome, search_depth: u32) -> Self {
        Self {
            reference,
            search_depth,
            draw_margin: Self::BASE_DRAW_MARGIN / (f64::from(search_depth) + 1.0),
        }
    }

    /// Returns the search depth this evaluator was configured with.
    #[must_use]
    pub fn search_depth(&self) -> u32 {
        self.search_depth
    }

    /// Returns the strength of `genome`, in `[-1.0, 1.0]`.
    ///
    /// An all-zero genome has strength 0.
    #[must_use]
    pub fn strength(&self, genome: &Genome) -> f64 {
        let dot = genome
            .iter()
            .zip(self.reference.iter())
            .map(|(a, b)| a * b)
            .sum::<f64>();
        let norm = norm(genome) * norm(&self.reference);
        if norm == 0.0 { 0.0 } else { dot / norm }
    }
}

fn norm(genome: &Genome) -> f64 {
    genome.iter().map(|w| w * w).sum::<f64>().sqrt()
}

impl MatchEvaluator for ReferenceMatchEvaluator {
    fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome {
        let diff = self.strength(first) - self.strength(second);
        if diff.abs() < self.draw_margin {
            MatchOutcome::Draw
        } else if diff > 0.0 {
            MatchOutcome::FirstWins
        } else {
            MatchOutcome::SecondWins
        }
    }
}
