//! Tournament scheduling: turning pairwise matches into per-genome fitness.
//!
//! A tournament plays matches between members of a population on a
//! [`ThreadPool`] and accumulates the points each genome earns into a shared
//! [`ScoreBoard`]. Two schedulers exist and one is picked per run through
//! [`TournamentKind`]:
//!
//! - [`EliminationTournament`] - loss-bucket elimination. Genomes are grouped by
//!   how many matches they have lost; a genome is out after
//!   `losses_before_elimination` losses. Needs `O(P·L)` matches.
//! - [`RoundRobinTournament`] - every ordered pair plays once, so each pair plays
//!   twice with both seatings. Needs `P·(P−1)` matches.
//!
//! # Scoring
//!
//! Every game played awards [`POINTS_PER_MATCH`] points (win 2, draw 1 each), so
//! after a tournament `Σ scores == POINTS_PER_MATCH × games_played` holds exactly.
//!
//! # Concurrency
//!
//! Matches run as pool jobs reading an immutable snapshot of the population
//! ([`MatchContext`]). Scores are accumulated with atomic adds. Schedulers that
//! need round structure submit one round at a time and call
//! [`ThreadPool::join`] before looking at results.

use std::sync::{
    Arc,
    atomic::{AtomicU32, AtomicUsize, Ordering},
};

use checkers_evaluator::{Genome, MatchEvaluator, MatchOutcome, POINTS_PER_MATCH};
use serde::{Deserialize, Serialize};

use crate::thread_pool::{PoolError, ThreadPool};

pub use self::{elimination::EliminationTournament, round_robin::RoundRobinTournament};

mod elimination;
mod round_robin;

/// Errors raised while setting up or running a tournament.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TournamentError {
    #[display("a tournament needs at least one team")]
    NoTeams,
    #[display("at least one loss before elimination is required")]
    NoLossesAllowed,
    #[display("tournament sized for {expected} teams was given {actual}")]
    TeamCountMismatch { expected: usize, actual: usize },
    #[display("match job failed")]
    #[from]
    Pool(PoolError),
}

/// Which scheduler decides fitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentKind {
    /// Loss-bucket elimination.
    Elimination {
        /// Number of losses after which a genome is eliminated.
        losses_before_elimination: u8,
    },
    /// Every ordered pair plays once.
    RoundRobin,
}

impl Default for TournamentKind {
    fn default() -> Self {
        Self::Elimination {
            losses_before_elimination: 2,
        }
    }
}

/// Per-genome points accumulated during one tournament.
#[derive(Debug)]
pub struct ScoreBoard {
    scores: Box<[AtomicU32]>,
    games_played: AtomicUsize,
}

impl ScoreBoard {
    /// Creates a zeroed score board for `team_count` genomes.
    #[must_use]
    pub fn new(team_count: usize) -> Self {
        Self {
            scores: (0..team_count).map(|_| AtomicU32::new(0)).collect(),
            games_played: AtomicUsize::new(0),
        }
    }

    /// Number of genomes tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if the board tracks no genome.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Zeroes every score and the game counter.
    pub fn reset(&self) {
        for score in &self.scores {
            score.store(0, Ordering::Relaxed);
        }
        self.games_played.store(0, Ordering::Relaxed);
    }

    /// Credits the points of one game between `first` and `second`.
    pub fn record(&self, first: usize, second: usize, outcome: MatchOutcome) {
        let (first_points, second_points) = outcome.points();
        self.scores[first].fetch_add(first_points, Ordering::Relaxed);
        self.scores[second].fetch_add(second_points, Ordering::Relaxed);
        self.games_played.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the scores, indexed by genome.
    #[must_use]
    pub fn scores(&self) -> Vec<u32> {
        self.scores
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .collect()
    }

    /// Number of games recorded since the last reset.
    #[must_use]
    pub fn games_played(&self) -> usize {
        self.games_played.load(Ordering::Relaxed)
    }
}

/// Everything a match job needs, shared read-only between jobs.
#[derive(Debug)]
pub struct MatchContext<E: ?Sized> {
    genomes: Arc<[Genome]>,
    evaluator: Arc<E>,
    scores: Arc<ScoreBoard>,
}

impl<E: ?Sized> Clone for MatchContext<E> {
    fn clone(&self) -> Self {
        Self {
            genomes: Arc::clone(&self.genomes),
            evaluator: Arc::clone(&self.evaluator),
            scores: Arc::clone(&self.scores),
        }
    }
}

impl<E> MatchContext<E>
where
    E: MatchEvaluator + ?Sized,
{
    /// Bundles a population snapshot with the evaluator and score board.
    ///
    /// # Panics
    ///
    /// Panics if the score board does not track exactly one score per genome.
    pub fn new(genomes: Arc<[Genome]>, evaluator: Arc<E>, scores: Arc<ScoreBoard>) -> Self {
        assert_eq!(
            genomes.len(),
            scores.len(),
            "score board must track every genome"
        );
        Self {
            genomes,
            evaluator,
            scores,
        }
    }

    /// Number of genomes taking part.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.genomes.len()
    }

    /// Shared score board.
    #[must_use]
    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    /// Plays one scored game with `first` moving first.
    #[must_use]
    pub fn play(&self, first: usize, second: usize) -> MatchOutcome {
        let outcome = self
            .evaluator
            .play_match(&self.genomes[first], &self.genomes[second]);
        self.scores.record(first, second, outcome);
        outcome
    }

    /// Plays until there is a winner and returns `(winner, loser)`.
    ///
    /// A drawn game is replayed once with the seats swapped. If that is drawn
    /// too, the lower genome index advances. Every game played is scored.
    #[must_use]
    pub fn play_decisive(&self, a: usize, b: usize) -> (usize, usize) {
        let outcome = match self.play(a, b) {
            MatchOutcome::Draw => self.play(b, a).swapped(),
            decided => decided,
        };
        match outcome {
            MatchOutcome::FirstWins => (a, b),
            MatchOutcome::SecondWins => (b, a),
            MatchOutcome::Draw => (a.min(b), a.max(b)),
        }
    }
}

/// Result of a finished tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standings {
    /// Points per genome, indexed by genome.
    pub scores: Vec<u32>,
    /// Number of games played.
    pub games_played: usize,
    /// Genome indices grouped by place (first place first), when the scheduler
    /// resolves places.
    pub places: Option<Vec<Vec<usize>>>,
}

impl Standings {
    /// Sum of all scores.
    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.scores.iter().copied().map(u64::from).sum()
    }

    /// Returns `true` if the points conservation invariant holds.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.total_points() == u64::from(POINTS_PER_MATCH) * self.games_played as u64
    }
}

/// The scheduler selected for a training run.
#[derive(Debug)]
pub enum Tournament {
    Elimination(EliminationTournament),
    RoundRobin(RoundRobinTournament),
}

impl Tournament {
    /// Creates the scheduler described by `kind` for `team_count` genomes.
    pub fn new(kind: TournamentKind, team_count: usize) -> Result<Self, TournamentError> {
        Ok(match kind {
            TournamentKind::Elimination {
                losses_before_elimination,
            } => Self::Elimination(EliminationTournament::new(
                team_count,
                losses_before_elimination,
            )?),
            TournamentKind::RoundRobin => Self::RoundRobin(RoundRobinTournament::new(team_count)?),
        })
    }

    /// Upper bound on the games a run plays, for progress reporting.
    #[must_use]
    pub fn max_num_games(&self) -> usize {
        match self {
            // a drawn bracket match is replayed once
            Self::Elimination(t) => t.max_num_matches() * 2,
            Self::RoundRobin(t) => t.num_matches(),
        }
    }

    /// Plays a full tournament and returns the standings.
    ///
    /// The score board in `ctx` is reset first.
    pub fn run<E>(
        &mut self,
        pool: &ThreadPool,
        ctx: &MatchContext<E>,
    ) -> Result<Standings, TournamentError>
    where
        E: MatchEvaluator + ?Sized + 'static,
    {
        match self {
            Self::Elimination(t) => {
                t.run(pool, ctx)?;
                Ok(Standings {
                    scores: ctx.scores().scores(),
                    games_played: ctx.scores().games_played(),
                    places: Some(t.places()),
                })
            }
            Self::RoundRobin(t) => {
                t.run(pool, ctx)?;
                Ok(Standings {
                    scores: ctx.scores().scores(),
                    games_played: ctx.scores().games_played(),
                    places: None,
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use checkers_evaluator::{Genome, MatchEvaluator, MatchOutcome};

    use super::{MatchContext, ScoreBoard};

    /// Genome tagged with `id` in its reference weight.
    pub(crate) fn tagged(id: usize) -> Genome {
        let mut genome = Genome::default();
        #[expect(clippy::cast_precision_loss)]
        let id = id as f64;
        genome[Genome::REFERENCE_WEIGHT] = id;
        genome
    }

    pub(crate) fn tag(genome: &Genome) -> f64 {
        genome[Genome::REFERENCE_WEIGHT]
    }

    /// The genome with the lower tag always wins.
    #[derive(Debug)]
    pub(crate) struct LowerTagWins;

    impl MatchEvaluator for LowerTagWins {
        fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome {
            if tag(first) < tag(second) {
                MatchOutcome::FirstWins
            } else {
                MatchOutcome::SecondWins
            }
        }
    }

    /// The genome with the higher tag always wins.
    #[derive(Debug)]
    pub(crate) struct HigherTagWins;

    impl MatchEvaluator for HigherTagWins {
        fn play_match(&self, first: &Genome, second: &Genome) -> MatchOutcome {
            if tag(first) > tag(second) {
                MatchOutcome::FirstWins
            } else {
                MatchOutcome::SecondWins
            }
        }
    }

    /// Every game is drawn.
    #[derive(Debug)]
    pub(crate) struct AlwaysDraw;

    impl MatchEvaluator for AlwaysDraw {
        fn play_match(&self, _first: &Genome, _second: &Genome) -> MatchOutcome {
            MatchOutcome::Draw
        }
    }

    /// The first seat always wins.
    #[derive(Debug)]
    pub(crate) struct FirstSeatWins;

    impl MatchEvaluator for FirstSeatWins {
        fn play_match(&self, _first: &Genome, _second: &Genome) -> MatchOutcome {
            MatchOutcome::FirstWins
        }
    }

    pub(crate) fn context<E>(team_count: usize, evaluator: E) -> MatchContext<E>
    where
        E: MatchEvaluator,
    {
        let genomes: Arc<[Genome]> = (0..team_count).map(tagged).collect();
        MatchContext::new(
            genomes,
            Arc::new(evaluator),
            Arc::new(ScoreBoard::new(team_count)),
        )
    }
}
