use checkers_evaluator::MatchEvaluator;

use super::{MatchContext, TournamentError};
use crate::thread_pool::ThreadPool;

/// All-pairs tournament: every ordered pair of teams plays once.
///
/// Each unordered pair therefore plays twice, once with each team moving first.
/// All matches are independent, so the whole tournament is a single batch of
/// jobs with one barrier at the end.
#[derive(Debug, Clone)]
pub struct RoundRobinTournament {
    team_count: usize,
}

impl RoundRobinTournament {
    pub fn new(team_count: usize) -> Result<Self, TournamentError> {
        if team_count == 0 {
            return Err(TournamentError::NoTeams);
        }
        Ok(Self { team_count })
    }

    /// `P × (P − 1)`.
    #[must_use]
    pub fn num_matches(&self) -> usize {
        self.team_count * (self.team_count - 1)
    }

    pub(crate) fn run<E>(
        &mut self,
        pool: &ThreadPool,
        ctx: &MatchContext<E>,
    ) -> Result<(), TournamentError>
    where
        E: MatchEvaluator + ?Sized + 'static,
    {
        if ctx.team_count() != self.team_count {
            return Err(TournamentError::TeamCountMismatch {
                expected: self.team_count,
                actual: ctx.team_count(),
            });
        }
        ctx.scores().reset();

        for first in 0..self.team_count {
            for second in (0..self.team_count).filter(|&second| second != first) {
                let ctx = ctx.clone();
                pool.add_job(move || {
                    let _ = ctx.play(first, second);
                });
            }
        }
        log::debug!("round robin: {} match(es) queued", self.num_matches());
        pool.join()?;
        Ok(())
    }
}
