use std::{
    fmt, mem,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use checkers_evaluator::MatchEvaluator;

use super::{MatchContext, TournamentError};
use crate::thread_pool::ThreadPool;

/// Loss-bucket elimination tournament.
///
/// Teams (genome indices) live in one array partitioned into contiguous loss
/// buckets: bucket `b` holds the teams that have lost exactly `b` matches, and
/// the final bucket (`losses_before_elimination` losses) holds eliminated teams.
/// `loss_bracket_starts[b]` is the first position of bucket `b`;
/// `loss_bracket_starts[0]` is always 0 and the starts never decrease.
///
/// Each round pairs teams inside every live bucket. Winners stay in their
/// bucket, losers move to the top of the next one. With an odd bucket the first
/// team sits out (a bye) and is moved to the bottom of the winners so it plays
/// next round. When every live bucket up to some point holds at most one team,
/// the first two such singletons play one cross-bucket match instead.
///
/// Rounds are separated by a [`ThreadPool::join`] barrier. Jobs write results
/// into a back buffer at positions disjoint per job; the buffers are swapped
/// after the barrier. The tournament ends when a single team is left alive.
///
/// Eliminated teams are stacked in reverse order of elimination, so after a run
/// [`EliminationTournament::brackets`] lists the champion first, then the last
/// team eliminated, and so on.
#[derive(Debug)]
pub struct EliminationTournament {
    team_count: usize,
    losses_before_elimination: usize,
    brackets: Vec<usize>,
    brackets_back_buffer: Arc<[AtomicUsize]>,
    loss_bracket_starts: Vec<usize>,
    loss_bracket_starts_back_buffer: Vec<usize>,
}

#[derive(Debug)]
struct CrossBucketMatch {
    upper_bucket: usize,
    lower_bucket: usize,
    upper_team: usize,
    winner: Arc<AtomicUsize>,
}

impl EliminationTournament {
    /// Allocates the bracket state for `team_count` teams.
    pub fn new(team_count: usize, losses_before_elimination: u8) -> Result<Self, TournamentError> {
        if team_count == 0 {
            return Err(TournamentError::NoTeams);
        }
        if losses_before_elimination == 0 {
            return Err(TournamentError::NoLossesAllowed);
        }
        let losses_before_elimination = usize::from(losses_before_elimination);
        let mut this = Self {
            team_count,
            losses_before_elimination,
            brackets: vec![0; team_count],
            brackets_back_buffer: (0..team_count).map(|_| AtomicUsize::new(0)).collect(),
            loss_bracket_starts: vec![0; losses_before_elimination + 1],
            loss_bracket_starts_back_buffer: vec![0; losses_before_elimination + 1],
        };
        this.reset();
        Ok(this)
    }

    /// Number of teams.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.team_count
    }

    /// Number of losses after which a team is eliminated.
    #[must_use]
    pub fn losses_before_elimination(&self) -> usize {
        self.losses_before_elimination
    }

    /// Puts every team back into the zero-loss bucket, in index order.
    pub fn reset(&mut self) {
        for (i, team) in self.brackets.iter_mut().enumerate() {
            *team = i;
        }
        self.loss_bracket_starts.fill(self.team_count);
        self.loss_bracket_starts[0] = 0;
        self.loss_bracket_starts_back_buffer.fill(self.team_count);
        self.loss_bracket_starts_back_buffer[0] = 0;
    }

    /// Team order: after a run, the champion followed by the eliminated teams in
    /// reverse order of elimination.
    #[must_use]
    pub fn brackets(&self) -> &[usize] {
        &self.brackets
    }

    /// Number of places a finished run determines.
    ///
    /// One individual place per allowed loss, then one group of up to
    /// `losses_before_elimination` teams, then everybody else. Clamped to the
    /// number of teams.
    #[must_use]
    pub fn num_resolved_places(&self) -> usize {
        let losses = self.losses_before_elimination;
        let grouped = if self.team_count > losses * 2 { 2 } else { 1 };
        (losses + grouped).min(self.team_count)
    }

    /// Teams sharing a 1-based `place`. Empty when the place is not resolved.
    #[must_use]
    pub fn teams_at_place(&self, place: usize) -> &[usize] {
        let losses = self.losses_before_elimination;
        if place == 0 || place > self.num_resolved_places() {
            return &[];
        }
        if place <= losses {
            return &self.brackets[place - 1..place];
        }
        if place == losses + 1 {
            let count = (self.team_count - losses).min(losses);
            return &self.brackets[losses..losses + count];
        }
        &self.brackets[losses * 2..]
    }

    /// Every resolved place, first place first.
    #[must_use]
    pub fn places(&self) -> Vec<Vec<usize>> {
        (1..=self.num_resolved_places())
            .map(|place| self.teams_at_place(place).to_vec())
            .collect()
    }

    /// Upper bound on the bracket matches of one run.
    ///
    /// Every match hands out one loss and all teams but the champion end with
    /// `losses_before_elimination` losses.
    #[must_use]
    pub fn max_num_matches(&self) -> usize {
        if self.team_count <= 1 {
            return 0;
        }
        self.team_count * self.losses_before_elimination - 1
    }

    fn bucket_len(&self, bucket: usize) -> usize {
        self.loss_bracket_starts[bucket + 1] - self.loss_bracket_starts[bucket]
    }

    fn alive_count(&self) -> usize {
        self.loss_bracket_starts[self.losses_before_elimination]
    }

    /// Runs the tournament from a fresh bracket.
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
        self.reset();
        ctx.scores().reset();

        let mut round = 0;
        while self.alive_count() > 1 {
            round += 1;
            let matches = self.schedule_bucket_matches(pool, ctx);
            let cross = self.schedule_cross_bucket_match(pool, ctx);
            log::trace!("elimination round {round}: {self}");
            log::debug!(
                "elimination round {round}: {} match(es), cross-bucket: {}",
                matches + usize::from(cross.is_some()),
                cross.is_some()
            );

            pool.join()?;

            self.swap_buffers(cross.as_ref());
        }
        log::info!(
            "elimination finished after {round} round(s), {} game(s)",
            ctx.scores().games_played()
        );
        Ok(())
    }

    /// Pairs teams inside every live bucket, from the most-losses bucket up.
    fn schedule_bucket_matches<E>(&mut self, pool: &ThreadPool, ctx: &MatchContext<E>) -> usize
    where
        E: MatchEvaluator + ?Sized + 'static,
    {
        let mut scheduled = 0;
        for bucket in (0..self.losses_before_elimination).rev() {
            let start = self.loss_bracket_starts[bucket];
            let end = self.loss_bracket_starts[bucket + 1];
            let len = end - start;
            let match_start = if len.is_multiple_of(2) {
                start
            } else {
                start + 1
            };
            let num_matches = len / 2;
            let lose_start = match_start + num_matches;

            if match_start != start {
                // bye: moved below the winners so it has to play next round
                self.brackets_back_buffer[lose_start - 1]
                    .store(self.brackets[start], Ordering::Relaxed);
            }

            for i in 0..num_matches {
                let a = self.brackets[match_start + i * 2];
                let b = self.brackets[match_start + i * 2 + 1];
                let winner_slot = start + i;
                let loser_slot = lose_start + i;
                let ctx = ctx.clone();
                let back_buffer = Arc::clone(&self.brackets_back_buffer);
                pool.add_job(move || {
                    let (winner, loser) = ctx.play_decisive(a, b);
                    back_buffer[winner_slot].store(winner, Ordering::Relaxed);
                    back_buffer[loser_slot].store(loser, Ordering::Relaxed);
                });
            }
            scheduled += num_matches;

            self.loss_bracket_starts_back_buffer[bucket + 1] = lose_start;
        }
        scheduled
    }

    /// Schedules a match between the first two singleton buckets, if no bucket
    /// above them can still pair normally.
    fn schedule_cross_bucket_match<E>(
        &self,
        pool: &ThreadPool,
        ctx: &MatchContext<E>,
    ) -> Option<CrossBucketMatch>
    where
        E: MatchEvaluator + ?Sized + 'static,
    {
        let mut upper_bucket = None;
        let mut lower_bucket = None;
        for bucket in 0..self.losses_before_elimination {
            match self.bucket_len(bucket) {
                0 => {}
                1 if upper_bucket.is_none() => upper_bucket = Some(bucket),
                1 => {
                    lower_bucket = Some(bucket);
                    break;
                }
                _ => return None,
            }
        }
        let (upper_bucket, lower_bucket) = (upper_bucket?, lower_bucket?);

        // Both teams already sit in the back buffer as byes; only the winner
        // has to be reported.
        let upper_team = self.brackets[self.loss_bracket_starts[upper_bucket]];
        let lower_team = self.brackets[self.loss_bracket_starts[lower_bucket]];
        let winner = Arc::new(AtomicUsize::new(upper_team));
        {
            let ctx = ctx.clone();
            let winner = Arc::clone(&winner);
            pool.add_job(move || {
                let (w, _) = ctx.play_decisive(upper_team, lower_team);
                winner.store(w, Ordering::Relaxed);
            });
        }
        Some(CrossBucketMatch {
            upper_bucket,
            lower_bucket,
            upper_team,
            winner,
        })
    }

    fn swap_buffers(&mut self, cross: Option<&CrossBucketMatch>) {
        let alive = self.alive_count();
        for (team, slot) in self.brackets[..alive]
            .iter_mut()
            .zip(self.brackets_back_buffer.iter())
        {
            *team = slot.load(Ordering::Relaxed);
        }

        if let Some(cross) = cross {
            // The loser moves down exactly one bucket. Both teams keep their
            // positions; only a boundary moves.
            let moved_boundary = if cross.winner.load(Ordering::Relaxed) == cross.upper_team {
                cross.lower_bucket + 1
            } else {
                cross.upper_bucket + 1
            };
            self.loss_bracket_starts_back_buffer[moved_boundary] -= 1;
        }

        mem::swap(
            &mut self.loss_bracket_starts,
            &mut self.loss_bracket_starts_back_buffer,
        );
        debug_assert_eq!(self.loss_bracket_starts[0], 0);
        debug_assert!(self.loss_bracket_starts.is_sorted());
    }
}

impl fmt::Display for EliminationTournament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.losses_before_elimination;
        for bucket in 0..=last {
            write!(f, "({bucket}) ")?;
            let start = self.loss_bracket_starts[bucket];
            let end = if bucket == last {
                self.team_count
            } else {
                self.loss_bracket_starts[bucket + 1]
            };
            let len = end - start;
            for (i, team) in self.brackets[start..end].iter().enumerate() {
                let paired = bucket != last && (i.is_multiple_of(2) ^ !len.is_multiple_of(2));
                write!(f, "{team}{}", if paired { "-" } else { " " })?;
            }
        }
        Ok(())
    }
}
