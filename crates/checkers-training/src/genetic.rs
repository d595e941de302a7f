//! Generation controller: the evolutionary loop over a population of genomes.
//!
//! A [`GeneticAlgorithm`] owns the population, the worker pool and the
//! tournament scheduler for a whole training run. Each call to
//! [`GeneticAlgorithm::process_generation`] performs one generation:
//!
//! 1. **Evaluate** - play a tournament; every game's points accumulate into the
//!    genomes' scores (reset at the start of the tournament)
//! 2. **Rank** - order genomes by descending score, lower index winning ties,
//!    and snapshot the top genome as the elite
//! 3. **Breed** - slot 0 of the next population is the elite, unchanged. Every
//!    other slot is the uniform crossover of two distinct parents drawn by
//!    score-weighted roulette among the top `top_fraction` of genomes. When only
//!    one genome survives, the offspring is a verbatim copy of it
//! 4. **Normalize** - rescale every offspring to `target_magnitude`
//! 5. **Mutate** - add uniform noise whose strength grows linearly with the slot
//!    index, from 0 at the elite to `max_mutation` at the last slot
//! 6. **Record** - append the elite to the fittest log, if one is configured
//!
//! # Fitness
//!
//! Fitness is the number of points a genome collected in the current
//! generation's tournament (win 2, draw 1, loss 0). It is used directly as the
//! roulette weight. Elimination places are reported in
//! [`Standings::places`] but do not affect selection.
//!
//! # Reproducibility
//!
//! All randomness comes from one [`Pcg64`] seeded from
//! [`TrainingConfig::seed`]. Matches run concurrently, so a run is reproducible
//! only if the match evaluator is deterministic.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use checkers_evaluator::{Genome, ReferenceMatchEvaluator};
//! use checkers_training::genetic::{GeneticAlgorithm, TrainingConfig};
//!
//! let config = TrainingConfig {
//!     population_log2: 2,
//!     seed: Some(7),
//!     ..TrainingConfig::default()
//! };
//! let evaluator = Arc::new(ReferenceMatchEvaluator::new(Genome::default(), 3));
//! let mut ga = GeneticAlgorithm::new(config, evaluator, Genome::default()).unwrap();
//! for _ in 0..3 {
//!     let report = ga.process_generation().unwrap();
//!     assert!(report.standings.is_conserved());
//! }
//! assert_eq!(ga.generation(), 3);
//! assert_eq!(ga.population()[0], *ga.fittest());
//! ```

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use checkers_evaluator::{Genome, MatchEvaluator};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    fittest_log::FittestLog,
    selection::RankTable,
    stats::DescriptiveStats,
    thread_pool::{PoolError, ThreadPool},
    tournament::{
        MatchContext, ScoreBoard, Standings, Tournament, TournamentError, TournamentKind,
    },
    weights,
};

/// Largest supported `population_log2`.
pub const MAX_POPULATION_LOG2: u32 = 16;

/// Errors raised by the generation controller.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("invalid training configuration: {reason}")]
    InvalidConfig { reason: String },
    #[display("tournament failed")]
    #[from]
    Tournament(TournamentError),
    #[display("worker pool failed")]
    #[from]
    Pool(PoolError),
    #[display("training has been released")]
    Released,
}

/// Parameters of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// The population holds `2^population_log2` genomes.
    pub population_log2: u32,
    /// Mutation strength applied to the last population slot.
    pub max_mutation: f64,
    /// Fraction of the ranked population eligible as parents.
    pub top_fraction: f64,
    /// Mean absolute weight every offspring is rescaled to.
    pub target_magnitude: f64,
    /// Keep [`Genome::REFERENCE_WEIGHT`] fixed as a reference constant.
    pub pin_reference_weight: bool,
    /// Standard deviation of the Gaussian jitter applied to the initial
    /// population (slot 0 excluded). Zero starts from identical genomes.
    pub initial_spread: f64,
    /// Tournament used to score each generation.
    pub tournament: TournamentKind,
    /// Number of worker threads; defaults to the available parallelism.
    pub worker_count: Option<NonZeroUsize>,
    /// Seed of the random source; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// CSV file receiving the elite of every generation.
    pub log_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_log2: 4,
            max_mutation: 0.1,
            top_fraction: 0.5,
            target_magnitude: Genome::default().mean_abs_weight(),
            pin_reference_weight: false,
            initial_spread: 0.5,
            tournament: TournamentKind::default(),
            worker_count: None,
            seed: None,
            log_path: None,
        }
    }
}

impl TrainingConfig {
    /// Number of genomes in the population.
    #[must_use]
    pub fn population_size(&self) -> usize {
        1 << self.population_log2
    }

    /// Index of the weight kept fixed, if any.
    #[must_use]
    pub fn reference_weight(&self) -> Option<usize> {
        self.pin_reference_weight
            .then_some(Genome::REFERENCE_WEIGHT)
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<(), TrainingError> {
        let invalid = |reason: String| Err(TrainingError::InvalidConfig { reason });
        if self.population_log2 > MAX_POPULATION_LOG2 {
            return invalid(format!(
                "population_log2 must be at most {MAX_POPULATION_LOG2}, got {}",
                self.population_log2
            ));
        }
        if !(self.max_mutation.is_finite() && self.max_mutation >= 0.0) {
            return invalid(format!(
                "max_mutation must be a non-negative number, got {}",
                self.max_mutation
            ));
        }
        if !(self.top_fraction > 0.0 && self.top_fraction <= 1.0) {
            return invalid(format!(
                "top_fraction must be in (0, 1], got {}",
                self.top_fraction
            ));
        }
        if !(self.target_magnitude.is_finite() && self.target_magnitude > 0.0) {
            return invalid(format!(
                "target_magnitude must be a positive number, got {}",
                self.target_magnitude
            ));
        }
        if !(self.initial_spread.is_finite() && self.initial_spread >= 0.0) {
            return invalid(format!(
                "initial_spread must be a non-negative number, got {}",
                self.initial_spread
            ));
        }
        if let TournamentKind::Elimination {
            losses_before_elimination: 0,
        } = self.tournament
        {
            return invalid("losses_before_elimination must be at least 1".to_owned());
        }
        Ok(())
    }
}

/// Summary of one processed generation.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// 1-based number of the generation just processed.
    pub generation: usize,
    /// Index of the elite in the evaluated population.
    pub elite_index: usize,
    /// Points collected by the elite.
    pub elite_score: u32,
    /// The elite genome, now in slot 0 of the population.
    pub elite: Genome,
    /// Tournament result of the evaluated population.
    pub standings: Standings,
    /// Distribution of the tournament scores.
    pub score_stats: DescriptiveStats,
    /// Distribution of each weight over the new population, in
    /// [`Genome::NAMES`] order.
    pub weight_stats: Vec<DescriptiveStats>,
}

/// An evolutionary training run.
#[derive(Debug)]
pub struct GeneticAlgorithm<E: ?Sized> {
    config: TrainingConfig,
    evaluator: Arc<E>,
    pool: ThreadPool,
    tournament: Tournament,
    scores: Arc<ScoreBoard>,
    population: Arc<[Genome]>,
    fittest: Genome,
    rng: Pcg64,
    log: Option<FittestLog>,
    generation: usize,
    released: bool,
}

impl<E> GeneticAlgorithm<E>
where
    E: MatchEvaluator + ?Sized + 'static,
{
    /// Starts a training run with every slot holding `seed`.
    ///
    /// Unless `initial_spread` is zero, every slot but the first is then
    /// jittered with [`randomize`](Self::randomize). The worker pool, the
    /// tournament state and the fittest log are created here and reused for
    /// every generation.
    pub fn new(
        config: TrainingConfig,
        evaluator: Arc<E>,
        seed: Genome,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let size = config.population_size();

        let pool = ThreadPool::new(config.worker_count)?;
        let tournament = Tournament::new(config.tournament, size)?;
        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_rng(&mut rand::rng()),
        };
        let log = config.log_path.as_ref().map(FittestLog::create);

        log::info!(
            "training {size} genomes with {} worker(s), {:?}",
            pool.worker_count(),
            config.tournament
        );

        let mut this = Self {
            evaluator,
            pool,
            tournament,
            scores: Arc::new(ScoreBoard::new(size)),
            population: vec![seed; size].into(),
            fittest: seed,
            rng,
            log,
            generation: 0,
            released: false,
            config,
        };
        this.randomize(this.config.initial_spread);
        Ok(this)
    }

    /// Adds Gaussian noise with standard deviation `sigma` to every genome
    /// except slot 0.
    pub fn randomize(&mut self, sigma: f64) {
        let reference = self.config.reference_weight();
        let mut population = self.population.to_vec();
        for genome in population.iter_mut().skip(1) {
            weights::randomize(genome, sigma, reference, &mut self.rng);
        }
        self.population = population.into();
    }

    /// Runs one generation and returns its report.
    ///
    /// Must not be called after [`release`](Self::release).
    pub fn process_generation(&mut self) -> Result<GenerationReport, TrainingError> {
        if self.released {
            return Err(TrainingError::Released);
        }

        let ctx = MatchContext::new(
            Arc::clone(&self.population),
            Arc::clone(&self.evaluator),
            Arc::clone(&self.scores),
        );
        let standings = self.tournament.run(&self.pool, &ctx)?;
        drop(ctx);
        debug_assert!(standings.is_conserved(), "points must be conserved");

        let table = RankTable::new(&standings.scores, self.config.top_fraction);
        let elite_index = table.top();
        let elite = self.population[elite_index];

        let next = self.breed(&table);
        debug_assert_eq!(next[0], elite);
        self.population = next.into();
        self.fittest = elite;
        self.generation += 1;

        if let Some(log) = &mut self.log {
            log.append(&elite);
        }

        let score_stats = DescriptiveStats::from_scores(&standings.scores)
            .expect("population is never empty");
        let weight_stats = (0..Genome::LEN)
            .filter_map(|i| DescriptiveStats::new(self.population.iter().map(|g| g[i])))
            .collect();

        log::info!(
            "generation {}: elite #{elite_index} scored {} of {} point(s) in {} of at most {} game(s)",
            self.generation,
            table.score(elite_index),
            standings.total_points(),
            standings.games_played,
            self.tournament.max_num_games()
        );

        Ok(GenerationReport {
            generation: self.generation,
            elite_index,
            elite_score: table.score(elite_index),
            elite,
            standings,
            score_stats,
            weight_stats,
        })
    }

    fn breed(&mut self, table: &RankTable) -> Vec<Genome> {
        let size = self.population.len();
        let reference = self.config.reference_weight();

        let mut next = Vec::with_capacity(size);
        next.push(self.population[table.top()]);
        for slot in 1..size {
            let a = table.sample(&mut self.rng);
            let mut child = match table.sample_excluding(&mut self.rng, a) {
                Some(b) => weights::uniform_crossover(
                    &self.population[a],
                    &self.population[b],
                    reference,
                    &mut self.rng,
                ),
                None => self.population[a],
            };
            if !weights::normalize_magnitude(&mut child, self.config.target_magnitude, reference) {
                log::trace!("offspring in slot {slot} cannot be normalized");
            }
            next.push(child);
        }

        for (slot, child) in next.iter_mut().enumerate().skip(1) {
            let strength = weights::mutation_strength(slot, size, self.config.max_mutation);
            weights::mutate(child, strength, reference, &mut self.rng);
        }
        next
    }

    /// The elite of the last processed generation, or the seed genome before
    /// the first one.
    #[must_use]
    pub fn fittest(&self) -> &Genome {
        &self.fittest
    }

    /// The current population; slot 0 holds the elite.
    #[must_use]
    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    /// Number of generations processed so far.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Configuration of this run.
    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Path of the fittest log, if it is still recording.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log
            .as_ref()
            .filter(|log| log.is_enabled())
            .map(FittestLog::path)
    }

    /// Stops the worker pool and closes the fittest log.
    ///
    /// The population and the fittest genome stay readable. Calling this more
    /// than once is harmless; it also happens on drop.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.pool.release();
        self.log = None;
        self.released = true;
        log::debug!("training released after {} generation(s)", self.generation);
    }
}
