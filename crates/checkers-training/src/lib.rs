//! Evolutionary training of checkers evaluation weights.
//!
//! This crate evolves [`Genome`](checkers_evaluator::Genome)s, the weight
//! vectors that parameterize a minimax checkers player. There is no fixed
//! fitness function: genomes are scored only relative to each other, by playing
//! matches within the population.
//!
//! # How Training Works
//!
//! 1. **Population** - `2^k` genomes, initially jittered copies of a seed genome
//! 2. **Tournament** - genomes play each other on a worker pool; every game's
//!    points go to the players
//! 3. **Selection** - parents are drawn by score-weighted roulette among the
//!    best-ranked genomes
//! 4. **Reproduction** - uniform crossover, magnitude normalization and
//!    slot-scaled mutation build the next population around the elite
//! 5. **Repeat** - one generation per [`GeneticAlgorithm::process_generation`]
//!    call, with the elite of each generation optionally logged to CSV
//!
//! # Architecture
//!
//! ```text
//! GeneticAlgorithm (genetic)
//!     ↓ runs                 ↓ ranks with         ↓ breeds with
//! Tournament (tournament)   RankTable (selection)  operators (weights)
//!     ↓ queues matches on
//! ThreadPool (thread_pool)
//!     ↓ each job calls
//! MatchEvaluator (checkers-evaluator)
//! ```
//!
//! # Current Limitations
//!
//! - **Relative fitness only**: scores say how a genome did against this
//!   generation's population, not against a fixed opponent, so progress across
//!   generations is not directly measurable
//! - **No timeout**: a match that never returns stalls the whole generation
//! - **Concurrent matches**: runs are reproducible from a seed only when the
//!   match evaluator is deterministic
//!
//! [`GeneticAlgorithm::process_generation`]: genetic::GeneticAlgorithm::process_generation

pub mod fittest_log;
pub mod genetic;
pub mod selection;
pub mod stats;
pub mod thread_pool;
pub mod tournament;
pub mod weights;
