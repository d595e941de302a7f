//! Evaluation seam between the checkers AI and its trainer.
//!
//! This crate holds what the trainer needs to know about the game-playing side:
//!
//! 1. **Genome** ([`genome`]) - The evaluation weights a minimax player is
//!    parameterized with, addressable both by name and by index.
//!
//! 2. **Match Evaluation** ([`match_evaluator`]) - Playing a full game between
//!    two genomes and reporting who won.
//!
//! # Architecture
//!
//! ```text
//! Genetic Algorithm (checkers-training)
//!     ↓ asks
//! Match Evaluator (play one game)
//!     ↓ parameterized by
//! Genome (board evaluation weights)
//! ```
//!
//! The board, move generation and search live outside this workspace. Anything
//! implementing [`MatchEvaluator`] can be plugged into the trainer; the
//! [`ReferenceMatchEvaluator`] provided here is a deterministic stand-in that
//! judges genomes against a reference brain, which is enough to drive and test
//! the training loop end to end.
//!
//! # Example
//!
//! ```
//! use checkers_evaluator::{Genome, MatchEvaluator, MatchOutcome, ReferenceMatchEvaluator};
//!
//! let evaluator = ReferenceMatchEvaluator::new(Genome::default(), 5);
//! let outcome = evaluator.play_match(&Genome::default(), &Genome::default());
//! assert_eq!(outcome, MatchOutcome::Draw);
//! ```

pub use self::{
    genome::Genome,
    match_evaluator::{MatchEvaluator, MatchOutcome, POINTS_PER_MATCH, ReferenceMatchEvaluator},
};

pub mod genome;
pub mod match_evaluator;
