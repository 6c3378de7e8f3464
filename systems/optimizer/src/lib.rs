#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Population optimizers and the chunk generation loop.
//!
//! An [`Optimizer`] turns an initial population into a winning candidate
//! over a fixed iteration budget. The [`ChunkGenerator`] builds populations
//! anchored to the level edge, runs the configured optimizer and commits the
//! winner.

mod generator;
mod genetic;
mod particle_swarm;
mod stats;

pub use generator::{ChunkGenerator, ChunkReport, ChunkTicket};
pub use genetic::GeneticAlgorithm;
pub use particle_swarm::ParticleSwarm;
pub use stats::IterationStats;

use std::fmt::Debug;

use clockrun_core::ConfigError;
use clockrun_system_fitness::FitnessEvaluator;
use clockrun_world::{Candidate, CandidateError, LevelError};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Failures raised while generating chunks.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The optimizer was handed no candidates.
    #[error("cannot optimize an empty population")]
    EmptyPopulation,
    /// The configuration was rejected.
    #[error("invalid generator configuration")]
    Config(#[from] ConfigError),
    /// Reading or extending the level failed.
    #[error("level access failed")]
    Level(#[from] LevelError),
    /// A candidate could not be built or recombined.
    #[error("candidate construction failed")]
    Candidate(#[from] CandidateError),
}

/// Result of one optimization run.
#[derive(Clone, Debug)]
pub struct OptimizationOutcome {
    /// Highest-fitness candidate found.
    pub winner: Candidate,
    /// Fitness of the winner.
    pub winner_fitness: i64,
    /// Best fitness of the population before the first iteration.
    pub initial_best: i64,
    /// Per-iteration population summaries.
    pub iterations: Vec<IterationStats>,
}

/// Strategy that evolves a population for a fixed iteration budget.
pub trait Optimizer: Send + Sync + Debug {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Evolves `population` and returns the best candidate found.
    ///
    /// Fails with [`GenerationError::EmptyPopulation`] when `population` is empty.
    fn optimize(
        &self,
        population: Vec<Candidate>,
        evaluator: &FitnessEvaluator,
        rng: &mut ChaCha8Rng,
    ) -> Result<OptimizationOutcome, GenerationError>;
}
