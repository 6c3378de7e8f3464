use std::sync::atomic::{AtomicU64, Ordering};

use clockrun_core::{GeneratorConfig, Side, Strategy};
use clockrun_system_fitness::FitnessEvaluator;
use clockrun_system_variation::force_playability;
use clockrun_world::{commit, Candidate, CommittedRange, Level};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::{
    GenerationError, GeneticAlgorithm, IterationStats, OptimizationOutcome, Optimizer,
    ParticleSwarm,
};

const RNG_STREAM_CHUNK: &str = "clockrun/chunk";

/// Identity and random stream of one chunk being generated.
#[derive(Debug)]
pub struct ChunkTicket {
    side: Side,
    index: u64,
    rng: ChaCha8Rng,
}

impl ChunkTicket {
    /// Side the chunk grows.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Position of the chunk among those generated on its side.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }
}

/// Summary of a committed chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkReport {
    /// Side the chunk grew.
    pub side: Side,
    /// Position of the chunk among those generated on its side.
    pub index: u64,
    /// Committed columns.
    pub range: CommittedRange,
    /// Fitness of the committed winner.
    pub fitness: i64,
    /// Best fitness of the population before optimization.
    pub initial_best: i64,
    /// Per-iteration population summaries.
    pub iterations: Vec<IterationStats>,
}

/// Generates chunks and splices them onto a level.
///
/// Each chunk draws from its own random stream derived from the configured
/// seed, the side and the chunk's index on that side, so a chunk's content
/// does not depend on how generation is interleaved between sides.
#[derive(Debug)]
pub struct ChunkGenerator {
    config: GeneratorConfig,
    evaluator: FitnessEvaluator,
    optimizer: Box<dyn Optimizer>,
    left_chunks: AtomicU64,
    right_chunks: AtomicU64,
}

impl ChunkGenerator {
    /// Validates `config` and builds the optimizer its strategy selects.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        let iterations = config.population.max_iterations;
        let optimizer: Box<dyn Optimizer> = match config.strategy {
            Strategy::ParticleSwarm => Box::new(ParticleSwarm::new(config.pso, iterations)),
            Strategy::Genetic => Box::new(GeneticAlgorithm::new(config.ga, iterations)),
        };
        Ok(Self {
            evaluator: FitnessEvaluator::new(config.fitness, config.jump_profile()),
            config,
            optimizer,
            left_chunks: AtomicU64::new(0),
            right_chunks: AtomicU64::new(0),
        })
    }

    /// Replaces the optimizer selected by the configured strategy.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Configuration the generator runs with.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Evaluator scoring every candidate.
    #[must_use]
    pub const fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Name of the active optimizer.
    #[must_use]
    pub fn optimizer_name(&self) -> &'static str {
        self.optimizer.name()
    }

    /// Reserves the next chunk index on `side` and derives its random stream.
    pub fn begin_chunk(&self, side: Side) -> ChunkTicket {
        let counter = match side {
            Side::Left => &self.left_chunks,
            Side::Right => &self.right_chunks,
        };
        let index = counter.fetch_add(1, Ordering::Relaxed);
        ChunkTicket {
            side,
            index,
            rng: ChaCha8Rng::seed_from_u64(derive_chunk_seed(
                self.config.population.seed,
                side,
                index,
            )),
        }
    }

    /// Builds the initial population anchored to the current edge of `level`.
    pub fn prepare_population(
        &self,
        level: &Level,
        ticket: &mut ChunkTicket,
    ) -> Result<Vec<Candidate>, GenerationError> {
        let reference = level.reference_region(ticket.side, self.config.chunks.reference_width)?;
        (0..self.config.population.size)
            .map(|_| {
                Candidate::spawn(
                    &reference,
                    ticket.side,
                    self.config.chunks.generation_width,
                    &mut ticket.rng,
                )
                .map_err(GenerationError::from)
            })
            .collect()
    }

    /// Runs the optimizer and applies playability repair when configured.
    pub fn evolve(
        &self,
        population: Vec<Candidate>,
        ticket: &mut ChunkTicket,
    ) -> Result<OptimizationOutcome, GenerationError> {
        let mut outcome = self
            .optimizer
            .optimize(population, &self.evaluator, &mut ticket.rng)?;
        if self.config.force_playability {
            let edits = force_playability(
                &mut outcome.winner,
                self.evaluator.jump(),
                self.config.fitness.max_jump_straight_distance,
            );
            if edits > 0 {
                outcome.winner_fitness = self.evaluator.evaluate(&mut outcome.winner);
                tracing::debug!(edits, fitness = outcome.winner_fitness, "repaired winner");
            }
        }
        Ok(outcome)
    }

    /// Splices the winner onto `level` and reports the result.
    pub fn commit(
        &self,
        level: &mut Level,
        ticket: ChunkTicket,
        outcome: OptimizationOutcome,
    ) -> Result<ChunkReport, GenerationError> {
        let range = commit(level, outcome.winner)?;
        tracing::info!(
            side = ticket.side.label(),
            index = ticket.index,
            from = range.leftmost,
            to = range.rightmost,
            fitness = outcome.winner_fitness,
            initial_best = outcome.initial_best,
            optimizer = self.optimizer.name(),
            "committed chunk"
        );
        Ok(ChunkReport {
            side: ticket.side,
            index: ticket.index,
            range,
            fitness: outcome.winner_fitness,
            initial_best: outcome.initial_best,
            iterations: outcome.iterations,
        })
    }

    /// Generates and commits `count` chunks on `side`, one after another.
    pub fn generate_chunks(
        &self,
        level: &mut Level,
        count: u32,
        side: Side,
    ) -> Result<Vec<ChunkReport>, GenerationError> {
        let mut reports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut ticket = self.begin_chunk(side);
            let population = self.prepare_population(level, &mut ticket)?;
            let outcome = self.evolve(population, &mut ticket)?;
            reports.push(self.commit(level, ticket, outcome)?);
        }
        Ok(reports)
    }

    /// Synchronous start-up generation: half the chunks to the left, the rest to the right.
    pub fn pregenerate(
        &self,
        level: &mut Level,
        chunks: u32,
    ) -> Result<Vec<ChunkReport>, GenerationError> {
        let left = chunks / 2;
        let mut reports = self.generate_chunks(level, left, Side::Left)?;
        reports.extend(self.generate_chunks(level, chunks - left, Side::Right)?);
        Ok(reports)
    }
}

fn derive_chunk_seed(base: u64, side: Side, index: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(RNG_STREAM_CHUNK.as_bytes());
    hasher.update(side.label().as_bytes());
    hasher.update(index.to_le_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
