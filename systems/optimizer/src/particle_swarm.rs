use clockrun_core::{ContinuousColumn, PsoConfig, Velocity};
use clockrun_system_fitness::FitnessEvaluator;
use clockrun_system_variation::{pso_move, random_velocity, SwarmCoefficients};
use clockrun_world::Candidate;
use rand_chacha::ChaCha8Rng;

use crate::{GenerationError, IterationStats, OptimizationOutcome, Optimizer};

/// Particle swarm optimizer over the continuous genome.
#[derive(Clone, Copy, Debug)]
pub struct ParticleSwarm {
    config: PsoConfig,
    iterations: u32,
}

#[derive(Debug)]
struct Particle {
    candidate: Candidate,
    fitness: i64,
    velocity: Vec<Velocity>,
    best: Vec<ContinuousColumn>,
    best_fitness: i64,
}

impl ParticleSwarm {
    /// Creates a swarm running `iterations` steps with the given coefficients.
    #[must_use]
    pub const fn new(config: PsoConfig, iterations: u32) -> Self {
        Self { config, iterations }
    }
}

impl Optimizer for ParticleSwarm {
    fn name(&self) -> &'static str {
        "pso"
    }

    fn optimize(
        &self,
        population: Vec<Candidate>,
        evaluator: &FitnessEvaluator,
        rng: &mut ChaCha8Rng,
    ) -> Result<OptimizationOutcome, GenerationError> {
        let mut particles: Vec<Particle> = population
            .into_iter()
            .map(|mut candidate| {
                let fitness = evaluator.evaluate(&mut candidate);
                let velocity = (0..candidate.generation_width())
                    .map(|_| random_velocity(rng))
                    .collect();
                Particle {
                    best: candidate.mutable_snapshot(),
                    best_fitness: fitness,
                    candidate,
                    fitness,
                    velocity,
                }
            })
            .collect();

        let mut global = particles
            .iter()
            .max_by_key(|particle| particle.fitness)
            .map(|particle| particle.candidate.clone())
            .ok_or(GenerationError::EmptyPopulation)?;
        let mut global_fitness = evaluator.evaluate(&mut global);
        let initial_best = global_fitness;
        let mut iterations = Vec::with_capacity(self.iterations as usize);

        for iteration in 0..self.iterations {
            particles.sort_by(|a, b| b.fitness.cmp(&a.fitness));
            let coefficients =
                SwarmCoefficients::scheduled(&self.config, iteration, self.iterations, rng);
            let global_genes = global.mutable_snapshot();

            for particle in &mut particles {
                particle.velocity = pso_move(
                    &mut particle.candidate,
                    &particle.velocity,
                    &particle.best,
                    &global_genes,
                    &coefficients,
                )?;
                particle.fitness = evaluator.evaluate(&mut particle.candidate);
                if particle.fitness > particle.best_fitness {
                    particle.best = particle.candidate.mutable_snapshot();
                    particle.best_fitness = particle.fitness;
                }
            }

            if let Some(leader) = particles.iter().max_by_key(|particle| particle.fitness) {
                if leader.fitness > global_fitness {
                    global = leader.candidate.clone();
                    global_fitness = leader.fitness;
                }
            }

            let fitness: Vec<i64> = particles.iter().map(|particle| particle.fitness).collect();
            if let Some(stats) = IterationStats::measure(iteration, &fitness, Some(coefficients)) {
                tracing::debug!(
                    iteration,
                    best = stats.best,
                    mean = stats.mean,
                    global = global_fitness,
                    "swarm iteration"
                );
                iterations.push(stats);
            }
        }

        Ok(OptimizationOutcome {
            winner: global,
            winner_fitness: global_fitness,
            initial_best,
            iterations,
        })
    }
}
