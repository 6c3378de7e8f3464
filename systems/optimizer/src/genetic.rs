use clockrun_core::GaConfig;
use clockrun_system_fitness::FitnessEvaluator;
use clockrun_system_variation::{crossover, mutate};
use clockrun_world::Candidate;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{GenerationError, IterationStats, OptimizationOutcome, Optimizer};

/// Generational genetic algorithm with elitism.
#[derive(Clone, Copy, Debug)]
pub struct GeneticAlgorithm {
    config: GaConfig,
    iterations: u32,
}

impl GeneticAlgorithm {
    /// Creates an algorithm running `iterations` generations.
    #[must_use]
    pub const fn new(config: GaConfig, iterations: u32) -> Self {
        Self { config, iterations }
    }

    fn elite_count(&self, population: usize) -> usize {
        ((population as f64 * self.config.elitism).round() as usize).clamp(1, population)
    }
}

impl Optimizer for GeneticAlgorithm {
    fn name(&self) -> &'static str {
        "ga"
    }

    fn optimize(
        &self,
        mut population: Vec<Candidate>,
        evaluator: &FitnessEvaluator,
        rng: &mut ChaCha8Rng,
    ) -> Result<OptimizationOutcome, GenerationError> {
        let initial_best = population
            .iter_mut()
            .map(|candidate| evaluator.evaluate(candidate))
            .max()
            .ok_or(GenerationError::EmptyPopulation)?;
        let mut iterations = Vec::with_capacity(self.iterations as usize);

        for iteration in 0..self.iterations {
            sort_by_fitness(&mut population, evaluator);
            let elite = self.elite_count(population.len());
            let fitness: Vec<i64> = population
                .iter_mut()
                .map(|candidate| evaluator.evaluate(candidate))
                .collect();

            let mut children = Vec::with_capacity(population.len() - elite);
            for _ in elite..population.len() {
                let a = &population[select_parent(&fitness, rng)];
                let b = &population[select_parent(&fitness, rng)];
                children.push(crossover(a, b, evaluator.jump(), rng)?);
            }
            population.truncate(elite);
            population.extend(children);

            for candidate in &mut population[elite..] {
                let _ = mutate(candidate, self.config.mutation_rate, rng);
            }

            let fitness: Vec<i64> = population
                .iter_mut()
                .map(|candidate| evaluator.evaluate(candidate))
                .collect();
            if let Some(stats) = IterationStats::measure(iteration, &fitness, None) {
                tracing::debug!(
                    iteration,
                    best = stats.best,
                    mean = stats.mean,
                    "genetic generation"
                );
                iterations.push(stats);
            }
        }

        sort_by_fitness(&mut population, evaluator);
        let mut winner = population
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyPopulation)?;
        let winner_fitness = evaluator.evaluate(&mut winner);
        Ok(OptimizationOutcome {
            winner,
            winner_fitness,
            initial_best,
            iterations,
        })
    }
}

fn sort_by_fitness(population: &mut [Candidate], evaluator: &FitnessEvaluator) {
    for candidate in population.iter_mut() {
        let _ = evaluator.evaluate(candidate);
    }
    population.sort_by_key(|candidate| std::cmp::Reverse(candidate.cached_fitness()));
}

/// Fitness-proportional pick: draws a threshold between the worst and best
/// fitness and walks from a random index to the first candidate reaching it.
fn select_parent<R: Rng + ?Sized>(fitness: &[i64], rng: &mut R) -> usize {
    let (Some(min), Some(max)) = (fitness.iter().min(), fitness.iter().max()) else {
        return 0;
    };
    let start = rng.gen_range(0..fitness.len());
    if min == max {
        return start;
    }
    let threshold = rng.gen_range(*min..=*max);
    (0..fitness.len())
        .map(|offset| (start + offset) % fitness.len())
        .find(|index| fitness[*index] >= threshold)
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn selection_favours_fitter_candidates() {
        let fitness = [0, 0, 0, 100];
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let picks = (0..400)
            .filter(|_| select_parent(&fitness, &mut rng) == 3)
            .count();
        assert!(picks > 100, "picked the fittest {picks} times");
    }

    #[test]
    fn selection_is_uniform_on_flat_fitness() {
        let fitness = [5; 6];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [false; 6];
        for _ in 0..200 {
            seen[select_parent(&fitness, &mut rng)] = true;
        }
        assert!(seen.iter().all(|seen| *seen));
    }

    #[test]
    fn at_least_one_elite_survives() {
        let algorithm = GeneticAlgorithm::new(GaConfig::default(), 1);
        assert_eq!(algorithm.elite_count(30), 2);
        assert_eq!(algorithm.elite_count(4), 1);
        assert_eq!(algorithm.elite_count(1), 1);
    }
}
