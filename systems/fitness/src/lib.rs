#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic fitness scoring for candidate chunks.
//!
//! Scores are additive: a base reward for covering the span plus independent
//! terms for ground continuity, spike clustering, safe-jump reachability and
//! pickup timing. Higher is better.

mod jump;

pub use jump::is_jump_possible;

use clockrun_core::{Column, FitnessConfig, JumpProfile};
use clockrun_world::Candidate;

/// Per-term decomposition of a fitness score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FitnessBreakdown {
    /// Reward for the covered width.
    pub base: i64,
    /// Height deltas and hole runs.
    pub ground: i64,
    /// Spike runs and spike density.
    pub spikes: i64,
    /// Unreachable hazard runs between safe columns.
    pub safe_jumps: i64,
    /// Deviation of collected clock time from the ideal.
    pub clocks: i64,
}

impl FitnessBreakdown {
    /// Sum of every term.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.base + self.ground + self.spikes + self.safe_jumps + self.clocks
    }
}

/// Pure scoring function parameterised by tuning and player physics.
#[derive(Clone, Copy, Debug)]
pub struct FitnessEvaluator {
    config: FitnessConfig,
    jump: JumpProfile,
}

impl FitnessEvaluator {
    /// Creates an evaluator for the provided tuning and jump envelope.
    #[must_use]
    pub const fn new(config: FitnessConfig, jump: JumpProfile) -> Self {
        Self { config, jump }
    }

    /// Jump envelope the evaluator scores against.
    #[must_use]
    pub const fn jump(&self) -> &JumpProfile {
        &self.jump
    }

    /// Tuning the evaluator scores with.
    #[must_use]
    pub const fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Scores a candidate, reusing the cached value when it is still valid.
    pub fn evaluate(&self, candidate: &mut Candidate) -> i64 {
        if let Some(fitness) = candidate.cached_fitness() {
            return fitness;
        }
        let fitness = self.score(&candidate.columns());
        candidate.record_fitness(fitness);
        fitness
    }

    /// Total score of a left-to-right column sequence.
    #[must_use]
    pub fn score(&self, columns: &[Column]) -> i64 {
        self.breakdown(columns).total()
    }

    /// Individual terms of the score of a left-to-right column sequence.
    #[must_use]
    pub fn breakdown(&self, columns: &[Column]) -> FitnessBreakdown {
        FitnessBreakdown {
            base: self.config.width_reward * columns.len() as i64,
            ground: self.ground_term(columns),
            spikes: self.spike_term(columns),
            safe_jumps: self.safe_jump_term(columns),
            clocks: self.clock_term(columns),
        }
    }

    fn ground_term(&self, columns: &[Column]) -> i64 {
        let max_hole = u64::from(self.config.max_jumpable_hole);
        let max_step = u64::from(self.jump.max_block_jump_height());
        let mut term = 0;
        let mut hole = 0_u64;
        for pair in columns.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if previous.obstacle_height() == 0 {
                hole += 1;
                if hole > max_hole {
                    term -= self.config.hole_penalty;
                }
            } else {
                hole = 0;
            }
            let delta = u64::from(previous.obstacle_height().abs_diff(current.obstacle_height()));
            if delta > max_step {
                term -= self.config.height_penalty * delta as i64;
            } else {
                term += self.config.smooth_step_reward - 2 * delta as i64;
            }
        }
        term
    }

    fn spike_term(&self, columns: &[Column]) -> i64 {
        let max_run = self.config.max_jump_straight_distance as usize;
        let mut term = 0;
        let mut total = 0_usize;
        for run in columns
            .split(|column| !column.has_spike())
            .filter(|run| !run.is_empty())
        {
            total += run.len();
            if run.len() > max_run {
                term -= run.len() as i64 * self.config.spike_penalty;
            }
        }
        let allowed = columns.len() as f64 * self.config.spike_density;
        if total as f64 > allowed {
            let excess = total as i64 - (allowed + 1e-9).floor() as i64;
            term -= excess * self.config.spike_penalty;
        }
        term
    }

    fn safe_jump_term(&self, columns: &[Column]) -> i64 {
        let Some(last) = columns.len().checked_sub(1) else {
            return 0;
        };
        let max_run = i64::from(self.config.max_jump_straight_distance);
        let mut term = 0;

        let mut current = Some(0);
        while let Some(from) = current {
            let next = (from + 1..columns.len()).find(|index| columns[*index].is_safe());
            let hazards = match next {
                Some(to) if is_jump_possible(columns, from, to, &self.jump) => 0,
                Some(to) => (to - 1 - from) as i64,
                None => (last - from) as i64,
            };
            if hazards > max_run {
                term -= self.config.hazard_penalty * hazards;
            }
            current = next;
        }

        let mut current = Some(last);
        while let Some(from) = current {
            let previous = (0..from).rev().find(|index| columns[*index].is_safe());
            let hazards = match previous {
                Some(to) if is_jump_possible(columns, from, to, &self.jump) => 0,
                Some(to) => (from - to - 1) as i64,
                None => from as i64,
            };
            if hazards > max_run {
                term -= self.config.hazard_penalty * hazards;
            }
            current = previous;
        }
        term
    }

    fn clock_term(&self, columns: &[Column]) -> i64 {
        let run_time = columns.len() as f64 * self.jump.time_to_walk_tile();
        let ideal = run_time * self.config.ideal_extra_time_factor;
        let extra: f64 = columns
            .iter()
            .filter(|column| column.has_clock())
            .map(|column| f64::from(column.clock_extra_time()))
            .sum();
        (self.config.clock_reward_scale * ideal - (ideal - extra).abs()) as i64
    }
}
