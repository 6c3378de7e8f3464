#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Variation operators that move candidates through the genome space.
//!
//! Every operator writes through [`clockrun_world::Candidate::mutable_gene_mut`],
//! so reference columns stay untouched and cached fitness is dropped.

mod crossover;
mod mutation;
mod repair;
mod swarm;

pub use crossover::crossover;
pub use mutation::mutate;
pub use repair::force_playability;
pub use swarm::{pso_move, random_velocity, SwarmCoefficients};
