use clockrun_core::{ContinuousColumn, PsoConfig, Velocity};
use clockrun_world::{Candidate, CandidateError};
use rand::Rng;

/// Coefficients of one particle-swarm step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwarmCoefficients {
    /// Inertia weight.
    pub w: f64,
    /// Cognitive acceleration toward the personal best.
    pub c1: f64,
    /// Random factor of the cognitive term.
    pub r1: f64,
    /// Social acceleration toward the global best.
    pub c2: f64,
    /// Random factor of the social term.
    pub r2: f64,
}

impl SwarmCoefficients {
    /// Coefficients for `iteration` out of `iterations`.
    ///
    /// Inertia decays quadratically toward zero, the cognitive weight slides
    /// from `c_max` to `c_min` while the social weight slides the other way,
    /// and both random factors are drawn from `r_min..r_max`.
    pub fn scheduled<R: Rng + ?Sized>(
        config: &PsoConfig,
        iteration: u32,
        iterations: u32,
        rng: &mut R,
    ) -> Self {
        let n = f64::from(iterations.max(1));
        let i = f64::from(iteration.min(iterations));
        let progress = i / n;
        Self {
            w: config.w * (i - n) / (n * n) + config.w,
            c1: lerp(config.c_max, config.c_min, progress),
            r1: lerp(config.r_min, config.r_max, rng.gen::<f64>()),
            c2: lerp(config.c_min, config.c_max, progress),
            r2: lerp(config.r_min, config.r_max, rng.gen::<f64>()),
        }
    }
}

/// Starting velocity of a fresh particle column.
pub fn random_velocity<R: Rng + ?Sized>(rng: &mut R) -> Velocity {
    Velocity {
        ground: rng.gen_range(0.0..4.0) - 2.0,
        spike: rng.gen_range(-1.0..1.0),
        clock: rng.gen_range(-1.0..1.0),
        extra_time: rng.gen_range(-1.5..1.5),
    }
}

/// Moves every mutable column of a particle and returns its next velocity.
///
/// Each trait follows `v' = w·v + c1·r1·(personal − x) + c2·r2·(global − x)`
/// and `x += v'`. Clamps may shorten the step, so the returned velocity is
/// the displacement that actually happened.
pub fn pso_move(
    candidate: &mut Candidate,
    velocity: &[Velocity],
    personal_best: &[ContinuousColumn],
    global_best: &[ContinuousColumn],
    coefficients: &SwarmCoefficients,
) -> Result<Vec<Velocity>, CandidateError> {
    let ids = candidate.mutable_ids();
    if velocity.len() != ids.len()
        || personal_best.len() != ids.len()
        || global_best.len() != ids.len()
    {
        return Err(CandidateError::GeometryMismatch);
    }
    let SwarmCoefficients { w, c1, r1, c2, r2 } = *coefficients;
    let step = |current: f64, velocity: f64, personal: f64, global: f64| {
        w * velocity + c1 * r1 * (personal - current) + c2 * r2 * (global - current)
    };

    let mut next = Vec::with_capacity(ids.len());
    for (index, id) in ids.into_iter().enumerate() {
        let Some(gene) = candidate.mutable_gene_mut(id) else {
            return Err(CandidateError::GeometryMismatch);
        };
        let (v, p, g) = (&velocity[index], &personal_best[index], &global_best[index]);
        let proposed = Velocity {
            ground: step(gene.ground(), v.ground, p.ground(), g.ground()),
            spike: step(gene.spike(), v.spike, p.spike(), g.spike()),
            clock: step(gene.clock(), v.clock, p.clock(), g.clock()),
            extra_time: step(
                f64::from(gene.extra_time()),
                v.extra_time,
                f64::from(p.extra_time()),
                f64::from(g.extra_time()),
            ),
        };
        next.push(gene.displace(&proposed));
    }
    Ok(next)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
