use clockrun_world::Candidate;
use rand::Rng;

/// Perturbs every mutable column independently, one coin per trait.
///
/// With probability `rate` each: the spike flag flips, the clock flag flips,
/// the clock bonus moves by up to half a second and the ground shifts one
/// tile up or down. Reference columns are never touched. Returns the number
/// of traits changed.
pub fn mutate<R: Rng + ?Sized>(candidate: &mut Candidate, rate: f64, rng: &mut R) -> usize {
    if rate.is_nan() || rate <= 0.0 {
        return 0;
    }
    let rate = rate.min(1.0);
    let mut changed = 0;
    for id in candidate.mutable_ids() {
        let Some(gene) = candidate.mutable_gene_mut(id) else {
            continue;
        };
        if rng.gen_bool(rate) {
            gene.toggle_spike();
            changed += 1;
        }
        if rng.gen_bool(rate) {
            gene.toggle_clock();
            changed += 1;
        }
        if rng.gen_bool(rate) {
            let delta: f32 = rng.gen_range(-0.5..0.5);
            gene.set_extra_time(gene.extra_time() + delta);
            changed += 1;
        }
        if rng.gen_bool(rate) {
            gene.shift_ground(if rng.gen_bool(0.5) { 1 } else { -1 });
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockrun_core::{Column, Side};
    use clockrun_world::ColumnChain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn candidate(rng: &mut ChaCha8Rng) -> Candidate {
        let reference = ColumnChain::from_values(0, (0..6).map(|_| Column::new(3))).expect("reference");
        Candidate::spawn(&reference, Side::Right, 12, rng).expect("candidate")
    }

    #[test]
    fn zero_rate_leaves_candidate_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut candidate = candidate(&mut rng);
        let before = candidate.mutable_snapshot();
        assert_eq!(mutate(&mut candidate, 0.0, &mut rng), 0);
        assert_eq!(candidate.mutable_snapshot(), before);
    }

    #[test]
    fn full_rate_flips_every_flag_and_keeps_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut candidate = candidate(&mut rng);
        candidate.record_fitness(1);
        let before = candidate.mutable_snapshot();
        let reference = candidate.reference_snapshot();

        assert_eq!(mutate(&mut candidate, 1.0, &mut rng), 4 * 12);
        assert_eq!(candidate.cached_fitness(), None);
        assert_eq!(candidate.reference_snapshot(), reference);
        for (after, before) in candidate.mutable_snapshot().iter().zip(&before) {
            assert_eq!(after.spike() > 0.0, before.spike() <= 0.0);
            assert_eq!(after.clock() > 0.0, before.clock() <= 0.0);
            assert!((after.ground() - before.ground()).abs() <= 1.0 + 1e-9);
            assert!((2.0..=10.0).contains(&after.extra_time()));
        }
    }
}
