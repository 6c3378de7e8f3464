use clockrun_core::{Column, FitnessConfig, JumpProfile, Side};
use clockrun_system_fitness::FitnessEvaluator;
use clockrun_world::{Candidate, ColumnChain};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn candidate(seed: u64) -> Candidate {
    let reference =
        ColumnChain::from_values(0, (0..10).map(|_| Column::new(3))).expect("reference");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Candidate::spawn(&reference, Side::Right, 20, &mut rng).expect("candidate")
}

#[test]
fn evaluation_is_cached_until_a_gene_changes() {
    let evaluator = FitnessEvaluator::new(FitnessConfig::default(), JumpProfile::default());
    let mut candidate = candidate(42);

    let first = evaluator.evaluate(&mut candidate);
    assert_eq!(candidate.cached_fitness(), Some(first));
    assert_eq!(first, evaluator.score(&candidate.columns()));

    let id = candidate.mutable_ids()[5];
    if let Some(gene) = candidate.mutable_gene_mut(id) {
        gene.set_ground(12.0);
        gene.set_has_spike(true);
    }
    assert_eq!(candidate.cached_fitness(), None);
    let second = evaluator.evaluate(&mut candidate);
    assert_eq!(second, evaluator.score(&candidate.columns()));
}

#[test]
fn scoring_is_deterministic() {
    let evaluator = FitnessEvaluator::new(FitnessConfig::default(), JumpProfile::default());
    let columns = candidate(7).columns();
    let breakdown = evaluator.breakdown(&columns);
    assert_eq!(breakdown, evaluator.breakdown(&columns));
    assert_eq!(breakdown.total(), evaluator.score(&columns));
    assert_eq!(breakdown.base, 200 * 30);
}
