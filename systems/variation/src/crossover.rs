use clockrun_core::JumpProfile;
use clockrun_world::{Candidate, CandidateError};
use rand::Rng;

/// Single-point recombination of two candidates sharing the same geometry.
///
/// The cut is drawn from the middle third of the mutable range. A cut is
/// accepted when the ground delta across it stays below the climbable block
/// height; otherwise later cuts are probed, wrapping back to the start of
/// the middle third, for at most as many tries as the third is wide. When
/// every probe fails the cut with the smallest delta is used. The child's
/// reference region is a verbatim copy of the parent supplying its left side.
pub fn crossover<R: Rng + ?Sized>(
    a: &Candidate,
    b: &Candidate,
    jump: &JumpProfile,
    rng: &mut R,
) -> Result<Candidate, CandidateError> {
    let (left, right) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };
    let left_genes = left.mutable_snapshot();
    let right_genes = right.mutable_snapshot();
    if left_genes.len() != right_genes.len() {
        return Err(CandidateError::GeometryMismatch);
    }

    let range = left_genes.len();
    let left_limit = (range / 3).max(1);
    let right_limit = (range - range / 3).max(left_limit + 1).min(range);
    let (generation_head, _) = left.generation_bounds();
    if left_limit >= right_limit {
        // Too narrow to pick a middle third; keep the left parent whole.
        return Candidate::splice_at(left, right, generation_head + range as i32);
    }

    let delta = |cut: usize| {
        left_genes[cut - 1]
            .ground_height()
            .abs_diff(right_genes[cut].ground_height())
    };
    let max_tries = right_limit - left_limit + 1;
    let mut cut = rng.gen_range(left_limit..right_limit);
    let mut best = cut;
    let mut tries = 0;
    while delta(cut) >= jump.max_block_jump_height() {
        if delta(cut) < delta(best) {
            best = cut;
        }
        tries += 1;
        if tries >= max_tries {
            tracing::debug!(
                tries,
                cut = best,
                delta = delta(best),
                "crossover found no climbable cut"
            );
            cut = best;
            break;
        }
        cut += 1;
        if cut >= right_limit {
            cut = left_limit;
        }
    }

    Candidate::splice_at(left, right, generation_head + cut as i32)
}
