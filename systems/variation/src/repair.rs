use clockrun_core::{JumpProfile, Side};
use clockrun_world::{Candidate, NodeId};

/// Nudges a candidate toward a playable layout.
///
/// Walks the mutable region outward from the reference side, comparing each
/// column with its neighbour toward the reference. A first pass cuts spike
/// runs longer than `max_spike_run` and removes a spike standing right before
/// a hole. A second pass pulls every step taller
/// than the climbable block height back to a single tile. Returns the number
/// of edits.
pub fn force_playability(
    candidate: &mut Candidate,
    jump: &JumpProfile,
    max_spike_run: u32,
) -> usize {
    let toward_reference = candidate.side().opposite();
    let mut walk = candidate.mutable_ids();
    if toward_reference == Side::Right {
        walk.reverse();
    }
    let spikes = break_spike_runs(candidate, &walk, toward_reference, max_spike_run);
    spikes + level_steps(candidate, &walk, toward_reference, jump)
}

fn break_spike_runs(
    candidate: &mut Candidate,
    walk: &[NodeId],
    toward_reference: Side,
    max_spike_run: u32,
) -> usize {
    let mut edits = 0;
    let mut spike_run = 0_u32;
    for &id in walk {
        let Some(anchor) = candidate.chain().neighbor(id, toward_reference) else {
            continue;
        };
        let anchor_spiked = candidate.gene(anchor).has_spike();
        let Some(gene) = candidate.mutable_gene_mut(id) else {
            continue;
        };

        if gene.has_spike() {
            spike_run += 1;
            if spike_run > max_spike_run {
                gene.set_has_spike(false);
                spike_run = 0;
                edits += 1;
            }
            continue;
        }

        if gene.ground_height() == 0 && anchor_spiked {
            if let Some(anchor) = candidate.mutable_gene_mut(anchor) {
                anchor.set_has_spike(false);
                edits += 1;
            }
        }
        spike_run = 0;
    }
    edits
}

fn level_steps(
    candidate: &mut Candidate,
    walk: &[NodeId],
    toward_reference: Side,
    jump: &JumpProfile,
) -> usize {
    let max_step = i32::from(jump.max_block_jump_height());
    let mut edits = 0;
    for &id in walk {
        let Some(anchor) = candidate.chain().neighbor(id, toward_reference) else {
            continue;
        };
        let anchor_height = i32::from(candidate.gene(anchor).to_discrete().obstacle_height());
        let Some(gene) = candidate.mutable_gene_mut(id) else {
            continue;
        };
        let diff = i32::from(gene.to_discrete().obstacle_height()) - anchor_height;
        if diff.abs() > max_step {
            gene.shift_ground(-diff + diff.signum());
            edits += 1;
        }
    }
    edits
}
