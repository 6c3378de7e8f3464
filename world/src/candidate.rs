//! Population members: a reference anchor plus a mutable region.

use clockrun_core::{Column, ContinuousColumn, Side, DEFAULT_CLOCK_EXTRA_TIME};
use rand::Rng;
use thiserror::Error;

use crate::chain::{ChainError, ColumnChain, NodeId};

/// Failures raised while building or recombining candidates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CandidateError {
    /// No column of the chain is flagged mutable.
    #[error("candidate chain has no mutable columns")]
    NoMutableRegion,
    /// Explicit generation bounds do not describe a region at the requested end.
    #[error("generation bounds {head}..={tail} do not sit at the {side} end of the candidate")]
    InvalidBounds {
        /// Requested generation head.
        head: i32,
        /// Requested generation tail.
        tail: i32,
        /// Requested side label.
        side: &'static str,
    },
    /// Two candidates with different geometry were recombined.
    #[error("candidates cover different ranges and cannot be recombined")]
    GeometryMismatch,
    /// Underlying chain failure.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// One proposed chunk together with the committed terrain it must continue.
///
/// The whole span is a private deep copy: mutating a candidate never touches
/// the level it was cloned from.
#[derive(Clone, Debug)]
pub struct Candidate {
    chain: ColumnChain<ContinuousColumn>,
    generation_head: NodeId,
    generation_tail: NodeId,
    side: Side,
    width: u32,
    fitness: Option<i64>,
}

impl Candidate {
    /// Derives the generation region from the chain's mutability flags.
    ///
    /// A mutable head means the region grows the level leftward and runs to
    /// the last mutable column; otherwise the first mutable column starts a
    /// region that runs to the tail.
    pub fn from_flags(chain: ColumnChain<ContinuousColumn>) -> Result<Self, CandidateError> {
        let head = chain.head();
        if chain.get(head).is_mutable() {
            let mut tail = head;
            while let Some(next) = chain.next(tail) {
                if !chain.get(next).is_mutable() {
                    break;
                }
                tail = next;
            }
            return Ok(Self::assemble(chain, head, tail, Side::Left));
        }
        let first = chain
            .ids()
            .find(|id| chain.get(*id).is_mutable())
            .ok_or(CandidateError::NoMutableRegion)?;
        let tail = chain.tail();
        Ok(Self::assemble(chain, first, tail, Side::Right))
    }

    /// Accepts explicit generation bounds given as global X coordinates.
    pub fn with_bounds(
        chain: ColumnChain<ContinuousColumn>,
        generation_head_x: i32,
        generation_tail_x: i32,
        side: Side,
    ) -> Result<Self, CandidateError> {
        let invalid = CandidateError::InvalidBounds {
            head: generation_head_x,
            tail: generation_tail_x,
            side: side.label(),
        };
        let at_end = match side {
            Side::Left => generation_head_x == chain.leftmost_x(),
            Side::Right => generation_tail_x == chain.rightmost_x(),
        };
        if generation_head_x > generation_tail_x || !at_end {
            return Err(invalid);
        }
        let head = chain.seek(generation_head_x)?;
        let tail = chain.seek(generation_tail_x)?;
        Ok(Self::assemble(chain, head, tail, side))
    }

    /// Builds a candidate with a random mutable region next to `reference`.
    ///
    /// `reference` is a detached copy of committed terrain; the new region of
    /// `generation_width` columns is attached on `side`.
    pub fn spawn<R: Rng + ?Sized>(
        reference: &ColumnChain<Column>,
        side: Side,
        generation_width: u32,
        rng: &mut R,
    ) -> Result<Self, CandidateError> {
        let mut chain = reference.map(|column| {
            let mut anchored = *column;
            anchored.lock();
            ContinuousColumn::from_discrete(&anchored)
        });
        let genes: Vec<ContinuousColumn> = (0..generation_width)
            .map(|_| random_gene(rng))
            .collect();
        let width = i32::try_from(genes.len()).map_err(|_| ChainError::CapacityExhausted)?;
        let (leftmost, head_x, tail_x) = match side {
            Side::Left => {
                let leftmost = chain.leftmost_x() - width;
                (leftmost, leftmost, chain.leftmost_x() - 1)
            }
            Side::Right => {
                let leftmost = chain.rightmost_x() + 1;
                (leftmost, leftmost, leftmost + width - 1)
            }
        };
        chain.splice(side, ColumnChain::from_values(leftmost, genes)?)?;
        Self::with_bounds(chain, head_x, tail_x, side)
    }

    fn assemble(
        chain: ColumnChain<ContinuousColumn>,
        generation_head: NodeId,
        generation_tail: NodeId,
        side: Side,
    ) -> Self {
        let span = chain.rightmost_x() - chain.leftmost_x() + 1;
        Self {
            width: span.unsigned_abs(),
            chain,
            generation_head,
            generation_tail,
            side,
            fitness: None,
        }
    }

    /// Full chain, reference and mutable region together.
    #[must_use]
    pub const fn chain(&self) -> &ColumnChain<ContinuousColumn> {
        &self.chain
    }

    /// Side of the level the mutable region grows.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Columns spanned from head to tail.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Global X of the first and last mutable column.
    #[must_use]
    pub fn generation_bounds(&self) -> (i32, i32) {
        (
            self.chain.global_x(self.generation_head),
            self.chain.global_x(self.generation_tail),
        )
    }

    /// Number of mutable columns.
    #[must_use]
    pub fn generation_width(&self) -> usize {
        let (head, tail) = self.generation_bounds();
        (tail - head + 1).unsigned_abs() as usize
    }

    /// Whether `id` lies inside the mutable region.
    #[must_use]
    pub fn is_mutable_node(&self, id: NodeId) -> bool {
        let (head, tail) = self.generation_bounds();
        (head..=tail).contains(&self.chain.global_x(id))
    }

    /// Mutable node handles from left to right.
    #[must_use]
    pub fn mutable_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.generation_width());
        let mut current = Some(self.generation_head);
        while let Some(id) = current {
            ids.push(id);
            if id == self.generation_tail {
                break;
            }
            current = self.chain.next(id);
        }
        ids
    }

    /// Gene at a node.
    #[must_use]
    pub fn gene(&self, id: NodeId) -> &ContinuousColumn {
        self.chain.get(id)
    }

    /// Writable gene at a node; `None` for reference columns.
    ///
    /// Handing out a writable gene drops the cached fitness.
    pub fn mutable_gene_mut(&mut self, id: NodeId) -> Option<&mut ContinuousColumn> {
        if !self.is_mutable_node(id) {
            return None;
        }
        self.fitness = None;
        Some(self.chain.get_mut(id))
    }

    /// Discrete columns from head to tail, as fitness reads them.
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        self.chain
            .iter()
            .map(|(_, gene)| gene.to_discrete())
            .collect()
    }

    /// Copy of the mutable genes from left to right.
    #[must_use]
    pub fn mutable_snapshot(&self) -> Vec<ContinuousColumn> {
        self.mutable_ids()
            .into_iter()
            .map(|id| *self.chain.get(id))
            .collect()
    }

    /// Copy of the reference genes from left to right.
    #[must_use]
    pub fn reference_snapshot(&self) -> Vec<ContinuousColumn> {
        self.chain
            .ids()
            .filter(|id| !self.is_mutable_node(*id))
            .map(|id| *self.chain.get(id))
            .collect()
    }

    /// Overwrites the mutable region with a snapshot of the same width.
    pub fn restore(&mut self, snapshot: &[ContinuousColumn]) -> Result<(), CandidateError> {
        let ids = self.mutable_ids();
        if ids.len() != snapshot.len() {
            return Err(CandidateError::GeometryMismatch);
        }
        for (id, gene) in ids.into_iter().zip(snapshot) {
            *self.chain.get_mut(id) = *gene;
        }
        self.fitness = None;
        Ok(())
    }

    /// Fitness recorded since the last change, if any.
    #[must_use]
    pub const fn cached_fitness(&self) -> Option<i64> {
        self.fitness
    }

    /// Stores a freshly computed fitness.
    pub fn record_fitness(&mut self, fitness: i64) {
        self.fitness = Some(fitness);
    }

    /// Drops the cached fitness.
    pub fn invalidate_fitness(&mut self) {
        self.fitness = None;
    }

    /// Child taking `left` up to `cross_x` and `right` from `cross_x` on.
    ///
    /// The child's reference region is copied verbatim from `left`.
    pub fn splice_at(
        left: &Candidate,
        right: &Candidate,
        cross_x: i32,
    ) -> Result<Candidate, CandidateError> {
        if left.generation_bounds() != right.generation_bounds() || left.side != right.side {
            return Err(CandidateError::GeometryMismatch);
        }
        let mut child = left.clone();
        child.fitness = None;
        for id in child.mutable_ids() {
            let global_x = child.chain.global_x(id);
            if global_x >= cross_x {
                *child.chain.get_mut(id) = *right.chain.value_at(global_x)?;
            }
        }
        Ok(child)
    }

    /// Detaches the mutable region as a discrete, locked chain ready to commit.
    pub fn into_generated(self) -> Result<ColumnChain<Column>, CandidateError> {
        let (head, _) = self.generation_bounds();
        let region = self
            .chain
            .clone_range(head, self.generation_width(), Side::Right)?;
        Ok(region.map(|gene| {
            let mut column = gene.to_discrete();
            column.lock();
            column
        }))
    }
}

/// Fresh gene for the mutable region of a new candidate.
pub fn random_gene<R: Rng + ?Sized>(rng: &mut R) -> ContinuousColumn {
    ContinuousColumn::new(
        rng.gen_range(0.0..4.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(MIN_SPAWN_EXTRA_TIME..MAX_SPAWN_EXTRA_TIME),
        true,
    )
}

const MIN_SPAWN_EXTRA_TIME: f32 = DEFAULT_CLOCK_EXTRA_TIME - 1.0;
const MAX_SPAWN_EXTRA_TIME: f32 = DEFAULT_CLOCK_EXTRA_TIME + 2.0;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reference(width: i32, ground: i32) -> ColumnChain<Column> {
        ColumnChain::from_values(0, (0..width).map(|_| Column::new(ground))).expect("reference")
    }

    fn gene(ground: f64, mutable: bool) -> ContinuousColumn {
        ContinuousColumn::new(ground, -1.0, -1.0, 3.0, mutable)
    }

    #[test]
    fn flags_locate_a_right_region() {
        let chain = ColumnChain::from_values(
            0,
            [false, false, true, true, true].map(|mutable| gene(3.0, mutable)),
        )
        .expect("chain");
        let candidate = Candidate::from_flags(chain).expect("candidate");
        assert_eq!(candidate.side(), Side::Right);
        assert_eq!(candidate.generation_bounds(), (2, 4));
        assert_eq!(candidate.width(), 5);
    }

    #[test]
    fn flags_locate_a_left_region() {
        let chain = ColumnChain::from_values(
            -4,
            [true, true, false, false].map(|mutable| gene(3.0, mutable)),
        )
        .expect("chain");
        let candidate = Candidate::from_flags(chain).expect("candidate");
        assert_eq!(candidate.side(), Side::Left);
        assert_eq!(candidate.generation_bounds(), (-4, -3));
        assert_eq!(candidate.generation_width(), 2);
    }

    #[test]
    fn missing_mutable_region_is_rejected() {
        let chain = ColumnChain::from_values(0, [gene(1.0, false), gene(1.0, false)]).expect("chain");
        assert_eq!(
            Candidate::from_flags(chain).err(),
            Some(CandidateError::NoMutableRegion)
        );
    }

    #[test]
    fn explicit_bounds_must_touch_the_chosen_end() {
        let chain = ColumnChain::from_values(0, (0..6).map(|_| gene(2.0, false))).expect("chain");
        assert!(Candidate::with_bounds(chain.clone(), 1, 3, Side::Right).is_err());
        let candidate = Candidate::with_bounds(chain, 0, 2, Side::Left).expect("left");
        assert_eq!(candidate.generation_bounds(), (0, 2));
    }

    #[test]
    fn spawn_attaches_region_on_requested_side() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let reference = reference(4, 3);

        let right = Candidate::spawn(&reference, Side::Right, 6, &mut rng).expect("right");
        assert_eq!(right.generation_bounds(), (4, 9));
        assert_eq!(right.width(), 10);
        assert!(right.chain().is_contiguous());

        let left = Candidate::spawn(&reference, Side::Left, 6, &mut rng).expect("left");
        assert_eq!(left.generation_bounds(), (-6, -1));
        assert_eq!(left.chain().leftmost_x(), -6);
        assert_eq!(left.chain().rightmost_x(), 3);
    }

    #[test]
    fn reference_genes_cannot_be_borrowed_mutably() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut candidate = Candidate::spawn(&reference(3, 3), Side::Right, 3, &mut rng).expect("spawn");
        let head = candidate.chain().head();
        assert!(candidate.mutable_gene_mut(head).is_none());

        candidate.record_fitness(10);
        let first = candidate.mutable_ids()[0];
        let gene = candidate.mutable_gene_mut(first).expect("mutable");
        gene.set_ground(9.0);
        assert_eq!(candidate.cached_fitness(), None);
    }

    #[test]
    fn splice_takes_each_side_from_its_donor() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let reference = reference(3, 2);
        let left = Candidate::spawn(&reference, Side::Right, 6, &mut rng).expect("left");
        let right = Candidate::spawn(&reference, Side::Right, 6, &mut rng).expect("right");
        let child = Candidate::splice_at(&left, &right, 6).expect("child");

        let snapshot = child.mutable_snapshot();
        assert_eq!(snapshot[..3], left.mutable_snapshot()[..3]);
        assert_eq!(snapshot[3..], right.mutable_snapshot()[3..]);
        assert_eq!(child.reference_snapshot(), left.reference_snapshot());
    }

    #[test]
    fn generated_region_is_locked_and_detached() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let candidate = Candidate::spawn(&reference(5, 3), Side::Left, 4, &mut rng).expect("spawn");
        let expected: Vec<Column> = candidate.columns()[..4].to_vec();
        let region = candidate.into_generated().expect("region");
        assert_eq!(region.leftmost_x(), -4);
        assert_eq!(region.len(), 4);
        for ((_, column), original) in region.iter().zip(expected) {
            assert!(!column.is_mutable());
            assert_eq!(column.ground_height(), original.ground_height());
            assert_eq!(column.has_spike(), original.has_spike());
        }
    }
}
