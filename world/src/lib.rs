#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Clockrun.
//!
//! The [`Level`] owns the global column chain. Committed columns are never
//! rewritten except for the clock placement flag the game toggles when it
//! instantiates a pickup. Reads go through the [`query`] module.

mod candidate;
mod chain;

pub use candidate::{random_gene, Candidate, CandidateError};
pub use chain::{ChainError, ColumnChain, NodeId};

use clockrun_core::{ChunkConfig, Column, Side};
use thiserror::Error;

/// Failures raised by level reads and commits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// The column has not been generated yet.
    #[error("global x {global_x} has not been generated (buffered {leftmost}..={rightmost})")]
    OutOfRange {
        /// Requested coordinate.
        global_x: i32,
        /// Leftmost generated coordinate.
        leftmost: i32,
        /// Rightmost generated coordinate.
        rightmost: i32,
    },
    /// A candidate could not be turned into a committable region.
    #[error(transparent)]
    Candidate(#[from] CandidateError),
    /// Splicing the region onto the level failed.
    #[error(transparent)]
    Chain(ChainError),
}

impl From<ChainError> for LevelError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::OutOfRange {
                global_x,
                leftmost,
                rightmost,
            } => LevelError::OutOfRange {
                global_x,
                leftmost,
                rightmost,
            },
            other => LevelError::Chain(other),
        }
    }
}

/// Global X range written by a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommittedRange {
    /// Leftmost committed column.
    pub leftmost: i32,
    /// Rightmost committed column.
    pub rightmost: i32,
    /// Side the level grew toward.
    pub side: Side,
}

/// Generated level: every column between the leftmost and rightmost X.
#[derive(Clone, Debug)]
pub struct Level {
    chain: ColumnChain<Column>,
    max_height: u8,
}

impl Level {
    /// Creates a level holding only the flat base chunk around the origin.
    pub fn new(config: &ChunkConfig) -> Result<Self, LevelError> {
        let width = i32::try_from(config.base_width).map_err(|_| ChainError::CapacityExhausted)?;
        let leftmost = config.origin - width / 2;
        let base = Column::new(i32::from(config.base_ground_height));
        let chain = ColumnChain::from_values(leftmost, (0..width).map(|_| base))?;
        Ok(Self {
            chain,
            max_height: config.max_height,
        })
    }

    /// Detached copy of up to `width` committed columns at the `side` edge.
    pub fn reference_region(&self, side: Side, width: u32) -> Result<ColumnChain<Column>, LevelError> {
        let edge = self.chain.global_x(self.chain.end(side));
        let width = usize::try_from(width.max(1)).map_err(|_| ChainError::CapacityExhausted)?;
        Ok(self.chain.clone_range(edge, width, side.opposite())?)
    }

    /// Read access to the underlying chain.
    #[must_use]
    pub const fn chain(&self) -> &ColumnChain<Column> {
        &self.chain
    }
}

/// Splices the winner's mutable region onto the matching end of the level.
///
/// Every spliced column is locked; nothing already on the level moves.
pub fn commit(level: &mut Level, winner: Candidate) -> Result<CommittedRange, LevelError> {
    let side = winner.side();
    let region = winner.into_generated()?;
    let range = CommittedRange {
        leftmost: region.leftmost_x(),
        rightmost: region.rightmost_x(),
        side,
    };
    level.chain.splice(side, region)?;
    Ok(range)
}

/// Records that the game instantiated the clock at `global_x`.
///
/// Returns whether the column carries a clock at all.
pub fn mark_clock_placed(level: &mut Level, global_x: i32) -> Result<bool, LevelError> {
    let column = level.chain.value_at_mut(global_x)?;
    if !column.has_clock() {
        return Ok(false);
    }
    column.set_clock_placed(true);
    Ok(true)
}

/// Query functions that provide read-only access to the level state.
pub mod query {
    use clockrun_core::{clock_height, Column, ColumnAttributes, TileCode};

    use super::{Level, LevelError};

    /// Classifies the cell at height `y` of column `global_x`.
    ///
    /// The sign of `y` is ignored. Columns that were never generated fail
    /// with [`LevelError::OutOfRange`].
    pub fn cell_at(level: &Level, global_x: i32, y: i32) -> Result<TileCode, LevelError> {
        let chain = &level.chain;
        let id = chain.seek(global_x)?;
        let column = chain.get(id);
        let previous = chain.previous(id).map(|id| chain.get(id));
        let next = chain.next(id).map(|id| chain.get(id));
        Ok(column.cell_at(y, clock_height(previous, column, next)))
    }

    /// Committed column at `global_x`.
    pub fn column(level: &Level, global_x: i32) -> Result<&Column, LevelError> {
        Ok(level.chain.value_at(global_x)?)
    }

    /// Attributes of the column at `global_x`.
    pub fn column_at(level: &Level, global_x: i32) -> Result<ColumnAttributes, LevelError> {
        let column = column(level, global_x)?;
        Ok(ColumnAttributes::capture(global_x, column))
    }

    /// Attributes of every column in `from_x..=to_x`.
    pub fn columns_between(
        level: &Level,
        from_x: i32,
        to_x: i32,
    ) -> Result<Vec<ColumnAttributes>, LevelError> {
        (from_x.min(to_x)..=from_x.max(to_x))
            .map(|global_x| column_at(level, global_x))
            .collect()
    }

    /// Leftmost generated X.
    #[must_use]
    pub fn leftmost_global_x(level: &Level) -> i32 {
        level.chain.leftmost_x()
    }

    /// Rightmost generated X.
    #[must_use]
    pub fn rightmost_global_x(level: &Level) -> i32 {
        level.chain.rightmost_x()
    }

    /// Rows a renderer should draw.
    #[must_use]
    pub const fn max_height(level: &Level) -> u8 {
        level.max_height
    }

    /// Number of generated columns.
    #[must_use]
    pub fn len(level: &Level) -> usize {
        level.chain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockrun_core::{ContinuousColumn, TileCode};

    fn level() -> Level {
        Level::new(&ChunkConfig::default()).expect("level")
    }

    fn winner(level: &Level, side: Side, grounds: &[f64]) -> Candidate {
        let reference = level.reference_region(side, 3).expect("reference");
        let mut chain = reference.map(ContinuousColumn::from_discrete);
        let width = i32::try_from(grounds.len()).expect("width");
        let leftmost = match side {
            Side::Left => chain.leftmost_x() - width,
            Side::Right => chain.rightmost_x() + 1,
        };
        let genes = grounds
            .iter()
            .map(|ground| ContinuousColumn::new(*ground, -1.0, 1.0, 4.0, true));
        chain
            .splice(side, ColumnChain::from_values(leftmost, genes).expect("genes"))
            .expect("splice");
        Candidate::from_flags(chain).expect("candidate")
    }

    #[test]
    fn base_chunk_is_centred_on_origin() {
        let level = level();
        assert_eq!(query::leftmost_global_x(&level), -2);
        assert_eq!(query::rightmost_global_x(&level), 2);
        let attributes = query::column_at(&level, 0).expect("origin");
        assert_eq!(attributes.ground_height, 3);
        assert!(!attributes.is_mutable);
    }

    #[test]
    fn reference_region_reads_inward_from_edge() {
        let level = level();
        let right = level.reference_region(Side::Right, 3).expect("right");
        assert_eq!((right.leftmost_x(), right.rightmost_x()), (0, 2));
        let left = level.reference_region(Side::Left, 30).expect("left");
        assert_eq!((left.leftmost_x(), left.rightmost_x()), (-2, 2));
    }

    #[test]
    fn commit_extends_both_ends_and_locks_columns() {
        let mut level = level();
        let right = winner(&level, Side::Right, &[3.0, 4.0, 5.0]);
        let range = commit(&mut level, right).expect("right");
        assert_eq!((range.leftmost, range.rightmost), (3, 5));

        let left = winner(&level, Side::Left, &[1.0, 2.0]);
        let range = commit(&mut level, left).expect("left");
        assert_eq!((range.leftmost, range.rightmost), (-4, -3));

        assert!(level.chain().is_contiguous());
        assert_eq!(query::len(&level), 10);
        for attributes in query::columns_between(&level, -4, 5).expect("columns") {
            assert!(!attributes.is_mutable);
        }
        assert_eq!(query::column_at(&level, 5).expect("tail").ground_height, 5);
    }

    #[test]
    fn committed_columns_do_not_change_on_later_commits() {
        let mut level = level();
        let first = winner(&level, Side::Right, &[4.0, 4.0]);
        let _ = commit(&mut level, first).expect("first");
        let before = query::columns_between(&level, -2, 4).expect("before");

        let second = winner(&level, Side::Right, &[0.0, 7.0, 1.0]);
        let _ = commit(&mut level, second).expect("second");
        assert_eq!(query::columns_between(&level, -2, 4).expect("after"), before);
    }

    #[test]
    fn out_of_range_queries_fail_explicitly() {
        let level = level();
        let far = query::rightmost_global_x(&level) + 1000;
        assert_eq!(
            query::cell_at(&level, far, 0),
            Err(LevelError::OutOfRange {
                global_x: far,
                leftmost: -2,
                rightmost: 2,
            })
        );
        assert_eq!(query::rightmost_global_x(&level), 2);
    }

    #[test]
    fn cells_report_clocks_and_placement() {
        let mut level = level();
        let right = winner(&level, Side::Right, &[3.0]);
        let _ = commit(&mut level, right).expect("commit");

        assert_eq!(query::cell_at(&level, 3, 0), Ok(TileCode::Ground));
        assert_eq!(query::cell_at(&level, 3, -3), Ok(TileCode::UnplacedClock));
        assert_eq!(query::cell_at(&level, 3, 4), Ok(TileCode::Blank));

        assert_eq!(mark_clock_placed(&mut level, 3), Ok(true));
        assert_eq!(mark_clock_placed(&mut level, 0), Ok(false));
        assert_eq!(query::cell_at(&level, 3, 3), Ok(TileCode::PlacedClock));
    }
}
