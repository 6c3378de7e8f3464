#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Clockrun level generator.
//!
//! This crate defines the cell records every other crate speaks in. The
//! committed level stores discrete [`Column`] values, while the optimizers
//! move candidates through a continuous search space expressed with
//! [`ContinuousColumn`] and [`Velocity`]. Conversions between the two are
//! explicit so a reader always knows which representation is in play.

mod config;

pub use config::{
    ChunkConfig, ConfigError, FitnessConfig, GaConfig, GeneratorConfig, JumpProfile,
    PhysicsConfig, PopulationConfig, PsoConfig, Strategy, StreamingConfig, MAX_SEED,
};

use serde::{Deserialize, Serialize};

/// Tallest ground column the generator will ever store.
pub const MAX_GROUND_HEIGHT: u8 = 12;
/// Smallest time bonus a clock pickup can grant, in seconds.
pub const MIN_CLOCK_EXTRA_TIME: f32 = 2.0;
/// Largest time bonus a clock pickup can grant, in seconds.
pub const MAX_CLOCK_EXTRA_TIME: f32 = 10.0;
/// Time bonus assigned to columns that never rolled one.
pub const DEFAULT_CLOCK_EXTRA_TIME: f32 = 3.0;

/// Horizontal side of the level a chunk grows toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Toward decreasing global X.
    Left,
    /// Toward increasing global X.
    Right,
}

impl Side {
    /// Signed unit step along the X axis when walking toward this side.
    #[must_use]
    pub const fn step(self) -> i32 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }

    /// Side facing away from this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Stable label used for logging and seed derivation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Tile classification returned to renderers for a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileCode {
    /// Empty air.
    Blank,
    /// Solid ground.
    Ground,
    /// Spike sitting on top of the ground.
    Spike,
    /// Clock pickup that has not been handed to the game yet.
    UnplacedClock,
    /// Clock pickup already instantiated by the game.
    PlacedClock,
}

impl TileCode {
    /// Single character used by the textual level dump.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            TileCode::Blank => 'B',
            TileCode::Ground => 'G',
            TileCode::Spike => 'S',
            TileCode::UnplacedClock => 'C',
            TileCode::PlacedClock => 'c',
        }
    }
}

/// Discrete unit-width vertical slice of the level.
///
/// Spike and clock flags are stored as written but read back masked: a
/// column without ground can carry neither.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    ground_height: u8,
    has_spike: bool,
    has_clock: bool,
    clock_extra_time: f32,
    clock_placed: bool,
    is_mutable: bool,
}

impl Column {
    /// Creates an immutable, hazard-free column of the provided ground height.
    #[must_use]
    pub fn new(ground_height: i32) -> Self {
        Self {
            ground_height: clamp_ground_height(ground_height),
            has_spike: false,
            has_clock: false,
            clock_extra_time: DEFAULT_CLOCK_EXTRA_TIME,
            clock_placed: false,
            is_mutable: false,
        }
    }

    /// Returns the column with its spike flag replaced.
    #[must_use]
    pub fn with_spike(mut self, has_spike: bool) -> Self {
        self.has_spike = has_spike;
        self
    }

    /// Returns the column with a clock pickup of the provided bonus.
    #[must_use]
    pub fn with_clock(mut self, extra_time: f32) -> Self {
        self.has_clock = true;
        self.set_clock_extra_time(extra_time);
        self
    }

    /// Returns the column with its mutability flag replaced.
    #[must_use]
    pub fn with_mutable(mut self, is_mutable: bool) -> Self {
        self.is_mutable = is_mutable;
        self
    }

    /// Height of solid ground measured from the floor.
    #[must_use]
    pub const fn ground_height(&self) -> u8 {
        self.ground_height
    }

    /// Stores a new ground height, clamped into `0..=MAX_GROUND_HEIGHT`.
    pub fn set_ground_height(&mut self, ground_height: i32) {
        self.ground_height = clamp_ground_height(ground_height);
    }

    /// Whether a spike sits on this column.
    #[must_use]
    pub const fn has_spike(&self) -> bool {
        self.ground_height != 0 && self.has_spike
    }

    /// Spike flag as stored, ignoring the ground mask.
    #[must_use]
    pub const fn stored_spike(&self) -> bool {
        self.has_spike
    }

    /// Overwrites the stored spike flag.
    pub fn set_spike(&mut self, has_spike: bool) {
        self.has_spike = has_spike;
    }

    /// Whether a clock pickup sits on this column.
    #[must_use]
    pub const fn has_clock(&self) -> bool {
        self.ground_height != 0 && self.has_clock
    }

    /// Clock flag as stored, ignoring the ground mask.
    #[must_use]
    pub const fn stored_clock(&self) -> bool {
        self.has_clock
    }

    /// Overwrites the stored clock flag.
    pub fn set_clock(&mut self, has_clock: bool) {
        self.has_clock = has_clock;
    }

    /// Seconds granted when the clock on this column is collected.
    #[must_use]
    pub const fn clock_extra_time(&self) -> f32 {
        self.clock_extra_time
    }

    /// Stores a new clock bonus clamped into the allowed range.
    pub fn set_clock_extra_time(&mut self, extra_time: f32) {
        self.clock_extra_time = clamp_extra_time(extra_time);
    }

    /// Whether the game already instantiated this column's clock.
    #[must_use]
    pub const fn clock_placed(&self) -> bool {
        self.clock_placed
    }

    /// Records whether the game instantiated this column's clock.
    pub fn set_clock_placed(&mut self, placed: bool) {
        self.clock_placed = placed;
    }

    /// Whether the column is still subject to optimization.
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    /// Permanently removes the column from optimization.
    pub fn lock(&mut self) {
        self.is_mutable = false;
    }

    /// Height the player has to clear to pass over this column.
    #[must_use]
    pub const fn obstacle_height(&self) -> u8 {
        if self.ground_height == 0 {
            0
        } else if self.has_spike {
            self.ground_height + 1
        } else {
            self.ground_height
        }
    }

    /// Whether the player can stand on this column.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        !self.has_spike() && self.ground_height != 0
    }

    /// Classifies the cell at height `y`, with the clock drawn at `clock_height`.
    ///
    /// The sign of `y` is ignored so callers using a downward Y axis can pass
    /// their coordinates straight through.
    #[must_use]
    pub fn cell_at(&self, y: i32, clock_height: u8) -> TileCode {
        let y = y.unsigned_abs();
        let ground = u32::from(self.ground_height);
        if y < ground {
            return TileCode::Ground;
        }
        if self.has_spike() && y == ground {
            return TileCode::Spike;
        }
        if self.has_clock() && y == u32::from(clock_height) {
            return if self.clock_placed {
                TileCode::PlacedClock
            } else {
                TileCode::UnplacedClock
            };
        }
        TileCode::Blank
    }
}

impl Default for Column {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Height at which a clock on `column` is drawn so it stays reachable.
///
/// A clock floats up to the taller neighbour unless the column towers over
/// both of them or sits at the end of the chain.
#[must_use]
pub fn clock_height(previous: Option<&Column>, column: &Column, next: Option<&Column>) -> u8 {
    let own = column.obstacle_height();
    match (previous, next) {
        (Some(previous), Some(next)) => {
            let previous = previous.obstacle_height();
            let next = next.obstacle_height();
            if previous < own && next < own {
                own
            } else {
                previous.max(next)
            }
        }
        _ => own,
    }
}

/// Attributes of a committed column exposed to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnAttributes {
    /// Absolute horizontal coordinate of the column.
    pub global_x: i32,
    /// Height of solid ground from the floor.
    pub ground_height: u8,
    /// Whether a spike sits on the column.
    pub has_spike: bool,
    /// Whether a clock pickup sits on the column.
    pub has_clock: bool,
    /// Seconds granted by the clock pickup.
    pub clock_extra_time: f32,
    /// Whether the game already instantiated the clock.
    pub clock_placed: bool,
    /// Whether the column is still subject to optimization.
    pub is_mutable: bool,
}

impl ColumnAttributes {
    /// Captures the attributes of `column` located at `global_x`.
    #[must_use]
    pub fn capture(global_x: i32, column: &Column) -> Self {
        Self {
            global_x,
            ground_height: column.ground_height(),
            has_spike: column.has_spike(),
            has_clock: column.has_clock(),
            clock_extra_time: column.clock_extra_time(),
            clock_placed: column.clock_placed(),
            is_mutable: column.is_mutable(),
        }
    }
}

/// Continuous genome of a single column used while optimizing.
///
/// Boolean traits are relaxed to floats and read back as `value > 0`.
/// Every write path clamps: ground into `0..=MAX_GROUND_HEIGHT`, the relaxed
/// flags into `-1..=1` and the clock bonus into its allowed range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuousColumn {
    ground: f64,
    spike: f64,
    clock: f64,
    extra_time: f32,
    is_mutable: bool,
}

impl ContinuousColumn {
    /// Creates a continuous column, clamping every trait.
    #[must_use]
    pub fn new(ground: f64, spike: f64, clock: f64, extra_time: f32, is_mutable: bool) -> Self {
        let mut column = Self {
            ground: 0.0,
            spike: 0.0,
            clock: 0.0,
            extra_time: DEFAULT_CLOCK_EXTRA_TIME,
            is_mutable,
        };
        column.set_ground(ground);
        column.set_spike(spike);
        column.set_clock(clock);
        column.set_extra_time(extra_time);
        column
    }

    /// Lifts a discrete column into the continuous space.
    ///
    /// Stored flags map to `1.0` or `-1.0`, so masked flags survive the trip.
    #[must_use]
    pub fn from_discrete(column: &Column) -> Self {
        Self::new(
            f64::from(column.ground_height()),
            if column.stored_spike() { 1.0 } else { -1.0 },
            if column.stored_clock() { 1.0 } else { -1.0 },
            column.clock_extra_time(),
            column.is_mutable(),
        )
    }

    /// Thresholds the continuous traits into a discrete column.
    #[must_use]
    pub fn to_discrete(&self) -> Column {
        let mut column = Column::new(self.ground_height().into())
            .with_spike(self.spike > 0.0)
            .with_mutable(self.is_mutable);
        column.set_clock(self.clock > 0.0);
        column.set_clock_extra_time(self.extra_time);
        column
    }

    /// Relaxed ground height.
    #[must_use]
    pub const fn ground(&self) -> f64 {
        self.ground
    }

    /// Stores a relaxed ground height.
    pub fn set_ground(&mut self, ground: f64) {
        self.ground = clamp_finite(ground, 0.0, f64::from(MAX_GROUND_HEIGHT));
    }

    /// Moves the ground up or down by whole tiles.
    pub fn shift_ground(&mut self, tiles: i32) {
        self.set_ground(self.ground + f64::from(tiles));
    }

    /// Ground height as read by fitness and rendering.
    #[must_use]
    pub fn ground_height(&self) -> u8 {
        // Clamped on write, so the cast cannot truncate.
        self.ground.floor() as u8
    }

    /// Relaxed spike flag.
    #[must_use]
    pub const fn spike(&self) -> f64 {
        self.spike
    }

    /// Stores a relaxed spike flag.
    pub fn set_spike(&mut self, spike: f64) {
        self.spike = clamp_finite(spike, -1.0, 1.0);
    }

    /// Whether a spike sits on this column after masking.
    #[must_use]
    pub fn has_spike(&self) -> bool {
        self.ground_height() != 0 && self.spike > 0.0
    }

    /// Forces the spike flag to a definite value.
    pub fn set_has_spike(&mut self, has_spike: bool) {
        self.spike = if has_spike { 1.0 } else { -1.0 };
    }

    /// Flips the stored spike flag, even when it is currently masked.
    pub fn toggle_spike(&mut self) {
        self.spike = toggled(self.spike);
    }

    /// Relaxed clock flag.
    #[must_use]
    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Stores a relaxed clock flag.
    pub fn set_clock(&mut self, clock: f64) {
        self.clock = clamp_finite(clock, -1.0, 1.0);
    }

    /// Whether a clock sits on this column after masking.
    #[must_use]
    pub fn has_clock(&self) -> bool {
        self.ground_height() != 0 && self.clock > 0.0
    }

    /// Flips the stored clock flag, even when it is currently masked.
    pub fn toggle_clock(&mut self) {
        self.clock = toggled(self.clock);
    }

    /// Clock bonus in seconds.
    #[must_use]
    pub const fn extra_time(&self) -> f32 {
        self.extra_time
    }

    /// Stores a clock bonus clamped into the allowed range.
    pub fn set_extra_time(&mut self, extra_time: f32) {
        self.extra_time = clamp_extra_time(extra_time);
    }

    /// Whether the column is still subject to optimization.
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    /// Applies a velocity and returns the displacement that actually took place.
    ///
    /// The returned value differs from `velocity` only where a clamp bit.
    pub fn displace(&mut self, velocity: &Velocity) -> Velocity {
        let before = *self;
        self.set_ground(self.ground + velocity.ground);
        self.set_spike(self.spike + velocity.spike);
        self.set_clock(self.clock + velocity.clock);
        self.set_extra_time(self.extra_time + velocity.extra_time as f32);
        Velocity {
            ground: self.ground - before.ground,
            spike: self.spike - before.spike,
            clock: self.clock - before.clock,
            extra_time: f64::from(self.extra_time - before.extra_time),
        }
    }
}

/// Per-column velocity of a particle in the continuous genome space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Ground height delta.
    pub ground: f64,
    /// Relaxed spike flag delta.
    pub spike: f64,
    /// Relaxed clock flag delta.
    pub clock: f64,
    /// Clock bonus delta in seconds.
    pub extra_time: f64,
}

fn clamp_ground_height(value: i32) -> u8 {
    // Clamped into 0..=12 first, so the cast is lossless.
    value.clamp(0, i32::from(MAX_GROUND_HEIGHT)) as u8
}

fn clamp_extra_time(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_CLOCK_EXTRA_TIME;
    }
    value.clamp(MIN_CLOCK_EXTRA_TIME, MAX_CLOCK_EXTRA_TIME)
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

fn toggled(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        -value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn ground_height_clamp_is_idempotent() {
        for value in [-40, -1, 13, 99, i32::MAX, i32::MIN] {
            let mut column = Column::new(0);
            column.set_ground_height(value);
            let first = column.ground_height();
            column.set_ground_height(value);
            assert!(first <= MAX_GROUND_HEIGHT);
            assert_eq!(column.ground_height(), first);
        }
        assert_eq!(Column::new(40).ground_height(), MAX_GROUND_HEIGHT);
        assert_eq!(Column::new(-3).ground_height(), 0);
    }

    #[test]
    fn extra_time_is_clamped_on_every_write() {
        let mut column = Column::new(3).with_clock(50.0);
        assert_eq!(column.clock_extra_time(), MAX_CLOCK_EXTRA_TIME);
        column.set_clock_extra_time(-1.0);
        assert_eq!(column.clock_extra_time(), MIN_CLOCK_EXTRA_TIME);

        let mut continuous = ContinuousColumn::new(2.0, 1.0, 1.0, 4.0, true);
        continuous.set_extra_time(11.5);
        assert_eq!(continuous.extra_time(), MAX_CLOCK_EXTRA_TIME);
    }

    #[test]
    fn holes_mask_spikes_and_clocks() {
        let column = Column::new(0).with_spike(true).with_clock(5.0);
        assert!(!column.has_spike());
        assert!(!column.has_clock());
        assert!(column.stored_spike());
        assert_eq!(column.obstacle_height(), 0);
        assert!(!column.is_safe());

        let continuous = ContinuousColumn::new(0.4, 0.9, 0.9, 5.0, true);
        assert!(!continuous.has_spike());
        assert!(!continuous.has_clock());
        assert!(!continuous.to_discrete().has_spike());
    }

    #[test]
    fn obstacle_height_accounts_for_spikes() {
        let spiked = Column::new(4).with_spike(true);
        assert_eq!(spiked.obstacle_height(), 5);
        assert!(!spiked.is_safe());
        assert!(Column::new(4).is_safe());
    }

    #[test]
    fn cell_classification_follows_column_layers() {
        let column = Column::new(2).with_spike(true).with_clock(4.0);
        assert_eq!(column.cell_at(0, 3), TileCode::Ground);
        assert_eq!(column.cell_at(-1, 3), TileCode::Ground);
        assert_eq!(column.cell_at(2, 3), TileCode::Spike);
        assert_eq!(column.cell_at(-3, 3), TileCode::UnplacedClock);
        assert_eq!(column.cell_at(7, 3), TileCode::Blank);

        let mut placed = column;
        placed.set_clock_placed(true);
        assert_eq!(placed.cell_at(3, 3), TileCode::PlacedClock);
    }

    #[test]
    fn clock_floats_to_taller_neighbour() {
        let low = Column::new(1);
        let tall = Column::new(5);
        let column = Column::new(2).with_clock(3.0);
        assert_eq!(clock_height(Some(&low), &column, Some(&tall)), 5);
        assert_eq!(clock_height(Some(&low), &column, Some(&low)), 2);
        assert_eq!(clock_height(None, &column, Some(&tall)), 2);
    }

    #[test]
    fn continuous_round_trip_preserves_discrete_traits() {
        let column = Column::new(7)
            .with_spike(true)
            .with_clock(6.5)
            .with_mutable(true);
        let restored = ContinuousColumn::from_discrete(&column).to_discrete();
        assert_eq!(restored, column);
    }

    #[test]
    fn toggling_flips_masked_flags() {
        let mut continuous = ContinuousColumn::new(0.0, -0.5, 0.0, 3.0, true);
        continuous.toggle_spike();
        continuous.toggle_clock();
        assert!(continuous.spike() > 0.0);
        assert!(continuous.clock() > 0.0);
        assert!(!continuous.has_spike());

        continuous.set_ground(3.2);
        assert!(continuous.has_spike());
        assert!(continuous.has_clock());
    }

    #[test]
    fn displacement_reports_clamped_motion() {
        let mut continuous = ContinuousColumn::new(11.5, 0.0, 0.0, 9.0, true);
        let applied = continuous.displace(&Velocity {
            ground: 3.0,
            spike: 0.25,
            clock: -4.0,
            extra_time: 5.0,
        });
        assert_eq!(continuous.ground(), f64::from(MAX_GROUND_HEIGHT));
        assert!((applied.ground - 0.5).abs() < 1e-9);
        assert!((applied.spike - 0.25).abs() < 1e-9);
        assert!((applied.clock + 1.0).abs() < 1e-9);
        assert!((applied.extra_time - 1.0).abs() < 1e-6);
    }

    #[test]
    fn side_helpers_are_consistent() {
        assert_eq!(Side::Left.step(), -1);
        assert_eq!(Side::Right.step(), 1);
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(TileCode::PlacedClock.symbol(), 'c');
    }

    #[test]
    fn column_round_trips_through_bincode() {
        assert_round_trip(&Column::new(5).with_clock(7.0));
    }

    #[test]
    fn generator_config_round_trips_through_bincode() {
        assert_round_trip(&GeneratorConfig::default());
    }
}
