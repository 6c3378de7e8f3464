use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player physics the level has to stay playable for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration in pixels per second squared.
    pub gravity: f64,
    /// Top horizontal running speed in pixels per second.
    pub player_max_x_speed: f64,
    /// Upward launch speed of a jump in pixels per second.
    pub player_jump_impulse: f64,
    /// Width and height of a single tile in pixels.
    pub tile_pixel_width: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 1000.0,
            player_max_x_speed: 500.0,
            player_jump_impulse: 590.0,
            tile_pixel_width: 64.0,
        }
    }
}

/// Jump envelope derived once from [`PhysicsConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpProfile {
    max_jump_height: f64,
    max_block_jump_height: u8,
    max_jump_distance: f64,
    tile_pixel_width: f64,
    time_to_walk_tile: f64,
}

impl JumpProfile {
    /// Derives the jump envelope of a player under the provided physics.
    #[must_use]
    pub fn from_physics(physics: &PhysicsConfig) -> Self {
        let impulse = physics.player_jump_impulse.abs();
        let gravity = physics.gravity.abs();
        let max_jump_height = impulse * impulse / (2.0 * gravity);
        let airtime = 2.0 * impulse / gravity;
        let blocks = (max_jump_height / physics.tile_pixel_width).floor();
        Self {
            max_jump_height,
            max_block_jump_height: blocks.clamp(0.0, f64::from(u8::MAX)) as u8,
            max_jump_distance: airtime * physics.player_max_x_speed,
            tile_pixel_width: physics.tile_pixel_width,
            time_to_walk_tile: physics.tile_pixel_width / physics.player_max_x_speed,
        }
    }

    /// Apex of a standing jump in pixels.
    #[must_use]
    pub const fn max_jump_height(&self) -> f64 {
        self.max_jump_height
    }

    /// Whole tiles the player can climb in a single jump.
    #[must_use]
    pub const fn max_block_jump_height(&self) -> u8 {
        self.max_block_jump_height
    }

    /// Horizontal pixels covered by a full-speed jump landing at launch height.
    #[must_use]
    pub const fn max_jump_distance(&self) -> f64 {
        self.max_jump_distance
    }

    /// Tile size in pixels.
    #[must_use]
    pub const fn tile_pixel_width(&self) -> f64 {
        self.tile_pixel_width
    }

    /// Seconds needed to run across one tile at top speed.
    #[must_use]
    pub const fn time_to_walk_tile(&self) -> f64 {
        self.time_to_walk_tile
    }
}

impl Default for JumpProfile {
    fn default() -> Self {
        Self::from_physics(&PhysicsConfig::default())
    }
}

/// Chunk geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Committed columns cloned next to each candidate as its anchor.
    pub reference_width: u32,
    /// Columns generated per chunk.
    pub generation_width: u32,
    /// Number of rows a renderer should draw.
    pub max_height: u8,
    /// Width of the flat immutable chunk seeded around the origin.
    pub base_width: u32,
    /// Global X the base chunk is centred on.
    pub origin: i32,
    /// Ground height of the base chunk.
    pub base_ground_height: u8,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            reference_width: 30,
            generation_width: 30,
            max_height: crate::MAX_GROUND_HEIGHT,
            base_width: 5,
            origin: 0,
            base_ground_height: 3,
        }
    }
}

/// Largest seed a TOML integer can carry.
pub const MAX_SEED: u64 = i64::MAX as u64;

/// Population sizing shared by both optimizers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Candidates per chunk.
    pub size: usize,
    /// Fixed iteration budget per chunk.
    pub max_iterations: u32,
    /// Base seed every per-chunk RNG is derived from. At most
    /// [`MAX_SEED`] so it survives a TOML round trip.
    pub seed: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 30,
            max_iterations: 10,
            seed: 0,
        }
    }
}

/// Optimizer selected at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Particle swarm over the continuous genome.
    #[default]
    #[serde(rename = "pso")]
    ParticleSwarm,
    /// Genetic algorithm with crossover and mutation.
    #[serde(rename = "ga")]
    Genetic,
}

/// Particle swarm coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    /// Peak inertia weight.
    pub w: f64,
    /// Lower bound of the acceleration coefficients.
    pub c_min: f64,
    /// Upper bound of the acceleration coefficients.
    pub c_max: f64,
    /// Lower bound of the random factors.
    pub r_min: f64,
    /// Upper bound of the random factors.
    pub r_max: f64,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            w: 0.01,
            c_min: 0.05,
            c_max: 0.35,
            r_min: 0.0,
            r_max: 0.2,
        }
    }
}

/// Genetic algorithm coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Per-trait mutation probability.
    pub mutation_rate: f64,
    /// Share of the population carried over unchanged.
    pub elitism: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.05,
            elitism: 0.05,
        }
    }
}

/// Weights and thresholds of the fitness terms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Score granted per column of width.
    pub width_reward: i64,
    /// Longest hazard run a player is expected to clear in one jump.
    pub max_jump_straight_distance: u32,
    /// Longest hole run that goes unpunished.
    pub max_jumpable_hole: u32,
    /// Penalty per hole column beyond the jumpable limit.
    pub hole_penalty: i64,
    /// Penalty per tile of unclimbable height delta.
    pub height_penalty: i64,
    /// Reward for a flat step, reduced by twice the delta.
    pub smooth_step_reward: i64,
    /// Penalty per spike in an over-long run or over the density cap.
    pub spike_penalty: i64,
    /// Allowed spikes per column of width.
    pub spike_density: f64,
    /// Penalty per hazard column of an unreachable jump.
    pub hazard_penalty: i64,
    /// Multiplier applied to the time needed to run the whole chunk.
    pub ideal_extra_time_factor: f64,
    /// Weight of the ideal extra time in the pickup term.
    pub clock_reward_scale: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            width_reward: 200,
            max_jump_straight_distance: 4,
            max_jumpable_hole: 4,
            hole_penalty: 100,
            height_penalty: 100,
            smooth_step_reward: 10,
            spike_penalty: 20,
            spike_density: 0.1,
            hazard_penalty: 50,
            ideal_extra_time_factor: 1.2,
            clock_reward_scale: 5.0,
        }
    }
}

/// Background generation triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Distance in columns from an edge at which a new chunk is requested.
    pub trigger_distance: u32,
    /// Chunks generated per background request.
    pub chunks_per_request: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            trigger_distance: 15,
            chunks_per_request: 1,
        }
    }
}

/// Complete generator configuration, loaded once and passed by reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Player physics.
    pub physics: PhysicsConfig,
    /// Chunk geometry.
    pub chunks: ChunkConfig,
    /// Population sizing.
    pub population: PopulationConfig,
    /// Optimizer selection.
    pub strategy: Strategy,
    /// Particle swarm coefficients.
    pub pso: PsoConfig,
    /// Genetic algorithm coefficients.
    pub ga: GaConfig,
    /// Fitness weights.
    pub fitness: FitnessConfig,
    /// Background generation triggers.
    pub streaming: StreamingConfig,
    /// Repairs unreachable steps and spike runs of every winner before commit.
    pub force_playability: bool,
}

impl GeneratorConfig {
    /// Jump envelope for the configured physics.
    #[must_use]
    pub fn jump_profile(&self) -> JumpProfile {
        JumpProfile::from_physics(&self.physics)
    }

    /// Rejects configurations the generator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.chunks.generation_width < 3 {
            return Err(ConfigError::GenerationTooNarrow {
                width: self.chunks.generation_width,
            });
        }
        if self.chunks.base_width == 0 {
            return Err(ConfigError::EmptyBaseChunk);
        }
        if self.population.seed > MAX_SEED {
            return Err(ConfigError::SeedOutOfRange {
                seed: self.population.seed,
            });
        }
        let streaming = [
            ("streaming.trigger_distance", self.streaming.trigger_distance),
            ("streaming.chunks_per_request", self.streaming.chunks_per_request),
        ];
        for (name, value) in streaming {
            if value == 0 {
                return Err(ConfigError::InertStreaming { name });
            }
        }
        let physics = [
            ("gravity", self.physics.gravity),
            ("player_max_x_speed", self.physics.player_max_x_speed),
            ("player_jump_impulse", self.physics.player_jump_impulse.abs()),
            ("tile_pixel_width", self.physics.tile_pixel_width),
        ];
        for (name, value) in physics {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositivePhysics { name, value });
            }
        }
        let rates = [
            ("ga.mutation_rate", self.ga.mutation_rate),
            ("ga.elitism", self.ga.elitism),
            ("fitness.spike_density", self.fitness.spike_density),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        if self.pso.r_min > self.pso.r_max {
            return Err(ConfigError::InvertedRange {
                name: "pso.r",
                min: self.pso.r_min,
                max: self.pso.r_max,
            });
        }
        if self.pso.c_min > self.pso.c_max {
            return Err(ConfigError::InvertedRange {
                name: "pso.c",
                min: self.pso.c_min,
                max: self.pso.c_max,
            });
        }
        Ok(())
    }
}

/// Reasons a [`GeneratorConfig`] is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The population must contain at least one candidate.
    #[error("population size must be at least 1")]
    EmptyPopulation,
    /// Crossover needs a middle third to pick from.
    #[error("generation width {width} is narrower than 3 columns")]
    GenerationTooNarrow {
        /// Configured width.
        width: u32,
    },
    /// The level needs at least one column to anchor generation.
    #[error("base chunk width must be at least 1")]
    EmptyBaseChunk,
    /// The seed does not fit a TOML integer.
    #[error("seed {seed} exceeds {MAX_SEED}")]
    SeedOutOfRange {
        /// Configured seed.
        seed: u64,
    },
    /// Background generation would never extend the level.
    #[error("`{name}` must be at least 1")]
    InertStreaming {
        /// Field name.
        name: &'static str,
    },
    /// A physics constant was zero, negative or not finite.
    #[error("physics value `{name}` must be positive, got {value}")]
    NonPositivePhysics {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A probability fell outside `0..=1`.
    #[error("rate `{name}` must lie in 0..=1, got {value}")]
    RateOutOfRange {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A lower bound exceeded its upper bound.
    #[error("range `{name}` has min {min} above max {max}")]
    InvertedRange {
        /// Range name.
        name: &'static str,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_physics_clears_two_blocks() {
        let jump = JumpProfile::default();
        assert!((jump.max_jump_height() - 174.05).abs() < 1e-9);
        assert_eq!(jump.max_block_jump_height(), 2);
        assert!((jump.max_jump_distance() - 590.0).abs() < 1e-9);
        assert!((jump.time_to_walk_tile() - 0.128).abs() < 1e-9);
    }

    #[test]
    fn negative_impulse_is_treated_as_magnitude() {
        let physics = PhysicsConfig {
            player_jump_impulse: -590.0,
            ..PhysicsConfig::default()
        };
        assert_eq!(JumpProfile::from_physics(&physics), JumpProfile::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GeneratorConfig = toml::from_str(
            r#"
            strategy = "ga"

            [population]
            size = 12
            seed = 7

            [fitness]
            ideal_extra_time_factor = 15.0
            "#,
        )
        .expect("parse");
        assert_eq!(config.strategy, Strategy::Genetic);
        assert_eq!(config.population.size, 12);
        assert_eq!(config.population.max_iterations, 10);
        assert_eq!(config.population.seed, 7);
        assert_eq!(config.fitness.ideal_extra_time_factor, 15.0);
        assert_eq!(config.chunks, ChunkConfig::default());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn largest_seed_survives_a_toml_round_trip() {
        let mut config = GeneratorConfig::default();
        config.population.seed = MAX_SEED;
        assert_eq!(config.validate(), Ok(()));
        let text = toml::to_string(&config).expect("serialize");
        let restored: GeneratorConfig = toml::from_str(&text).expect("parse");
        assert_eq!(restored, config);
    }

    #[test]
    fn validation_rejects_degenerate_settings() {
        let mut config = GeneratorConfig::default();
        config.population.size = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyPopulation));

        let mut config = GeneratorConfig::default();
        config.chunks.generation_width = 2;
        assert_eq!(
            config.validate(),
            Err(ConfigError::GenerationTooNarrow { width: 2 })
        );

        let mut config = GeneratorConfig::default();
        config.physics.gravity = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositivePhysics {
                name: "gravity",
                ..
            })
        ));

        let mut config = GeneratorConfig::default();
        config.ga.elitism = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RateOutOfRange { .. })
        ));

        let mut config = GeneratorConfig::default();
        config.streaming.trigger_distance = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InertStreaming {
                name: "streaming.trigger_distance"
            })
        );

        let mut config = GeneratorConfig::default();
        config.streaming.chunks_per_request = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InertStreaming {
                name: "streaming.chunks_per_request"
            })
        );

        let mut config = GeneratorConfig::default();
        config.population.seed = u64::MAX;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SeedOutOfRange { seed: u64::MAX })
        );

        let mut config = GeneratorConfig::default();
        config.pso.r_min = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { name: "pso.r", .. })
        ));
    }
}
