#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates Clockrun levels and dumps them as text.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clockrun_core::{GeneratorConfig, Side, Strategy, MAX_SEED};
use clockrun_rendering::{render_level, render_window, RenderStyle};
use clockrun_system_optimizer::{ChunkGenerator, ChunkReport};
use clockrun_system_streaming::StreamingLevel;
use clockrun_world::{mark_clock_placed, query, Level};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "clockrun",
    version,
    about = "Evolve endless runner levels chunk by chunk"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pre-generate a level and print it.
    Generate {
        #[command(flatten)]
        setup: Setup,
        /// Number of chunks to generate, split between both sides.
        #[arg(long, default_value_t = 4)]
        chunks: u32,
        /// First column of the printed window.
        #[arg(long, allow_hyphen_values = true)]
        from: Option<i32>,
        /// Last column of the printed window.
        #[arg(long, allow_hyphen_values = true)]
        to: Option<i32>,
    },
    /// Walk a player across the level while chunks stream in behind the scenes.
    Walk {
        #[command(flatten)]
        setup: Setup,
        /// Columns to walk.
        #[arg(long, default_value_t = 120)]
        steps: u32,
        /// Walking direction.
        #[arg(long, value_enum, default_value_t = Direction::Right)]
        direction: Direction,
        /// Columns shown on each side of the player in the final dump.
        #[arg(long, default_value_t = 20)]
        view: i32,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        setup: Setup,
    },
}

#[derive(Args, Debug)]
struct Setup {
    /// TOML file overriding the default generator configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed every chunk stream derives from.
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_SEED))]
    seed: Option<u64>,
    /// Optimizer used for every chunk.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Repair unreachable steps and spike runs before committing.
    #[arg(long)]
    playable: bool,
    /// Colour the dump with ANSI escapes.
    #[arg(long)]
    color: bool,
    /// Print per-iteration optimizer statistics.
    #[arg(long)]
    stats: bool,
    /// Write a TOML summary of every committed chunk to this file.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Pso,
    Ga,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Direction {
    Left,
    Right,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Pso => Strategy::ParticleSwarm,
            StrategyArg::Ga => Strategy::Genetic,
        }
    }
}

impl From<Direction> for Side {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Left => Side::Left,
            Direction::Right => Side::Right,
        }
    }
}

impl Setup {
    fn load(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.population.seed = seed;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        config.force_playability |= self.playable;
        config
            .validate()
            .context("generator configuration rejected")?;
        Ok(config)
    }

    const fn style(&self) -> RenderStyle {
        if self.color {
            RenderStyle::Ansi
        } else {
            RenderStyle::Plain
        }
    }
}

#[derive(Serialize)]
struct RunSummary {
    chunks: Vec<ChunkSummary>,
}

#[derive(Serialize)]
struct ChunkSummary {
    side: &'static str,
    index: u64,
    leftmost: i32,
    rightmost: i32,
    fitness: i64,
    initial_best: i64,
}

impl From<&ChunkReport> for ChunkSummary {
    fn from(report: &ChunkReport) -> Self {
        Self {
            side: report.side.label(),
            index: report.index,
            leftmost: report.range.leftmost,
            rightmost: report.range.rightmost,
            fitness: report.fitness,
            initial_best: report.initial_best,
        }
    }
}

/// Entry point for the Clockrun command-line interface.
fn main() -> Result<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Generate {
            setup,
            chunks,
            from,
            to,
        } => generate(&setup, chunks, from, to),
        Command::Walk {
            setup,
            steps,
            direction,
            view,
        } => walk(&setup, steps, direction.into(), view),
        Command::Config { setup } => {
            let config = setup.load()?;
            print!(
                "{}",
                toml::to_string(&config).context("failed to serialize configuration")?
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn read_config(path: &Path) -> Result<GeneratorConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn generate(setup: &Setup, chunks: u32, from: Option<i32>, to: Option<i32>) -> Result<()> {
    let config = setup.load()?;
    let generator = ChunkGenerator::new(config).context("failed to build chunk generator")?;
    let mut level = Level::new(&config.chunks).context("failed to build base level")?;
    info!(
        chunks,
        optimizer = generator.optimizer_name(),
        seed = config.population.seed,
        "pre-generating level"
    );
    let reports = generator
        .pregenerate(&mut level, chunks)
        .context("chunk generation failed")?;

    print_reports(&reports, setup.stats);
    let dump = match (from, to) {
        (None, None) => render_level(&level, setup.style(), None)?,
        (from, to) => render_window(
            &level,
            from.unwrap_or_else(|| query::leftmost_global_x(&level)),
            to.unwrap_or_else(|| query::rightmost_global_x(&level)),
            setup.style(),
            None,
        )?,
    };
    print!("{dump}");
    write_report(setup.report.as_deref(), &reports)
}

fn walk(setup: &Setup, steps: u32, side: Side, view: i32) -> Result<()> {
    let config = setup.load()?;
    let (streaming, mut reports) =
        StreamingLevel::bootstrap(config, 2).context("failed to bootstrap level")?;
    let mut player_x = config.chunks.origin;
    let mut clocks = 0_u32;

    for _ in 0..steps {
        let _ = streaming
            .poll(player_x)
            .context("failed to start background generation")?;
        let next_x = player_x + side.step();
        if !streaming.with_level(|level| reachable(level, next_x)) {
            warn!(player_x, "player outran generation, waiting for workers");
            reports.extend(streaming.join_all().context("background generation failed")?);
            if !streaming.with_level(|level| reachable(level, next_x)) {
                bail!("no column generated at {next_x}");
            }
        }
        player_x = next_x;
        let level = streaming.level();
        if mark_clock_placed(&mut level.write(), player_x)? {
            clocks += 1;
        }
    }
    reports.extend(streaming.join_all().context("background generation failed")?);
    info!(player_x, clocks, chunks = reports.len(), "walk finished");

    print_reports(&reports, setup.stats);
    let dump = streaming.with_level(|level| {
        let from = (player_x - view).max(query::leftmost_global_x(level));
        let to = (player_x + view).min(query::rightmost_global_x(level));
        render_window(level, from, to, setup.style(), Some(player_x))
    })?;
    print!("{dump}");
    println!("clocks collected: {clocks}");
    write_report(setup.report.as_deref(), &reports)
}

fn reachable(level: &Level, global_x: i32) -> bool {
    (query::leftmost_global_x(level)..=query::rightmost_global_x(level)).contains(&global_x)
}

fn print_reports(reports: &[ChunkReport], stats: bool) {
    for report in reports {
        println!(
            "{:>5} #{:<3} [{:>5}, {:>5}] fitness {:>6} (initial best {:>6})",
            report.side.label(),
            report.index,
            report.range.leftmost,
            report.range.rightmost,
            report.fitness,
            report.initial_best
        );
        if stats {
            for iteration in &report.iterations {
                println!(
                    "        iter {:>3}: best {:>6} mean {:>9.2} median {:>9.2} top {:>9.2}",
                    iteration.iteration,
                    iteration.best,
                    iteration.mean,
                    iteration.median,
                    iteration.top_mean
                );
            }
        }
    }
}

fn write_report(path: Option<&Path>, reports: &[ChunkReport]) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let summary = RunSummary {
        chunks: reports.iter().map(ChunkSummary::from).collect(),
    };
    let text = toml::to_string(&summary).context("failed to serialize chunk report")?;
    fs::write(path, text).with_context(|| format!("failed to write report {}", path.display()))
}
