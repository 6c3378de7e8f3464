use clockrun_core::{ColumnAttributes, GeneratorConfig, Side, Strategy};
use clockrun_system_optimizer::ChunkGenerator;
use clockrun_world::{query, Level};

fn small_config(strategy: Strategy) -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.strategy = strategy;
    config.population.size = 8;
    config.population.max_iterations = 4;
    config.population.seed = 0x5eed;
    config.chunks.generation_width = 12;
    config.chunks.reference_width = 6;
    config
}

fn snapshot(level: &Level) -> Vec<ColumnAttributes> {
    query::columns_between(
        level,
        query::leftmost_global_x(level),
        query::rightmost_global_x(level),
    )
    .expect("columns")
}

#[test]
fn pregeneration_grows_both_sides_contiguously() {
    for strategy in [Strategy::ParticleSwarm, Strategy::Genetic] {
        let config = small_config(strategy);
        let generator = ChunkGenerator::new(config).expect("generator");
        let mut level = Level::new(&config.chunks).expect("level");
        let reports = generator.pregenerate(&mut level, 5).expect("pregenerate");

        assert_eq!(reports.len(), 5);
        assert_eq!(
            reports.iter().filter(|report| report.side == Side::Left).count(),
            2
        );
        assert_eq!(query::leftmost_global_x(&level), -2 - 24);
        assert_eq!(query::rightmost_global_x(&level), 2 + 36);
        assert!(level.chain().is_contiguous());

        let columns = snapshot(&level);
        for pair in columns.windows(2) {
            assert_eq!(pair[1].global_x, pair[0].global_x + 1);
        }
        assert!(columns.iter().all(|column| !column.is_mutable));
    }
}

#[test]
fn committed_chunks_survive_later_generation() {
    let config = small_config(Strategy::Genetic);
    let generator = ChunkGenerator::new(config).expect("generator");
    let mut level = Level::new(&config.chunks).expect("level");
    let _ = generator.pregenerate(&mut level, 2).expect("pregenerate");
    let before = snapshot(&level);

    let _ = generator
        .generate_chunks(&mut level, 2, Side::Left)
        .expect("left");
    let _ = generator
        .generate_chunks(&mut level, 2, Side::Right)
        .expect("right");

    let after = query::columns_between(
        &level,
        before[0].global_x,
        before[before.len() - 1].global_x,
    )
    .expect("after");
    assert_eq!(after, before);
}

#[test]
fn same_seed_replays_the_same_level() {
    for strategy in [Strategy::ParticleSwarm, Strategy::Genetic] {
        let build = || {
            let config = small_config(strategy);
            let generator = ChunkGenerator::new(config).expect("generator");
            let mut level = Level::new(&config.chunks).expect("level");
            let reports = generator.pregenerate(&mut level, 4).expect("pregenerate");
            (snapshot(&level), reports)
        };
        let (first_level, first_reports) = build();
        let (second_level, second_reports) = build();
        assert_eq!(first_level, second_level);
        assert_eq!(first_reports, second_reports);
    }
}

#[test]
fn playability_repair_keeps_steps_climbable() {
    let mut config = small_config(Strategy::Genetic);
    config.force_playability = true;
    let generator = ChunkGenerator::new(config).expect("generator");
    let max_step = generator.evaluator().jump().max_block_jump_height();
    let mut level = Level::new(&config.chunks).expect("level");
    let _ = generator
        .generate_chunks(&mut level, 3, Side::Right)
        .expect("chunks");

    let columns = snapshot(&level);
    for pair in columns.windows(2) {
        let height = |column: &ColumnAttributes| {
            if column.ground_height == 0 {
                0
            } else {
                column.ground_height + u8::from(column.has_spike)
            }
        };
        assert!(
            height(&pair[0]).abs_diff(height(&pair[1])) <= max_step,
            "step at {}",
            pair[1].global_x
        );
    }
}

#[test]
fn reports_record_every_iteration() {
    let config = small_config(Strategy::ParticleSwarm);
    let generator = ChunkGenerator::new(config).expect("generator");
    let mut level = Level::new(&config.chunks).expect("level");
    let reports = generator
        .generate_chunks(&mut level, 1, Side::Right)
        .expect("chunk");
    let report = &reports[0];
    assert_eq!(report.iterations.len(), 4);
    assert!(report.fitness >= report.initial_best);
    assert!(report
        .iterations
        .iter()
        .all(|stats| stats.coefficients.is_some() && stats.best as f64 >= stats.mean));
    assert_eq!((report.range.leftmost, report.range.rightmost), (3, 14));
}
