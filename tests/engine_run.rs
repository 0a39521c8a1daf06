use std::path::Path;
use std::rc::Rc;

use glam::Vec3;
use mapfield::{
    battle::BattleBlueprint,
    config::RuntimeConfig,
    context::Context,
    ecs::{EntityType, PlayerEntity, Velocity, WorldManager},
    engine::{Engine, EngineSettings},
    level::LevelLoader,
    pool::PrefabCatalog,
    snapshot::SnapshotManager,
};
use tempfile::tempdir;

fn manifest_dir() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn battle_engine(config: RuntimeConfig) -> Engine {
    let level = LevelLoader::new(manifest_dir())
        .load("levels/demo.json")
        .expect("demo level loads");
    let settings = EngineSettings::from_config(&config);
    let ctx = Context::new(config, Box::new(PrefabCatalog::permissive()));
    let mut manager = WorldManager::new(ctx);
    let blueprint = BattleBlueprint::new(Rc::new(level));
    let basic = blueprint.basic_data("battle");
    let world = manager.create_world(basic, blueprint).expect("world created");
    let player = world
        .get_first_entity_by_type::<PlayerEntity>()
        .map(|player| player.uuid())
        .expect("player spawned");
    world
        .get_entity_by_uuid_mut(player)
        .and_then(|player| player.get_mut::<Velocity>())
        .expect("player can move")
        .0 = Vec3::new(3.0, 0.0, 3.0);
    Engine::new(manager, settings).expect("engine builds")
}

#[test]
fn config_file_loads() {
    let config = RuntimeConfig::from_yaml(manifest_dir().join("configs/battle.yaml"))
        .expect("config should load");
    assert_eq!(config.name, "battle");
    assert_eq!(config.grid.cell_size, 4.0);
    assert_eq!(config.camera.follow_offset, Vec3::new(0.0, 12.0, -8.0));
    assert_eq!(config.timing.max_catch_up_steps, 5);
}

#[test]
fn engine_runs_hook_each_frame() {
    let mut engine = battle_engine(RuntimeConfig::battle());

    let mut frames = Vec::new();
    let mut fixed_steps = 0;
    engine
        .run_with_hook(60, 1.0 / 60.0, |summary| {
            frames.push(summary.frame);
            fixed_steps += summary.fixed_steps;
        })
        .expect("run succeeds");

    assert_eq!(frames.len(), 60);
    assert_eq!(frames.first().copied(), Some(1));
    assert_eq!(frames.last().copied(), Some(60));
    // One simulated second at 50 Hz, give or take accumulator rounding.
    assert!((49..=50).contains(&fixed_steps));

    let world = engine.manager().get_world("battle").expect("world alive");
    let player = world
        .get_first_entity_by_type::<PlayerEntity>()
        .and_then(|player| player.position())
        .expect("player placed");
    assert!(player.x > 5.0 && player.z > 5.0);
    assert_eq!(engine.ctx().diagnostics().total(), 0);
}

#[test]
fn same_seed_same_run() {
    let positions = |seed: u64| {
        let mut config = RuntimeConfig::battle();
        config.random_seed = seed;
        let mut engine = battle_engine(config);
        engine.run(120, 1.0 / 60.0).expect("run succeeds");
        let world = engine.manager().get_world("battle").expect("world alive");
        let mut monsters: Vec<(u64, Vec3)> = world
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Monster)
            .map(|entity| (entity.uuid().raw(), entity.position().unwrap_or_default()))
            .collect();
        monsters.sort_by_key(|(uuid, _)| *uuid);
        monsters.into_iter().map(|(_, position)| position).collect::<Vec<_>>()
    };
    assert_eq!(positions(7), positions(7));
}

#[test]
fn snapshots_are_written_on_interval() {
    let temp = tempdir().expect("tempdir");
    let mut config = RuntimeConfig::battle();
    config.snapshot.every_frames = 10;
    config.snapshot.output_dir = temp.path().display().to_string();
    let mut engine = battle_engine(config);

    let last = engine
        .run(25, 1.0 / 60.0)
        .expect("run succeeds")
        .expect("frames ran");
    assert_eq!(last.frame, 25);

    let snapshots = SnapshotManager::new(temp.path(), 10).expect("snapshot dir");
    let written = snapshots.list_snapshots().expect("list snapshots");
    assert_eq!(written.len(), 2);

    let metadata = snapshots.load_snapshot(&written[1]).expect("metadata");
    assert_eq!(metadata.frame, 20);
    let world = snapshots
        .load_world(&written[1], "battle")
        .expect("world snapshot");
    assert_eq!(world.count_of(EntityType::Player), 1);
    assert_eq!(world.count_of(EntityType::Camera), 1);
    assert_eq!(metadata.worlds[0].entity_count, world.entities.len());
}

#[test]
fn shutdown_returns_every_visual() {
    let mut engine = battle_engine(RuntimeConfig::battle());
    engine.run(30, 1.0 / 60.0).expect("run succeeds");
    assert!(engine.ctx().pool_ref().live_instances() > 0);

    engine.shutdown();
    assert!(engine.manager().is_empty());
    assert_eq!(engine.ctx().pool_ref().live_instances(), 0);
}
