use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use clap::Parser;
use glam::{Vec2, Vec3};

use mapfield::{
    battle::BattleBlueprint,
    config::RuntimeConfig,
    context::Context,
    ecs::{PlayerEntity, Velocity, WorldManager},
    engine::{Engine, EngineSettings},
    level::LevelLoader,
    pool::PrefabCatalog,
    systems::MapObjectSpawnSystem,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless mapfield battle runner")]
struct Cli {
    /// Path to the level export JSON
    #[arg(long, default_value = "levels/demo.json")]
    level: PathBuf,

    /// Runtime configuration YAML (built-in battle preset when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Player velocity as "x,z" in units per second; the camera follows it
    #[arg(long, value_parser = parse_pan, default_value = "2,2")]
    pan: Vec2,

    /// Override snapshot interval in frames
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn parse_pan(value: &str) -> Result<Vec2, String> {
    let (x, z) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,z\", got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid pan component {part:?}: {err}"))
    };
    Ok(Vec2::new(parse(x)?, parse(z)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_yaml(path)?,
        None => RuntimeConfig::battle(),
    };
    if let Some(interval) = cli.snapshot_interval {
        config.snapshot.every_frames = interval;
    }
    if let Some(dir) = &cli.snapshot_dir {
        config.snapshot.output_dir = dir.display().to_string();
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    let level = Rc::new(LevelLoader::new(".").load(&cli.level)?);
    let settings = EngineSettings::from_config(&config);
    let world_name = config.name.clone();
    let ctx = Context::new(config, Box::new(PrefabCatalog::permissive()));

    let mut manager = WorldManager::new(ctx);
    let blueprint = BattleBlueprint::new(level);
    let basic = blueprint.basic_data(world_name.as_str());
    let world = manager
        .create_world(basic, blueprint)
        .with_context(|| format!("Failed to create world `{world_name}`"))?;
    let player = world
        .get_first_entity_by_type::<PlayerEntity>()
        .map(|player| player.uuid())
        .context("Battle world has no player")?;
    if let Some(velocity) = world
        .get_entity_by_uuid_mut(player)
        .and_then(|player| player.get_mut::<Velocity>())
    {
        velocity.0 = Vec3::new(cli.pan.x, 0.0, cli.pan.y);
    }

    let mut engine = Engine::new(manager, settings)?;
    let mut snapshots = 0;
    engine.run_with_hook(cli.frames, cli.dt, |summary| {
        if summary.snapshot_path.is_some() {
            snapshots += 1;
        }
    })?;

    let world = engine
        .manager()
        .get_world(&world_name)
        .context("Battle world disappeared")?;
    let stats = world
        .get_system::<MapObjectSpawnSystem>(MapObjectSpawnSystem::NAME)
        .map(|system| system.stats())
        .unwrap_or_default();
    let player_position = world
        .get_entity_by_uuid(player)
        .and_then(|player| player.position())
        .unwrap_or_default();
    println!("World '{}' ran {} frames", world_name, engine.frame_count());
    println!(
        "  entities: {}, live visuals: {}",
        world.entity_count(),
        engine.ctx().pool_ref().live_instances()
    );
    println!(
        "  spawned: {}, despawned: {}, snapshots: {}",
        stats.spawned,
        stats.despawned,
        snapshots
    );
    println!(
        "  player at {:.2}, diagnostics: {}",
        player_position,
        engine.ctx().diagnostics().total()
    );

    engine.shutdown();
    Ok(())
}
