use std::rc::Rc;

use glam::{Vec2, Vec3};
use mapfield::{
    battle::BattleBlueprint,
    context::Context,
    ecs::{EntityType, PlayerEntity, Position, World, WorldBasicData, WorldManager},
    level::{ExportVec3, LevelExport, LevelLoader, MapDataType, MapObjectData, MonsterMapData},
    math::ViewRect,
    nav::{FlatNavSurface, NoNavSurface},
    systems::{MapObjectSpawnSystem, PlayerSpawnSystem, SpawnReport},
};

fn monster(x: f32, z: f32) -> MonsterMapData {
    MonsterMapData {
        map_data_type: MapDataType::Monster,
        conf_id: 2001,
        position: ExportVec3::new(x, 0.0, z),
        rotation: ExportVec3::default(),
        group_id: 0,
    }
}

fn spawner(world: &World) -> &MapObjectSpawnSystem {
    world
        .get_system::<MapObjectSpawnSystem>(MapObjectSpawnSystem::NAME)
        .expect("spawn system registered")
}

fn apply(world: &mut World, center: Vec2, extents: Vec2) -> SpawnReport {
    world
        .with_system::<MapObjectSpawnSystem, _>(MapObjectSpawnSystem::NAME, |system, world| {
            system.apply_view_rect(world, ViewRect::new(center, extents))
        })
        .expect("spawn system available")
}

/// Every spawnable record inside `rect` is spawned and nothing else is.
fn assert_matches_rect(world: &World, level: &LevelExport, rect: ViewRect) {
    let system = spawner(world);
    for record in level.records() {
        if record.map_data_type == MapDataType::PlayerSpawn {
            continue;
        }
        let inside = rect.contains_world(record.position);
        assert_eq!(
            system.spawned_uuid(record.id).is_some(),
            inside,
            "record {:?} at {}",
            record.id,
            record.position
        );
    }
    for entity in world.entities() {
        if matches!(entity.entity_type(), EntityType::Player | EntityType::Camera) {
            continue;
        }
        assert!(rect.contains_world(entity.position().expect("spawned entities are placed")));
    }
}

#[test]
fn player_spawns_at_origin_on_small_map() {
    let mut level = LevelExport::empty(10, 10);
    level.all_other_map_datas.push(MapObjectData {
        map_data_type: MapDataType::PlayerSpawn,
        conf_id: 0,
        position: ExportVec3::new(0.0, 0.0, 0.0),
        rotation: ExportVec3::default(),
    });
    let level = Rc::new(level);
    let nav = FlatNavSurface::for_level(&level, 0.0);

    let mut manager = WorldManager::new(Context::with_defaults());
    let blueprint = BattleBlueprint::new(level.clone());
    let basic = blueprint.basic_data("battle");
    assert_eq!((basic.map_width, basic.map_height), (10, 10));
    let world = manager
        .create_world(basic, move |world: &mut World| {
            world.add_system(PlayerSpawnSystem::new(level, Box::new(nav)));
        })
        .expect("world created");

    let player = world
        .get_first_entity_by_type::<PlayerEntity>()
        .expect("player spawned");
    assert!(!player.uuid().is_none());
    assert_eq!(player.position(), Some(Vec3::ZERO));
}

#[test]
fn moving_rectangle_swaps_monsters() {
    let mut level = LevelExport::empty(32, 32);
    level.all_monster_map_datas.push(monster(4.0, 4.0));
    level.all_monster_map_datas.push(monster(20.0, 20.0));
    let level = Rc::new(level);

    let mut world = World::new(WorldBasicData::new("battle"), Context::with_defaults());
    world.add_system(MapObjectSpawnSystem::new(level.clone(), Box::new(NoNavSurface)));

    let first = apply(&mut world, Vec2::ZERO, Vec2::splat(10.0));
    assert_eq!(first.spawned.len(), 1);
    assert!(first.despawned.is_empty());
    let near = first.spawned[0];
    assert_eq!(
        world.get_entity_by_uuid(near).and_then(|e| e.position()),
        Some(Vec3::new(4.0, 0.0, 4.0))
    );

    let second = apply(&mut world, Vec2::splat(20.0), Vec2::splat(10.0));
    assert_eq!(second.spawned.len(), 1);
    assert_eq!(second.despawned, vec![near]);
    assert!(!world.contains_entity(near));
    assert_eq!(world.entities_of_type(EntityType::Monster), second.spawned.as_slice());
    assert_eq!(spawner(&world).spawned_count(), 1);

    // A second tick over the same rectangle changes nothing.
    assert!(apply(&mut world, Vec2::splat(20.0), Vec2::splat(10.0)).is_empty());
    assert_eq!(spawner(&world).stats().despawned, 1);
    assert_eq!(world.diagnostics().total(), 0);
}

#[test]
fn camera_driven_spawning_tracks_the_view() {
    let level = Rc::new(
        LevelLoader::new(env!("CARGO_MANIFEST_DIR"))
            .load("levels/demo.json")
            .expect("demo level loads"),
    );
    let mut manager = WorldManager::new(Context::with_defaults());
    let blueprint = BattleBlueprint::new(level.clone());
    let basic = blueprint.basic_data("battle");
    let world = manager.create_world(basic, blueprint).expect("world created");

    world.update(1.0 / 60.0);
    let rect = spawner(world).view_rect().expect("camera sees the ground");
    assert_matches_rect(world, &level, rect);
    let first_pass = spawner(world).spawned_count();
    assert!(first_pass > 0);

    // Stationary camera: no further refreshes, no churn.
    for _ in 0..10 {
        world.update(1.0 / 60.0);
    }
    assert_eq!(spawner(world).stats().refreshes, 1);
    assert_eq!(spawner(world).spawned_count(), first_pass);

    let player = world
        .get_first_entity_by_type::<PlayerEntity>()
        .map(|player| player.uuid())
        .expect("player spawned");
    world
        .get_entity_by_uuid_mut(player)
        .and_then(|player| player.get_mut::<Position>())
        .expect("player has a position")
        .0 = Vec3::new(30.0, 0.0, 30.0);
    world.late_update(1.0 / 60.0);
    world.update(1.0 / 60.0);

    let moved = spawner(world).view_rect().expect("camera sees the ground");
    assert_ne!(moved, rect);
    assert_matches_rect(world, &level, moved);
    assert!(!moved.contains_world(Vec3::new(4.0, 0.0, 4.0)));
    assert_eq!(spawner(world).stats().refreshes, 2);
    assert!(spawner(world).stats().despawned > 0);
}
