//! The battle world: a level's player, camera and map objects plus the
//! gameplay systems that drive them.

use std::rc::Rc;

use crate::{
    ecs::{World, WorldBasicData, WorldBlueprint},
    level::LevelExport,
    nav::FlatNavSurface,
    systems::{
        AnimationSystem, CameraFollowSystem, MapObjectSpawnSystem, MonsterWanderSystem,
        MovementSystem, PlayerSpawnSystem, RenderSyncSystem,
    },
};

/// Installs the battle systems in their fixed registration order:
/// player, camera, map objects, wander, movement, animation, render sync.
pub struct BattleBlueprint {
    level: Rc<LevelExport>,
}

impl BattleBlueprint {
    pub fn new(level: Rc<LevelExport>) -> Self {
        Self { level }
    }

    pub fn level(&self) -> &LevelExport {
        &self.level
    }

    /// Basic data for a world named `name` over this level.
    pub fn basic_data(&self, name: impl Into<String>) -> WorldBasicData {
        let map = &self.level.map_data;
        WorldBasicData {
            name: name.into(),
            map_width: map.width,
            map_height: map.height,
            grid_size: map.grid_size,
        }
    }
}

impl WorldBlueprint for BattleBlueprint {
    fn install(self: Box<Self>, world: &mut World) {
        let height = world.ctx().config().ground.point.y;
        let nav = || Box::new(FlatNavSurface::for_level(&self.level, height));

        world.add_system(PlayerSpawnSystem::new(self.level.clone(), nav()));
        world.add_system(CameraFollowSystem::new());
        world.add_system(MapObjectSpawnSystem::new(self.level.clone(), nav()));
        world.add_system(MonsterWanderSystem::new());
        world.add_system(MovementSystem::new());
        world.add_system(AnimationSystem::new());
        world.add_system(RenderSyncSystem::new());
    }
}
