use std::any::Any;
use std::rc::Rc;

use glam::Quat;

use crate::{
    ecs::{PlayerEntity, PlayerParams, System, Uuid, World},
    level::LevelExport,
    nav::NavSurface,
};

pub const DEFAULT_PLAYER_CONF_ID: i32 = 1001;

/// Owns the player entity: spawned when the system joins a world, destroyed
/// when it leaves.
pub struct PlayerSpawnSystem {
    level: Rc<LevelExport>,
    nav: Box<dyn NavSurface>,
    conf_id: i32,
    player: Option<Uuid>,
}

impl PlayerSpawnSystem {
    pub const NAME: &'static str = "player_spawn";

    pub fn new(level: Rc<LevelExport>, nav: Box<dyn NavSurface>) -> Self {
        Self {
            level,
            nav,
            conf_id: DEFAULT_PLAYER_CONF_ID,
            player: None,
        }
    }

    pub fn player(&self) -> Option<Uuid> {
        self.player
    }
}

impl System for PlayerSpawnSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_add_to_world(&mut self, world: &mut World) {
        let spawn = self.level.player_spawn();
        let position = self.nav.snap(spawn).unwrap_or(spawn);
        self.player = world.create_entity::<PlayerEntity>(PlayerParams {
            conf_id: self.conf_id,
            position,
            rotation: Quat::IDENTITY,
        });
        if let Some(uuid) = self.player {
            log::info!("[{}] player {} spawned at {}", world.name(), uuid, position);
        }
    }

    fn on_remove_from_world(&mut self, world: &mut World) {
        if let Some(uuid) = self.player.take() {
            world.destroy_entity_by_uuid(uuid);
        }
    }

    fn on_remove(&mut self, _world: &mut World, uuid: Uuid) {
        if self.player == Some(uuid) {
            self.player = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::context::Context;
    use crate::ecs::WorldBasicData;
    use crate::level::{ExportVec3, MapDataType, MapObjectData};
    use crate::nav::FlatNavSurface;

    fn level_with_spawn(at: Vec3) -> Rc<LevelExport> {
        let mut level = LevelExport::empty(10, 10);
        level.all_other_map_datas.push(MapObjectData {
            map_data_type: MapDataType::PlayerSpawn,
            conf_id: 0,
            position: at.into(),
            rotation: ExportVec3::default(),
        });
        Rc::new(level)
    }

    fn world() -> World {
        let basic = WorldBasicData {
            name: "battle".into(),
            map_width: 10,
            map_height: 10,
            grid_size: 1.0,
        };
        World::new(basic, Context::with_defaults())
    }

    #[test]
    fn test_player_spawns_at_record() {
        let level = level_with_spawn(Vec3::ZERO);
        let nav = FlatNavSurface::for_level(&level, 0.0);
        let mut world = world();
        world.add_system(PlayerSpawnSystem::new(level, Box::new(nav)));

        let player = world.get_first_entity_by_type::<PlayerEntity>().unwrap();
        assert_eq!(player.position(), Some(Vec3::ZERO));
        let system = world.get_system::<PlayerSpawnSystem>(PlayerSpawnSystem::NAME).unwrap();
        assert_eq!(system.player(), Some(player.uuid()));
    }

    #[test]
    fn test_off_map_spawn_snaps_to_nearest_point() {
        let level = level_with_spawn(Vec3::new(-3.0, 1.0, 4.0));
        let nav = FlatNavSurface::for_level(&level, 0.0);
        let mut world = world();
        world.add_system(PlayerSpawnSystem::new(level, Box::new(nav)));

        let player = world.get_first_entity_by_type::<PlayerEntity>().unwrap();
        assert_eq!(player.position(), Some(Vec3::new(0.0, 0.0, 4.0)));
    }

    #[test]
    fn test_remove_system_despawns_player() {
        let level = level_with_spawn(Vec3::ZERO);
        let mut world = world();
        world.add_system(PlayerSpawnSystem::new(level, Box::new(crate::nav::NoNavSurface)));
        assert_eq!(world.entity_count(), 1);

        assert!(world.remove_system(PlayerSpawnSystem::NAME));
        assert!(world.get_first_entity_by_type::<PlayerEntity>().is_none());
        assert_eq!(world.entity_count(), 0);
    }
}
