use std::any::Any;

use glam::{Quat, Vec3};

use crate::{
    config::CameraConfig,
    ecs::{CameraEntity, CameraParams, PlayerEntity, Position, Rotation, Stage, System, Uuid, World},
};

/// Keeps the battle camera at a fixed offset from the player.
pub struct CameraFollowSystem {
    camera: Option<Uuid>,
    offset: Vec3,
    rotation: Quat,
}

impl CameraFollowSystem {
    pub const NAME: &'static str = "camera_follow";

    pub fn new() -> Self {
        Self {
            camera: None,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn camera(&self) -> Option<Uuid> {
        self.camera
    }

    fn anchor(world: &World) -> Vec3 {
        world
            .get_first_entity_by_type::<PlayerEntity>()
            .and_then(|player| player.position())
            .unwrap_or(Vec3::ZERO)
    }
}

impl Default for CameraFollowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CameraFollowSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn stage(&self) -> Stage {
        Stage::LateUpdate
    }

    fn on_add_to_world(&mut self, world: &mut World) {
        let config: CameraConfig = world.ctx().config().camera.clone();
        self.offset = config.follow_offset;
        self.rotation = Quat::from_rotation_x(config.pitch_degrees.to_radians());
        let position = Self::anchor(world) + self.offset;
        self.camera = world.create_entity::<CameraEntity>(CameraParams {
            position,
            rotation: self.rotation,
            rig: config.rig(),
        });
    }

    fn on_remove_from_world(&mut self, world: &mut World) {
        if let Some(uuid) = self.camera.take() {
            world.destroy_entity_by_uuid(uuid);
        }
    }

    fn on_remove(&mut self, _world: &mut World, uuid: Uuid) {
        if self.camera == Some(uuid) {
            self.camera = None;
        }
    }

    fn late_update(&mut self, world: &mut World, _dt: f32) {
        let Some(uuid) = self.camera else {
            return;
        };
        let target = Self::anchor(world) + self.offset;
        let Some(camera) = world.get_entity_by_uuid_mut(uuid) else {
            return;
        };
        if let Some(position) = camera.get_mut::<Position>() {
            position.0 = target;
        }
        if let Some(rotation) = camera.get_mut::<Rotation>() {
            rotation.0 = self.rotation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::ecs::{CameraRig, PlayerParams, WorldBasicData};

    #[test]
    fn test_camera_tracks_player() {
        let mut world = World::new(WorldBasicData::new("battle"), Context::with_defaults());
        let player = world
            .create_entity::<PlayerEntity>(PlayerParams {
                conf_id: 1001,
                position: Vec3::new(2.0, 0.0, 3.0),
                rotation: Quat::IDENTITY,
            })
            .unwrap();
        world.add_system(CameraFollowSystem::new());
        let offset = world.ctx().config().camera.follow_offset;

        let camera = world.get_first_entity_by_type::<CameraEntity>().unwrap();
        assert_eq!(camera.position(), Some(Vec3::new(2.0, 0.0, 3.0) + offset));
        assert!(camera.has(crate::ecs::ComponentKind::Camera));
        assert_eq!(camera.get::<CameraRig>().copied(), Some(world.ctx().config().camera.rig()));

        world.get_entity_by_uuid_mut(player).unwrap().get_mut::<Position>().unwrap().0 =
            Vec3::new(5.0, 0.0, 5.0);
        world.late_update(0.016);
        let camera = world.get_first_entity_by_type::<CameraEntity>().unwrap();
        assert_eq!(camera.position(), Some(Vec3::new(5.0, 0.0, 5.0) + offset));
    }

    #[test]
    fn test_camera_pitches_down() {
        let mut world = World::new(WorldBasicData::new("battle"), Context::with_defaults());
        world.add_system(CameraFollowSystem::new());
        let camera = world.get_first_entity_by_type::<CameraEntity>().unwrap();
        let forward = camera.rotation().unwrap() * Vec3::Z;
        assert!(forward.y < 0.0 && forward.z > 0.0);

        assert!(world.remove_system(CameraFollowSystem::NAME));
        assert_eq!(world.entity_count(), 0);
    }
}
