use std::any::Any;

use crate::{
    ecs::{
        AnimationBinding, ComponentKind, EntityFilter, RenderBinding, Stage, SyncFlags, System,
        Uuid, World,
    },
    error::RuntimeError,
};

/// Pushes dirty transforms and clips into the bound visual instances.
pub struct RenderSyncSystem {
    synced: u64,
}

impl RenderSyncSystem {
    pub const NAME: &'static str = "render_sync";

    pub fn new() -> Self {
        Self { synced: 0 }
    }

    /// Visual instances written so far.
    pub fn synced(&self) -> u64 {
        self.synced
    }
}

impl Default for RenderSyncSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for RenderSyncSystem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn filter(&self) -> EntityFilter {
        EntityFilter::requiring([ComponentKind::Render, ComponentKind::Sync])
    }

    fn stage(&self) -> Stage {
        Stage::LateUpdate
    }

    fn process(&mut self, world: &mut World, uuid: Uuid, _dt: f32) {
        let Some(entity) = world.get_entity_by_uuid_mut(uuid) else {
            return;
        };
        let Some(flags) = entity.get::<SyncFlags>().copied() else {
            return;
        };
        if !flags.any() {
            return;
        }
        let instance = entity.get::<RenderBinding>().and_then(|binding| binding.instance);
        let position = entity.position();
        let rotation = entity.rotation();
        let clip = entity.get::<AnimationBinding>().map(|binding| binding.clip);
        if let Some(sync) = entity.get_mut::<SyncFlags>() {
            sync.clear();
        }

        // Entities whose prefab failed to load have nothing to sync.
        let Some(instance) = instance else {
            return;
        };
        let mut pool = world.ctx().pool();
        let Some(visual) = pool.instance_mut(instance) else {
            world
                .diagnostics()
                .report(RuntimeError::lookup("visual instance", format!("{instance:?}")));
            return;
        };
        if flags.position {
            if let Some(position) = position {
                visual.position = position;
            }
        }
        if flags.rotation {
            if let Some(rotation) = rotation {
                visual.rotation = rotation;
            }
        }
        if flags.animation {
            visual.animation = clip;
        }
        self.synced += 1;
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::context::Context;
    use crate::ecs::{AnimationClip, MonsterEntity, MonsterParams, Position, WorldBasicData};

    #[test]
    fn test_dirty_transform_reaches_visual() {
        let mut world = World::new(WorldBasicData::new("test"), Context::with_defaults());
        world.add_system(RenderSyncSystem::new());
        let uuid = world
            .create_entity::<MonsterEntity>(MonsterParams {
                conf_id: 2,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                group_id: 0,
                wander_radius: 0.0,
                wander_speed: 0.0,
            })
            .unwrap();

        // Initial flags are all set: the first pass syncs the spawn state.
        world.late_update(0.0);
        world.late_update(0.0);
        let system = world.get_system::<RenderSyncSystem>(RenderSyncSystem::NAME).unwrap();
        assert_eq!(system.synced(), 1);

        let entity = world.get_entity_by_uuid_mut(uuid).unwrap();
        entity.get_mut::<Position>().unwrap().0 = Vec3::new(3.0, 0.0, 1.0);
        entity.get_mut::<SyncFlags>().unwrap().position = true;
        let instance = entity.get::<RenderBinding>().unwrap().instance.unwrap();
        world.late_update(0.0);

        let pool = world.ctx().pool_ref();
        let visual = pool.instance(instance).unwrap();
        assert_eq!(visual.position, Vec3::new(3.0, 0.0, 1.0));
        assert_eq!(visual.animation, Some(AnimationClip::Idle));
    }
}
