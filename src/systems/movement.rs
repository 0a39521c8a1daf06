use std::any::Any;

use glam::{Quat, Vec3};

use crate::{
    ecs::{
        ComponentKind, EntityFilter, Position, Rotation, Stage, SyncFlags, System, Uuid, Velocity,
        World,
    },
    systems::report_missing,
};

const MIN_SPEED_SQ: f32 = 1e-8;

/// Integrates velocity into position on the fixed cadence and turns movers
/// to face their heading.
pub struct MovementSystem {
    moved: u64,
}

impl MovementSystem {
    pub const NAME: &'static str = "movement";

    pub fn new() -> Self {
        Self { moved: 0 }
    }

    /// Entity-steps that changed a position.
    pub fn moved(&self) -> u64 {
        self.moved
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
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
        EntityFilter::requiring([ComponentKind::Velocity])
    }

    fn stage(&self) -> Stage {
        Stage::FixedUpdate
    }

    fn process(&mut self, world: &mut World, uuid: Uuid, dt: f32) {
        let Some(entity) = world.get_entity_by_uuid_mut(uuid) else {
            return;
        };
        let velocity = entity.get::<Velocity>().map_or(Vec3::ZERO, |v| v.0);
        if velocity.length_squared() < MIN_SPEED_SQ {
            return;
        }
        let Some(position) = entity.get_mut::<Position>() else {
            report_missing(world, Self::NAME, uuid, ComponentKind::Position);
            return;
        };
        position.0 += velocity * dt;

        let heading = Vec3::new(velocity.x, 0.0, velocity.z);
        let turned = match entity.get_mut::<Rotation>() {
            Some(rotation) if heading.length_squared() >= MIN_SPEED_SQ => {
                rotation.0 = Quat::from_rotation_y(heading.x.atan2(heading.z));
                true
            }
            _ => false,
        };
        if let Some(sync) = entity.get_mut::<SyncFlags>() {
            sync.position = true;
            sync.rotation |= turned;
        }
        self.moved += 1;
    }
}
