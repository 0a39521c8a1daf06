use std::any::Any;
use std::f32::consts::TAU;

use glam::Vec3;
use rand_chacha::ChaCha8Rng;

use crate::{
    ecs::{
        ComponentKind, EntityFilter, EntityType, Stage, System, Uuid, Velocity, WanderState, World,
    },
    math::ground_xz,
    rng::{RngExt, RngManager},
    systems::report_missing,
};

/// Chance a monster idles instead of picking a new heading.
const IDLE_CHANCE: f32 = 0.3;
const RETARGET_MIN: f32 = 1.0;
const RETARGET_MAX: f32 = 3.0;

/// Wanders monsters around their spawn point on the logic cadence.
///
/// Headings come from a per-world stream, so two runs with the same seed
/// steer identically.
pub struct MonsterWanderSystem {
    rng: Option<ChaCha8Rng>,
}

impl MonsterWanderSystem {
    pub const NAME: &'static str = "monster_wander";

    pub fn new() -> Self {
        Self { rng: None }
    }

    fn steer(
        rng: &mut ChaCha8Rng,
        position: Vec3,
        wander: &mut WanderState,
        dt: f32,
    ) -> Option<Vec3> {
        if wander.speed <= 0.0 || wander.radius <= 0.0 {
            return Some(Vec3::ZERO);
        }
        let to_home = ground_xz(wander.home) - ground_xz(position);
        if to_home.length() > wander.radius {
            let heading = to_home.normalize_or_zero() * wander.speed;
            return Some(Vec3::new(heading.x, 0.0, heading.y));
        }

        wander.retarget_in -= dt;
        if wander.retarget_in > 0.0 {
            return None;
        }
        wander.retarget_in = rng.random_f32(RETARGET_MIN, RETARGET_MAX);
        if rng.random_bool(IDLE_CHANCE) {
            return Some(Vec3::ZERO);
        }
        let angle = rng.random_f32(0.0, TAU);
        Some(Vec3::new(angle.sin(), 0.0, angle.cos()) * wander.speed)
    }
}

impl Default for MonsterWanderSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MonsterWanderSystem {
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
        EntityFilter::of_types([EntityType::Monster]).with(ComponentKind::Wander)
    }

    fn stage(&self) -> Stage {
        Stage::LogicUpdate
    }

    fn on_add_to_world(&mut self, world: &mut World) {
        let streams: RngManager = world.ctx().rng();
        self.rng = Some(streams.stream(world.name(), Self::NAME));
    }

    fn process(&mut self, world: &mut World, uuid: Uuid, dt: f32) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };
        let Some(entity) = world.get_entity_by_uuid_mut(uuid) else {
            return;
        };
        let position = entity.position().unwrap_or_default();
        let Some(wander) = entity.get_mut::<WanderState>() else {
            report_missing(world, Self::NAME, uuid, ComponentKind::Wander);
            return;
        };
        let Some(heading) = Self::steer(rng, position, wander, dt) else {
            return;
        };
        match entity.get_mut::<Velocity>() {
            Some(velocity) => velocity.0 = heading,
            None => report_missing(world, Self::NAME, uuid, ComponentKind::Velocity),
        }
    }
}
