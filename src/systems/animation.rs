use std::any::Any;

use crate::{
    ecs::{
        AnimationBinding, AnimationClip, ComponentKind, EntityFilter, SyncFlags, System, Uuid,
        Velocity, World,
    },
    systems::report_missing,
};

/// Below this speed an entity plays its idle clip.
const RUN_THRESHOLD: f32 = 0.05;

/// Picks idle/run clips from velocity and advances clip time.
pub struct AnimationSystem;

impl AnimationSystem {
    pub const NAME: &'static str = "animation";

    pub fn new() -> Self {
        Self
    }

    fn clip_for(speed: f32) -> AnimationClip {
        if speed > RUN_THRESHOLD {
            AnimationClip::Run
        } else {
            AnimationClip::Idle
        }
    }
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AnimationSystem {
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
        EntityFilter::requiring([ComponentKind::Animation, ComponentKind::Velocity])
    }

    fn process(&mut self, world: &mut World, uuid: Uuid, dt: f32) {
        let Some(entity) = world.get_entity_by_uuid_mut(uuid) else {
            return;
        };
        let speed = entity.get::<Velocity>().map_or(0.0, |v| v.0.length());
        let Some(binding) = entity.get_mut::<AnimationBinding>() else {
            report_missing(world, Self::NAME, uuid, ComponentKind::Animation);
            return;
        };

        let clip = Self::clip_for(speed);
        if binding.clip == clip {
            binding.time += dt * binding.speed;
            return;
        }
        binding.clip = clip;
        binding.time = 0.0;
        if let Some(sync) = entity.get_mut::<SyncFlags>() {
            sync.animation = true;
        }
    }
}
