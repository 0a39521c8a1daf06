mod animation;
mod camera_follow;
mod map_spawn;
mod movement;
mod player_spawn;
mod render_sync;
mod wander;

pub use animation::AnimationSystem;
pub use camera_follow::CameraFollowSystem;
pub use map_spawn::{MapObjectSpawnSystem, SpawnReport, SpawnStats};
pub use movement::MovementSystem;
pub use player_spawn::PlayerSpawnSystem;
pub use render_sync::RenderSyncSystem;
pub use wander::MonsterWanderSystem;

use crate::{
    ecs::{ComponentKind, Uuid, World},
    error::RuntimeError,
};

/// Report a filter-matched entity that lacks a component `system` relies on.
pub(crate) fn report_missing(world: &World, system: &str, uuid: Uuid, component: ComponentKind) {
    world
        .diagnostics()
        .report(RuntimeError::CapabilityMissing {
            system: system.to_string(),
            uuid,
            component,
        });
}
