//! Entity Component System runtime
//!
//! Pooled entities with a closed component set, systems ticked per stage in
//! registration order, and worlds grouped under a [`WorldManager`].

pub mod component;
pub mod entity;
pub mod kinds;
pub mod manager;
pub mod registry;
pub mod system;
pub mod world;

pub use component::{
    AnimationBinding, AnimationClip, CameraRig, Component, ComponentData, ComponentKind,
    ComponentSet, EntityTag, MonsterGroup, Position, RenderBinding, Rotation, SyncFlags, Velocity,
    WanderState,
};
pub use entity::{Entity, EntityType, Uuid};
pub use kinds::{
    CameraEntity, CameraParams, EntityKind, MapObjectParams, MonsterEntity, MonsterParams,
    PlayerEntity, PlayerParams, TrapEntity, TreasureBoxEntity,
};
pub use manager::{EmptyBlueprint, WorldBlueprint, WorldManager, WorldRequest};
pub use registry::EntityRegistry;
pub use system::{EntityFilter, Stage, System};
pub use world::{ParentNode, World, WorldBasicData};
