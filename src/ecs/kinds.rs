//! Typed entity kinds: how each [`EntityType`] is assembled on creation.

use glam::{Quat, Vec3};

use super::component::{
    AnimationBinding, CameraRig, EntityTag, MonsterGroup, Position, RenderBinding, Rotation,
    SyncFlags, Velocity, WanderState,
};
use super::entity::{Entity, EntityType};
use crate::error::RuntimeError;

pub trait EntityKind {
    const TYPE: EntityType;
    type Params;

    /// Attach the kind's components to a freshly popped entity.
    fn init(entity: &mut Entity, params: Self::Params) -> Result<(), RuntimeError>;
}

pub fn prefab_path(entity_type: EntityType, conf_id: i32) -> String {
    format!("{}/{}", entity_type.name(), conf_id)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerParams {
    pub conf_id: i32,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub position: Vec3,
    pub rotation: Quat,
    pub rig: CameraRig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonsterParams {
    pub conf_id: i32,
    pub position: Vec3,
    pub rotation: Quat,
    pub group_id: i32,
    pub wander_radius: f32,
    pub wander_speed: f32,
}

/// Treasure boxes and traps carry no kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapObjectParams {
    pub conf_id: i32,
    pub position: Vec3,
    pub rotation: Quat,
}

pub struct PlayerEntity;
pub struct CameraEntity;
pub struct MonsterEntity;
pub struct TreasureBoxEntity;
pub struct TrapEntity;

impl EntityKind for PlayerEntity {
    const TYPE: EntityType = EntityType::Player;
    type Params = PlayerParams;

    fn init(entity: &mut Entity, params: PlayerParams) -> Result<(), RuntimeError> {
        entity.add_component(Position(params.position))?;
        entity.add_component(Rotation(params.rotation))?;
        entity.add_component(Velocity(Vec3::ZERO))?;
        entity.add_component(EntityTag {
            conf_id: params.conf_id,
        })?;
        entity.add_component(RenderBinding::new(prefab_path(Self::TYPE, params.conf_id)))?;
        entity.add_component(AnimationBinding::default())?;
        entity.add_component(SyncFlags::all())
    }
}

impl EntityKind for CameraEntity {
    const TYPE: EntityType = EntityType::Camera;
    type Params = CameraParams;

    fn init(entity: &mut Entity, params: CameraParams) -> Result<(), RuntimeError> {
        entity.add_component(Position(params.position))?;
        entity.add_component(Rotation(params.rotation))?;
        entity.add_component(params.rig)
    }
}

impl EntityKind for MonsterEntity {
    const TYPE: EntityType = EntityType::Monster;
    type Params = MonsterParams;

    fn init(entity: &mut Entity, params: MonsterParams) -> Result<(), RuntimeError> {
        entity.add_component(Position(params.position))?;
        entity.add_component(Rotation(params.rotation))?;
        entity.add_component(Velocity(Vec3::ZERO))?;
        entity.add_component(EntityTag {
            conf_id: params.conf_id,
        })?;
        entity.add_component(RenderBinding::new(prefab_path(Self::TYPE, params.conf_id)))?;
        entity.add_component(AnimationBinding::default())?;
        entity.add_component(SyncFlags::all())?;
        entity.add_component(MonsterGroup {
            group_id: params.group_id,
        })?;
        entity.add_component(WanderState {
            home: params.position,
            radius: params.wander_radius,
            speed: params.wander_speed,
            retarget_in: 0.0,
        })
    }
}

fn init_static_object(
    entity: &mut Entity,
    entity_type: EntityType,
    params: MapObjectParams,
) -> Result<(), RuntimeError> {
    entity.add_component(Position(params.position))?;
    entity.add_component(Rotation(params.rotation))?;
    entity.add_component(EntityTag {
        conf_id: params.conf_id,
    })?;
    entity.add_component(RenderBinding::new(prefab_path(entity_type, params.conf_id)))?;
    entity.add_component(SyncFlags::all())
}

impl EntityKind for TreasureBoxEntity {
    const TYPE: EntityType = EntityType::TreasureBox;
    type Params = MapObjectParams;

    fn init(entity: &mut Entity, params: MapObjectParams) -> Result<(), RuntimeError> {
        init_static_object(entity, Self::TYPE, params)
    }
}

impl EntityKind for TrapEntity {
    const TYPE: EntityType = EntityType::Trap;
    type Params = MapObjectParams;

    fn init(entity: &mut Entity, params: MapObjectParams) -> Result<(), RuntimeError> {
        init_static_object(entity, Self::TYPE, params)
    }
}
