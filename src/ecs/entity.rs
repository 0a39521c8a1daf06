//! Entity identity and the pooled entity record.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::component::{
    Component, ComponentData, ComponentKind, ComponentSet, Position, RenderBinding, Rotation,
};
use crate::error::RuntimeError;
use crate::pool::{InstanceHandle, PoolManager, Poolable};

/// Process-unique entity id. `0` never names a live entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uuid(u64);

impl Uuid {
    pub const NONE: Uuid = Uuid(0);

    pub fn from_raw(raw: u64) -> Self {
        Uuid(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Player,
    Camera,
    Monster,
    TreasureBox,
    Trap,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Player,
        EntityType::Camera,
        EntityType::Monster,
        EntityType::TreasureBox,
        EntityType::Trap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityType::Player => "Player",
            EntityType::Camera => "Camera",
            EntityType::Monster => "Monster",
            EntityType::TreasureBox => "TreasureBox",
            EntityType::Trap => "Trap",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pooled container of components.
///
/// Entities live in per-type pools owned by their world. `entity_type` is the
/// pool key and survives disposal; everything else is reset.
#[derive(Debug)]
pub struct Entity {
    uuid: Uuid,
    entity_type: EntityType,
    components: ComponentSet,
}

impl Entity {
    pub(crate) fn blank(entity_type: EntityType) -> Self {
        Self {
            uuid: Uuid::NONE,
            entity_type,
            components: ComponentSet::new(),
        }
    }

    pub(crate) fn assign_identity(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn get<T: ComponentData>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    pub fn get_mut<T: ComponentData>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.components.has(kind)
    }

    pub fn add_component(&mut self, component: impl Into<Component>) -> Result<(), RuntimeError> {
        self.components.insert(component.into())
    }

    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Component> {
        self.components.remove(kind)
    }

    pub fn position(&self) -> Option<Vec3> {
        self.get::<Position>().map(|p| p.0)
    }

    pub fn rotation(&self) -> Option<Quat> {
        self.get::<Rotation>().map(|r| r.0)
    }

    /// Releases resources owned outside the entity. Returns the visual
    /// instance handed back to the pool, if one was bound.
    pub(crate) fn on_destroy(&mut self, visuals: &mut PoolManager) -> Option<InstanceHandle> {
        let binding = self.components.get_mut::<RenderBinding>()?;
        let handle = binding.instance.take()?;
        visuals
            .release_prefab_instance(&binding.prefab_path, handle)
            .then_some(handle)
    }
}

impl Poolable for Entity {
    fn on_dispose(&mut self) {
        self.uuid = Uuid::NONE;
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::ecs::component::{EntityTag, Velocity};
    use crate::error::Diagnostics;
    use crate::pool::{Pool, PrefabCatalog};

    #[test]
    fn test_disposed_entity_keeps_no_state() {
        let mut pool = Pool::new();
        let (handle, entity) = pool.pop_with(|| Entity::blank(EntityType::Monster));
        entity.assign_identity(Uuid::from_raw(9));
        entity.add_component(Velocity(Vec3::X)).unwrap();
        entity.add_component(EntityTag { conf_id: 3 }).unwrap();

        pool.push(handle).unwrap();
        let (_, reused) = pool.pop_with(|| Entity::blank(EntityType::Monster));

        assert!(reused.uuid().is_none());
        assert!(reused.components().is_empty());
        assert_eq!(reused.entity_type(), EntityType::Monster);
    }

    #[test]
    fn test_on_destroy_releases_bound_instance() {
        let diagnostics = Rc::new(Diagnostics::new());
        let mut visuals = PoolManager::new(Box::new(PrefabCatalog::permissive()), diagnostics);
        let instance = visuals.pop("Trap/5").unwrap();

        let mut entity = Entity::blank(EntityType::Trap);
        entity
            .add_component(RenderBinding {
                prefab_path: "Trap/5".into(),
                instance: Some(instance),
            })
            .unwrap();

        assert_eq!(entity.on_destroy(&mut visuals), Some(instance));
        assert!(visuals.instance(instance).is_none());
        assert_eq!(entity.get::<RenderBinding>().unwrap().instance, None);
        // A second destroy has nothing left to release.
        assert_eq!(entity.on_destroy(&mut visuals), None);
    }

    #[test]
    fn test_get_never_constructs() {
        let entity = Entity::blank(EntityType::Player);
        assert!(entity.get::<Position>().is_none());
        assert!(entity.position().is_none());
        assert!(!entity.has(ComponentKind::Position));
    }
}
