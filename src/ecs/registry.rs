//! Entity registry: per-type entity pools plus the uuid and type indexes.

use std::collections::BTreeMap;

use super::entity::{Entity, EntityType, Uuid};
use crate::error::RuntimeError;
use crate::pool::{Handle, InstanceHandle, Pool, PoolManager, PoolStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntityKey {
    entity_type: EntityType,
    handle: Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Despawned {
    pub entity_type: EntityType,
    pub released: Option<InstanceHandle>,
}

/// Uuids increase monotonically, so iterating `by_uuid` visits entities in
/// registration order.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    pools: BTreeMap<EntityType, Pool<Entity>>,
    by_uuid: BTreeMap<Uuid, EntityKey>,
    by_type: BTreeMap<EntityType, Vec<Uuid>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop an entity of `entity_type` and register it under `uuid`.
    pub fn spawn(&mut self, uuid: Uuid, entity_type: EntityType) -> &mut Entity {
        let pool = self.pools.entry(entity_type).or_default();
        let (handle, entity) = pool.pop_with(|| Entity::blank(entity_type));
        entity.assign_identity(uuid);
        self.by_uuid.insert(uuid, EntityKey { entity_type, handle });
        self.by_type.entry(entity_type).or_default().push(uuid);
        entity
    }

    /// Unregister `uuid`, release its external resources and return the slot
    /// to its pool.
    pub fn despawn(
        &mut self,
        uuid: Uuid,
        visuals: &mut PoolManager,
    ) -> Result<Despawned, RuntimeError> {
        let key = self
            .by_uuid
            .remove(&uuid)
            .ok_or_else(|| RuntimeError::lookup("entity", uuid))?;
        if let Some(bucket) = self.by_type.get_mut(&key.entity_type) {
            bucket.retain(|id| *id != uuid);
        }
        let pool = self
            .pools
            .get_mut(&key.entity_type)
            .ok_or_else(|| RuntimeError::lookup("entity pool", key.entity_type))?;
        let released = pool
            .get_mut(key.handle)
            .and_then(|entity| entity.on_destroy(visuals));
        pool.push(key.handle)?;
        Ok(Despawned {
            entity_type: key.entity_type,
            released,
        })
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Entity> {
        let key = self.by_uuid.get(&uuid)?;
        self.pools.get(&key.entity_type)?.get(key.handle)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Entity> {
        let key = self.by_uuid.get(&uuid)?;
        self.pools.get_mut(&key.entity_type)?.get_mut(key.handle)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.by_uuid.contains_key(&uuid)
    }

    pub fn type_of(&self, uuid: Uuid) -> Option<EntityType> {
        self.by_uuid.get(&uuid).map(|key| key.entity_type)
    }

    pub fn uuids_of_type(&self, entity_type: EntityType) -> &[Uuid] {
        self.by_type
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_of_type(&self, entity_type: EntityType) -> Option<&Entity> {
        let uuid = *self.uuids_of_type(entity_type).first()?;
        self.get(uuid)
    }

    /// Live entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.by_uuid
            .values()
            .filter_map(|key| self.pools.get(&key.entity_type)?.get(key.handle))
    }

    pub fn uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.by_uuid.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    pub fn pool_stats(&self, entity_type: EntityType) -> PoolStats {
        self.pools
            .get(&entity_type)
            .map(Pool::stats)
            .unwrap_or_default()
    }
}
