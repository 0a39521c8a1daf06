//! World - owns the entity registry, the ordered system list and the
//! per-type parent nodes, and runs the stage pipeline.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::component::RenderBinding;
use super::entity::{Entity, EntityType, Uuid};
use super::kinds::EntityKind;
use super::manager::WorldRequest;
use super::registry::EntityRegistry;
use super::system::{EntityFilter, Stage, System};
use crate::context::Context;
use crate::error::{Diagnostics, Reported, RuntimeError};
use crate::pool::{InstanceHandle, PoolStats};

/// Static description a world is created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldBasicData {
    pub name: String,
    pub map_width: i32,
    pub map_height: i32,
    pub grid_size: f32,
}

impl WorldBasicData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map_width: 0,
            map_height: 0,
            grid_size: 1.0,
        }
    }
}

/// Grouping node every visual instance of one entity type is parented under.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentNode {
    pub name: String,
    pub entity_type: EntityType,
    pub children: Vec<InstanceHandle>,
}

/// Identifies one registration of a system. A name removed and registered
/// again gets a new id.
type SystemId = u64;

struct SystemEntry {
    id: SystemId,
    /// `None` while one of the system's hooks is running.
    system: Option<Box<dyn System>>,
    filter: EntityFilter,
    stage: Stage,
    /// Tracked entities in registration-into-system order.
    tracked: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Add(Uuid),
    Remove(Uuid),
}

pub struct World {
    basic: WorldBasicData,
    ctx: Context,
    registry: EntityRegistry,
    parents: BTreeMap<EntityType, ParentNode>,
    systems: HashMap<String, SystemEntry>,
    system_order: Vec<String>,
    next_system_id: SystemId,
    hooks: VecDeque<(String, SystemId, Hook)>,
    flushing: bool,
    requests: Vec<WorldRequest>,
}

impl World {
    pub fn new(basic: WorldBasicData, ctx: Context) -> Self {
        let parents = EntityType::ALL
            .iter()
            .map(|&entity_type| {
                (
                    entity_type,
                    ParentNode {
                        name: entity_type.name().to_string(),
                        entity_type,
                        children: Vec::new(),
                    },
                )
            })
            .collect();
        Self {
            basic,
            ctx,
            registry: EntityRegistry::new(),
            parents,
            systems: HashMap::new(),
            system_order: Vec::new(),
            next_system_id: 0,
            hooks: VecDeque::new(),
            flushing: false,
            requests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.basic.name
    }

    pub fn basic(&self) -> &WorldBasicData {
        &self.basic
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.ctx.diagnostics()
    }

    // ----------------------------------------------------------------------
    // Entities
    // ----------------------------------------------------------------------

    /// Pop an entity of kind `K`, initialise it, bind its visual and register
    /// it with every system whose filter accepts it.
    pub fn create_entity<K: EntityKind>(&mut self, params: K::Params) -> Option<Uuid> {
        let uuid = self.ctx.next_uuid();
        let entity = self.registry.spawn(uuid, K::TYPE);
        if K::init(entity, params).reported(self.ctx.diagnostics()).is_none() {
            let mut pool = self.ctx.pool();
            self.registry
                .despawn(uuid, &mut pool)
                .reported(self.ctx.diagnostics());
            return None;
        }
        self.bind_visual(uuid);
        self.track(uuid);
        log::debug!("[{}] created {} {}", self.basic.name, K::TYPE, uuid);
        self.flush_hooks();
        Some(uuid)
    }

    /// Unknown uuids are reported and leave the world untouched.
    pub fn destroy_entity_by_uuid(&mut self, uuid: Uuid) -> bool {
        let Some(entity_type) = self.registry.type_of(uuid) else {
            self.ctx
                .diagnostics()
                .report(RuntimeError::lookup("entity", uuid));
            return false;
        };
        self.untrack(uuid);
        let bound = self
            .registry
            .get(uuid)
            .and_then(|entity| entity.get::<RenderBinding>())
            .and_then(|binding| binding.instance);
        {
            let mut pool = self.ctx.pool();
            self.registry
                .despawn(uuid, &mut pool)
                .reported(self.ctx.diagnostics());
        }
        // The parent lets go of the handle even if the pool refused it.
        if let (Some(instance), Some(parent)) = (bound, self.parents.get_mut(&entity_type)) {
            parent.children.retain(|child| *child != instance);
        }
        log::debug!("[{}] destroyed {} {}", self.basic.name, entity_type, uuid);
        self.flush_hooks();
        true
    }

    pub fn get_entity_by_uuid(&self, uuid: Uuid) -> Option<&Entity> {
        self.registry.get(uuid)
    }

    pub fn get_entity_by_uuid_mut(&mut self, uuid: Uuid) -> Option<&mut Entity> {
        self.registry.get_mut(uuid)
    }

    /// Like [`World::get_entity_by_uuid`] but only if the entity is of kind `K`.
    pub fn get_entity<K: EntityKind>(&self, uuid: Uuid) -> Option<&Entity> {
        self.registry
            .get(uuid)
            .filter(|entity| entity.entity_type() == K::TYPE)
    }

    pub fn get_first_entity_by_type<K: EntityKind>(&self) -> Option<&Entity> {
        self.registry.first_of_type(K::TYPE)
    }

    pub fn entities_of_type(&self, entity_type: EntityType) -> &[Uuid] {
        self.registry.uuids_of_type(entity_type)
    }

    /// Live entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.registry.iter()
    }

    pub fn contains_entity(&self, uuid: Uuid) -> bool {
        self.registry.contains(uuid)
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn entity_pool_stats(&self, entity_type: EntityType) -> PoolStats {
        self.registry.pool_stats(entity_type)
    }

    pub fn parent_of(&self, entity_type: EntityType) -> Option<&ParentNode> {
        self.parents.get(&entity_type)
    }

    fn bind_visual(&mut self, uuid: Uuid) {
        let Some(entity) = self.registry.get_mut(uuid) else {
            return;
        };
        let entity_type = entity.entity_type();
        let position = entity.position().unwrap_or_default();
        let rotation = entity.rotation().unwrap_or_default();
        let Some(binding) = entity.get_mut::<RenderBinding>() else {
            return;
        };

        let mut pool = self.ctx.pool();
        let mut loaded = None;
        pool.load_prefab_by_path(&binding.prefab_path, |instance| loaded = instance);
        let Some(handle) = loaded else {
            return;
        };
        if let Some(instance) = pool.instance_mut(handle) {
            instance.parent = Some(entity_type);
            instance.owner = Some(uuid);
            instance.position = position;
            instance.rotation = rotation;
        }
        binding.instance = Some(handle);
        if let Some(parent) = self.parents.get_mut(&entity_type) {
            parent.children.push(handle);
        }
    }

    fn track(&mut self, uuid: Uuid) {
        let Some(entity) = self.registry.get(uuid) else {
            return;
        };
        for name in &self.system_order {
            let Some(entry) = self.systems.get_mut(name) else {
                continue;
            };
            if entry.filter.matches(entity) {
                entry.tracked.push(uuid);
                self.hooks.push_back((name.clone(), entry.id, Hook::Add(uuid)));
            }
        }
    }

    fn untrack(&mut self, uuid: Uuid) {
        for name in &self.system_order {
            let Some(entry) = self.systems.get_mut(name) else {
                continue;
            };
            if let Some(index) = entry.tracked.iter().position(|id| *id == uuid) {
                entry.tracked.remove(index);
                self.hooks.push_back((name.clone(), entry.id, Hook::Remove(uuid)));
            }
        }
    }

    // ----------------------------------------------------------------------
    // Systems
    // ----------------------------------------------------------------------

    /// Register `system` under `name`. Existing entities the filter accepts
    /// are tracked before `on_add_to_world` runs.
    pub fn create_system(&mut self, name: impl Into<String>, mut system: Box<dyn System>) -> bool {
        let name = name.into();
        if self.has_system(&name) {
            self.ctx.diagnostics().report(RuntimeError::invalid(format!(
                "system `{name}` already registered in world `{}`",
                self.basic.name
            )));
            return false;
        }

        let id = self.next_system_id;
        self.next_system_id += 1;
        let filter = system.filter();
        let stage = system.stage();
        let tracked: Vec<Uuid> = self
            .registry
            .iter()
            .filter(|entity| filter.matches(entity))
            .map(Entity::uuid)
            .collect();
        for uuid in &tracked {
            self.hooks.push_back((name.clone(), id, Hook::Add(*uuid)));
        }
        self.systems.insert(
            name.clone(),
            SystemEntry {
                id,
                system: None,
                filter,
                stage,
                tracked,
            },
        );
        self.system_order.push(name.clone());
        log::info!("[{}] added system `{}` ({})", self.basic.name, name, stage);

        system.on_add_to_world(self);
        self.put_back(&name, id, system);
        self.flush_hooks();
        true
    }

    /// Register `system` under its own name.
    pub fn add_system<S: System>(&mut self, system: S) -> bool {
        let name = system.name();
        self.create_system(name, Box::new(system))
    }

    /// The name is free again as soon as this returns. A system removed
    /// while one of its hooks runs gets `on_remove_from_world` once that
    /// hook returns.
    pub fn remove_system(&mut self, name: &str) -> bool {
        let Some(entry) = self.systems.remove(name) else {
            self.ctx
                .diagnostics()
                .report(RuntimeError::lookup("system", name));
            return false;
        };
        self.system_order.retain(|n| n != name);
        log::info!("[{}] removed system `{}`", self.basic.name, name);
        if let Some(mut system) = entry.system {
            system.on_remove_from_world(self);
            self.flush_hooks();
        }
        true
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    /// `None` if unknown, of another type, or currently running.
    pub fn get_system<T: System>(&self, name: &str) -> Option<&T> {
        let entry = self.systems.get(name)?;
        entry.system.as_ref()?.as_any().downcast_ref::<T>()
    }

    /// Run `f` with the system detached, so it can mutate the world.
    pub fn with_system<T: System, R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut T, &mut World) -> R,
    ) -> Option<R> {
        let entry = self.systems.get_mut(name)?;
        let id = entry.id;
        let mut system = entry.system.take()?;
        let result = system
            .as_any_mut()
            .downcast_mut::<T>()
            .map(|typed| f(typed, self));
        self.put_back(name, id, system);
        self.flush_hooks();
        result
    }

    pub fn system_names(&self) -> &[String] {
        &self.system_order
    }

    /// Entities tracked by `name`, in tracking order.
    pub fn tracked_by(&self, name: &str) -> Option<&[Uuid]> {
        self.systems
            .get(name)
            .map(|entry| entry.tracked.as_slice())
    }

    /// Hand a detached system back to its entry. If registration `id` was
    /// removed while the system was out, finalise the removal instead.
    fn put_back(&mut self, name: &str, id: SystemId, mut system: Box<dyn System>) {
        match self.systems.get_mut(name) {
            Some(entry) if entry.id == id => entry.system = Some(system),
            _ => system.on_remove_from_world(self),
        }
    }

    /// Deliver queued `on_add`/`on_remove` hooks. Events for a system that is
    /// running stay queued until it is handed back.
    fn flush_hooks(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;
        let mut deferred = VecDeque::new();
        while let Some((name, id, hook)) = self.hooks.pop_front() {
            let Some(entry) = self.systems.get_mut(&name).filter(|entry| entry.id == id) else {
                continue;
            };
            let Some(mut system) = entry.system.take() else {
                deferred.push_back((name, id, hook));
                continue;
            };
            match hook {
                Hook::Add(uuid) => system.on_add(self, uuid),
                Hook::Remove(uuid) => system.on_remove(self, uuid),
            }
            self.put_back(&name, id, system);
        }
        self.hooks = deferred;
        self.flushing = false;
    }

    // ----------------------------------------------------------------------
    // Pipeline
    // ----------------------------------------------------------------------

    pub fn update(&mut self, dt: f32) {
        self.run_stage(Stage::Update, dt);
    }

    pub fn logic_update(&mut self, dt: f32) {
        self.run_stage(Stage::LogicUpdate, dt);
    }

    pub fn fixed_update(&mut self, dt: f32) {
        self.run_stage(Stage::FixedUpdate, dt);
    }

    pub fn late_update(&mut self, dt: f32) {
        self.run_stage(Stage::LateUpdate, dt);
    }

    /// One pass over the system list. The order and every tracked list are
    /// snapshotted up front; systems removed during the pass are skipped,
    /// additions wait for the next pass.
    pub fn run_stage(&mut self, stage: Stage, dt: f32) {
        let order: Vec<(String, SystemId)> = self
            .system_order
            .iter()
            .filter_map(|name| Some((name.clone(), self.systems.get(name)?.id)))
            .collect();
        let mut snapshots: HashMap<SystemId, Vec<Uuid>> = order
            .iter()
            .filter_map(|(name, id)| {
                let entry = self.systems.get(name)?;
                (entry.stage == stage).then(|| (*id, entry.tracked.clone()))
            })
            .collect();

        for (name, id) in &order {
            let Some(entry) = self.systems.get_mut(name).filter(|entry| entry.id == *id) else {
                continue;
            };
            let Some(mut system) = entry.system.take() else {
                continue;
            };

            if let Some(snapshot) = snapshots.remove(id) {
                system.pre_process(self, dt);
                for uuid in snapshot {
                    if self.registry.contains(uuid) {
                        system.process(self, uuid, dt);
                    }
                }
            }
            match stage {
                Stage::Update => system.update(self, dt),
                Stage::LogicUpdate => system.logic_update(self, dt),
                Stage::FixedUpdate => system.fixed_update(self, dt),
                Stage::LateUpdate => system.late_update(self, dt),
            }

            self.put_back(name, *id, system);
            self.flush_hooks();
        }
    }

    // ----------------------------------------------------------------------
    // Requests and teardown
    // ----------------------------------------------------------------------

    /// Queue a request for the owning manager, applied after this world's tick.
    pub fn request(&mut self, request: WorldRequest) {
        self.requests.push(request);
    }

    pub(crate) fn take_requests(&mut self) -> Vec<WorldRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Remove every system in registration order, then destroy the entities
    /// left behind so their visuals return to the shared pool.
    pub fn shutdown(&mut self) {
        for name in self.system_order.clone() {
            self.remove_system(&name);
        }
        let remaining: Vec<Uuid> = self.registry.uuids().collect();
        for uuid in remaining {
            self.destroy_entity_by_uuid(uuid);
        }
        log::info!("[{}] shut down", self.basic.name);
    }
}
