//! System trait and the declarative entity filter.

use std::any::Any;
use std::fmt;

use super::component::ComponentKind;
use super::entity::{Entity, EntityType, Uuid};
use super::world::World;

/// Pipeline stage a system processes its entities in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Update,
    LogicUpdate,
    FixedUpdate,
    LateUpdate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Update => "update",
            Stage::LogicUpdate => "logic_update",
            Stage::FixedUpdate => "fixed_update",
            Stage::LateUpdate => "late_update",
        };
        f.write_str(name)
    }
}

/// Which entities a system tracks.
///
/// Evaluated when an entity is registered and when the system is added,
/// never per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityFilter {
    #[default]
    Nothing,
    Matching {
        /// Empty accepts every type.
        types: Vec<EntityType>,
        requires: Vec<ComponentKind>,
    },
}

impl EntityFilter {
    pub fn of_types(types: impl IntoIterator<Item = EntityType>) -> Self {
        EntityFilter::Matching {
            types: types.into_iter().collect(),
            requires: Vec::new(),
        }
    }

    pub fn requiring(kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        EntityFilter::Matching {
            types: Vec::new(),
            requires: kinds.into_iter().collect(),
        }
    }

    pub fn with(self, kind: ComponentKind) -> Self {
        match self {
            EntityFilter::Nothing => EntityFilter::requiring([kind]),
            EntityFilter::Matching {
                types,
                mut requires,
            } => {
                requires.push(kind);
                EntityFilter::Matching { types, requires }
            }
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            EntityFilter::Nothing => false,
            EntityFilter::Matching { types, requires } => {
                (types.is_empty() || types.contains(&entity.entity_type()))
                    && requires.iter().all(|kind| entity.has(*kind))
            }
        }
    }
}

/// A unit of per-stage processing owned by a [`World`].
///
/// Every hook receives the world by `&mut`; while a hook runs, the system
/// itself is detached from the world, so it cannot be looked up through
/// [`World::get_system`] from inside its own hooks.
pub trait System: Any {
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn filter(&self) -> EntityFilter {
        EntityFilter::Nothing
    }

    fn stage(&self) -> Stage {
        Stage::Update
    }

    fn on_add_to_world(&mut self, _world: &mut World) {}

    fn on_remove_from_world(&mut self, _world: &mut World) {}

    /// A newly registered entity passed the filter.
    fn on_add(&mut self, _world: &mut World, _uuid: Uuid) {}

    /// A tracked entity was destroyed. It is already gone from the registry.
    fn on_remove(&mut self, _world: &mut World, _uuid: Uuid) {}

    fn pre_process(&mut self, _world: &mut World, _dt: f32) {}

    fn process(&mut self, _world: &mut World, _uuid: Uuid, _dt: f32) {}

    fn update(&mut self, _world: &mut World, _dt: f32) {}

    fn logic_update(&mut self, _world: &mut World, _dt: f32) {}

    fn fixed_update(&mut self, _world: &mut World, _dt: f32) {}

    fn late_update(&mut self, _world: &mut World, _dt: f32) {}
}
