//! WorldManager - named worlds ticked in registration order.

use std::collections::HashMap;

use super::system::Stage;
use super::world::{World, WorldBasicData};
use crate::context::Context;
use crate::error::RuntimeError;

/// Populates a freshly created world with its systems.
pub trait WorldBlueprint {
    fn install(self: Box<Self>, world: &mut World);
}

impl<F: FnOnce(&mut World)> WorldBlueprint for F {
    fn install(self: Box<Self>, world: &mut World) {
        (*self)(world)
    }
}

/// A world with no systems.
pub struct EmptyBlueprint;

impl WorldBlueprint for EmptyBlueprint {
    fn install(self: Box<Self>, _world: &mut World) {}
}

/// Changes a world asks its manager for while it is ticking.
pub enum WorldRequest {
    Create {
        basic: WorldBasicData,
        blueprint: Box<dyn WorldBlueprint>,
    },
    Remove(String),
}

pub struct WorldManager {
    ctx: Context,
    worlds: HashMap<String, World>,
    order: Vec<String>,
}

impl WorldManager {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            worlds: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Duplicate names are reported and return `None`.
    pub fn create_world(
        &mut self,
        basic: WorldBasicData,
        blueprint: impl WorldBlueprint + 'static,
    ) -> Option<&mut World> {
        self.create_boxed(basic, Box::new(blueprint))
    }

    fn create_boxed(
        &mut self,
        basic: WorldBasicData,
        blueprint: Box<dyn WorldBlueprint>,
    ) -> Option<&mut World> {
        if self.worlds.contains_key(&basic.name) {
            self.ctx.diagnostics().report(RuntimeError::invalid(format!(
                "world `{}` already exists",
                basic.name
            )));
            return None;
        }
        let name = basic.name.clone();
        let mut world = World::new(basic, self.ctx.clone());
        blueprint.install(&mut world);
        let requests = world.take_requests();
        self.worlds.insert(name.clone(), world);
        self.order.push(name.clone());
        log::info!("created world `{name}`");

        self.apply(requests);
        self.worlds.get_mut(&name)
    }

    pub fn remove_world(&mut self, name: &str) -> bool {
        let Some(mut world) = self.worlds.remove(name) else {
            self.ctx
                .diagnostics()
                .report(RuntimeError::lookup("world", name));
            return false;
        };
        self.order.retain(|n| n != name);
        world.shutdown();
        log::info!("removed world `{name}`");
        true
    }

    pub fn get_world(&self, name: &str) -> Option<&World> {
        self.worlds.get(name)
    }

    pub fn get_world_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.get_mut(name)
    }

    pub fn world_names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Worlds in registration order.
    pub fn worlds(&self) -> impl Iterator<Item = &World> + '_ {
        self.order.iter().filter_map(|name| self.worlds.get(name))
    }

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

    /// Ticks worlds from a snapshot of the names taken up front. Requests a
    /// world queues are applied right after its own tick.
    fn run_stage(&mut self, stage: Stage, dt: f32) {
        let names = self.order.clone();
        for name in &names {
            let Some(world) = self.worlds.get_mut(name) else {
                continue;
            };
            world.run_stage(stage, dt);
            let requests = world.take_requests();
            self.apply(requests);
        }
    }

    fn apply(&mut self, requests: Vec<WorldRequest>) {
        for request in requests {
            match request {
                WorldRequest::Create { basic, blueprint } => {
                    self.create_boxed(basic, blueprint);
                }
                WorldRequest::Remove(name) => {
                    self.remove_world(&name);
                }
            }
        }
    }

    /// Remove every world in registration order.
    pub fn shutdown(&mut self) {
        for name in self.order.clone() {
            self.remove_world(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::system::System;
    use crate::error::ErrorKind;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Logs every update; optionally asks the manager for a world change.
    struct Recorder {
        log: Log,
        request: Option<WorldRequest>,
    }

    impl System for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn update(&mut self, world: &mut World, _dt: f32) {
            self.log.borrow_mut().push(world.name().to_string());
            if let Some(request) = self.request.take() {
                world.request(request);
            }
        }
    }

    fn recording(log: &Log, request: Option<WorldRequest>) -> impl WorldBlueprint + 'static {
        let log = Rc::clone(log);
        move |world: &mut World| {
            world.add_system(Recorder { log, request });
        }
    }

    #[test]
    fn test_worlds_tick_in_registration_order() {
        let log = Log::default();
        let mut manager = WorldManager::new(Context::with_defaults());
        manager.create_world(WorldBasicData::new("zeta"), recording(&log, None));
        manager.create_world(WorldBasicData::new("alpha"), recording(&log, None));

        manager.update(0.016);
        assert_eq!(*log.borrow(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_duplicate_world_is_rejected() {
        let mut manager = WorldManager::new(Context::with_defaults());
        assert!(manager
            .create_world(WorldBasicData::new("battle"), EmptyBlueprint)
            .is_some());
        assert!(manager
            .create_world(WorldBasicData::new("battle"), EmptyBlueprint)
            .is_none());
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.ctx().diagnostics().count(ErrorKind::InvalidArgument), 1);
    }

    #[test]
    fn test_world_created_mid_frame_ticks_next_frame() {
        let log = Log::default();
        let mut manager = WorldManager::new(Context::with_defaults());
        let spawn_lobby = WorldRequest::Create {
            basic: WorldBasicData::new("lobby"),
            blueprint: Box::new(recording(&log, None)),
        };
        manager.create_world(WorldBasicData::new("battle"), recording(&log, Some(spawn_lobby)));

        manager.update(0.0);
        assert_eq!(*log.borrow(), vec!["battle"]);
        assert_eq!(manager.world_names(), &["battle".to_string(), "lobby".to_string()]);

        manager.update(0.0);
        assert_eq!(*log.borrow(), vec!["battle", "battle", "lobby"]);
    }

    #[test]
    fn test_world_removed_mid_frame_is_skipped() {
        let log = Log::default();
        let mut manager = WorldManager::new(Context::with_defaults());
        manager.create_world(
            WorldBasicData::new("first"),
            recording(&log, Some(WorldRequest::Remove("second".into()))),
        );
        manager.create_world(WorldBasicData::new("second"), recording(&log, None));

        manager.update(0.0);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert!(manager.get_world("second").is_none());
    }

    #[test]
    fn test_remove_unknown_world_reports() {
        let mut manager = WorldManager::new(Context::with_defaults());
        assert!(!manager.remove_world("ghost"));
        assert_eq!(manager.ctx().diagnostics().count(ErrorKind::LookupFailure), 1);
    }
}
