//! Process-wide shared state, threaded explicitly into every world.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::ecs::Uuid;
use crate::error::Diagnostics;
use crate::pool::{PoolManager, PrefabCatalog, PrefabSource};
use crate::rng::RngManager;

/// Cheap to clone; every clone shares the same pool, diagnostics and uuid
/// counter. `Rc` keeps it `!Send`.
#[derive(Clone)]
pub struct Context {
    pool: Rc<RefCell<PoolManager>>,
    diagnostics: Rc<Diagnostics>,
    uuids: Rc<Cell<u64>>,
    config: Rc<RuntimeConfig>,
    rng: RngManager,
}

impl Context {
    pub fn new(config: RuntimeConfig, source: Box<dyn PrefabSource>) -> Self {
        let diagnostics = Rc::new(Diagnostics::new());
        Self {
            pool: Rc::new(RefCell::new(PoolManager::new(
                source,
                Rc::clone(&diagnostics),
            ))),
            diagnostics,
            uuids: Rc::new(Cell::new(0)),
            rng: RngManager::new(config.random_seed),
            config: Rc::new(config),
        }
    }

    /// Default configuration with a prefab source that resolves every path.
    pub fn with_defaults() -> Self {
        Self::new(RuntimeConfig::default(), Box::new(PrefabCatalog::permissive()))
    }

    /// Panics if the pool is already borrowed; callers never hold the borrow
    /// across a system hook.
    pub fn pool(&self) -> RefMut<'_, PoolManager> {
        self.pool.borrow_mut()
    }

    pub fn pool_ref(&self) -> Ref<'_, PoolManager> {
        self.pool.borrow()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Next process-unique uuid. Starts at 1 and never repeats.
    pub fn next_uuid(&self) -> Uuid {
        let next = self.uuids.get() + 1;
        self.uuids.set(next);
        Uuid::from_raw(next)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn rng(&self) -> RngManager {
        self.rng
    }
}
