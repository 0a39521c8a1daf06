//! Process-wide pool of visual instances, keyed by prefab path.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::{Quat, Vec3};

use super::{Handle, Pool, PoolStats, Poolable};
use crate::ecs::{AnimationClip, EntityType, Uuid};
use crate::error::{Diagnostics, RuntimeError};

/// Render-side stand-in for an instantiated prefab.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualInstance {
    pub prefab_path: String,
    pub active: bool,
    pub parent: Option<EntityType>,
    /// Non-owning back link to the entity currently driving this instance.
    pub owner: Option<Uuid>,
    pub position: Vec3,
    pub rotation: Quat,
    pub animation: Option<AnimationClip>,
}

impl VisualInstance {
    pub fn new(prefab_path: impl Into<String>) -> Self {
        Self {
            prefab_path: prefab_path.into(),
            active: false,
            parent: None,
            owner: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            animation: None,
        }
    }
}

impl Poolable for VisualInstance {
    fn on_create(&mut self) {
        self.active = true;
    }

    fn on_dispose(&mut self) {
        self.active = false;
        self.parent = None;
        self.owner = None;
        self.position = Vec3::ZERO;
        self.rotation = Quat::IDENTITY;
        self.animation = None;
    }
}

/// Asset-loading collaborator that builds fresh instances.
pub trait PrefabSource {
    /// `None` means the path does not resolve to an asset.
    fn instantiate(&mut self, path: &str) -> Option<VisualInstance>;
}

/// In-memory prefab source. Either accepts every path or only a known set.
#[derive(Debug, Default)]
pub struct PrefabCatalog {
    known: Option<HashSet<String>>,
}

impl PrefabCatalog {
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn with_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(paths.into_iter().map(Into::into).collect()),
        }
    }
}

impl PrefabSource for PrefabCatalog {
    fn instantiate(&mut self, path: &str) -> Option<VisualInstance> {
        if let Some(known) = &self.known {
            if !known.contains(path) {
                return None;
            }
        }
        Some(VisualInstance::new(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle {
    prefab: PrefabId,
    slot: Handle,
}

impl InstanceHandle {
    pub fn prefab(&self) -> PrefabId {
        self.prefab
    }
}

struct PrefabPool {
    path: String,
    pool: Pool<VisualInstance>,
}

/// Shared visual-instance pool. Single-threaded by construction: it lives
/// behind the `Rc<RefCell<_>>` of [`crate::Context`].
pub struct PoolManager {
    source: Box<dyn PrefabSource>,
    ids: HashMap<String, PrefabId>,
    prefabs: Vec<PrefabPool>,
    diagnostics: Rc<Diagnostics>,
}

impl PoolManager {
    pub fn new(source: Box<dyn PrefabSource>, diagnostics: Rc<Diagnostics>) -> Self {
        Self {
            source,
            ids: HashMap::new(),
            prefabs: Vec::new(),
            diagnostics,
        }
    }

    /// Hand out a pooled instance of `path`, instantiating when none is free.
    pub fn pop(&mut self, path: &str) -> Option<InstanceHandle> {
        let prefab = self.intern(path);
        let source = &mut self.source;
        let entry = &mut self.prefabs[prefab.0 as usize];
        match entry.pool.try_pop_with(|| source.instantiate(path)) {
            Some(slot) => Some(InstanceHandle { prefab, slot }),
            None => {
                self.diagnostics.report(RuntimeError::lookup("prefab", path));
                None
            }
        }
    }

    /// Return an instance to the pool of `path`.
    pub fn push(&mut self, path: &str, handle: InstanceHandle) -> bool {
        let Some(&prefab) = self.ids.get(path) else {
            self.diagnostics.report(RuntimeError::lookup("prefab pool", path));
            return false;
        };
        if prefab != handle.prefab {
            self.diagnostics.report(RuntimeError::invalid(format!(
                "instance {handle:?} does not belong to prefab `{path}`"
            )));
            return false;
        }
        match self.prefabs[prefab.0 as usize].pool.push(handle.slot) {
            Ok(()) => true,
            Err(error) => {
                self.diagnostics.report(error);
                false
            }
        }
    }

    /// Callback flavour of [`PoolManager::pop`]; `on_complete` runs exactly once.
    pub fn load_prefab_by_path(
        &mut self,
        path: &str,
        on_complete: impl FnOnce(Option<InstanceHandle>),
    ) {
        on_complete(self.pop(path));
    }

    pub fn release_prefab_instance(&mut self, path: &str, handle: InstanceHandle) -> bool {
        self.push(path, handle)
    }

    pub fn instance(&self, handle: InstanceHandle) -> Option<&VisualInstance> {
        self.prefabs
            .get(handle.prefab.0 as usize)
            .and_then(|entry| entry.pool.get(handle.slot))
    }

    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Option<&mut VisualInstance> {
        self.prefabs
            .get_mut(handle.prefab.0 as usize)
            .and_then(|entry| entry.pool.get_mut(handle.slot))
    }

    pub fn path_of(&self, handle: InstanceHandle) -> Option<&str> {
        self.prefabs
            .get(handle.prefab.0 as usize)
            .map(|entry| entry.path.as_str())
    }

    pub fn stats(&self, path: &str) -> Option<PoolStats> {
        let prefab = self.ids.get(path)?;
        Some(self.prefabs[prefab.0 as usize].pool.stats())
    }

    pub fn live_instances(&self) -> usize {
        self.prefabs.iter().map(|entry| entry.pool.live_count()).sum()
    }

    pub fn free_instances(&self) -> usize {
        self.prefabs.iter().map(|entry| entry.pool.free_count()).sum()
    }

    fn intern(&mut self, path: &str) -> PrefabId {
        if let Some(&id) = self.ids.get(path) {
            return id;
        }
        let id = PrefabId(self.prefabs.len() as u32);
        self.prefabs.push(PrefabPool {
            path: path.to_string(),
            pool: Pool::new(),
        });
        self.ids.insert(path.to_string(), id);
        id
    }
}
