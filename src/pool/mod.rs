//! Reusable-instance pools
//!
//! A [`Pool`] is an arena of slots addressed by generational [`Handle`]s.
//! Returning a slot bumps its generation, so a handle kept past `push` never
//! resolves again and cannot be pushed twice.

mod prefab;

pub use prefab::{
    InstanceHandle, PoolManager, PrefabCatalog, PrefabId, PrefabSource, VisualInstance,
};

use crate::error::RuntimeError;

/// Lifecycle hooks for pooled values.
pub trait Poolable {
    /// Called every time the slot is handed out, fresh or reused.
    fn on_create(&mut self) {}

    /// Called when the slot goes back to the pool. Must reset every field
    /// that a later `pop` could observe.
    fn on_dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Growth and reuse counters; pools never cap their size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocated: u64,
    pub reused: u64,
    pub released: u64,
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    stats: PoolStats,
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    pub fn pop(&mut self) -> Handle
    where
        T: Default,
    {
        self.pop_with(T::default).0
    }

    /// Reuse the most recently freed slot, or allocate one from `fresh`.
    pub fn pop_with(&mut self, fresh: impl FnOnce() -> T) -> (Handle, &mut T) {
        let handle = match self.reuse() {
            Some(handle) => handle,
            None => self.allocate(fresh()),
        };
        let slot = &mut self.slots[handle.index as usize];
        (handle, &mut slot.value)
    }

    /// Like [`Pool::pop_with`] but fresh allocation may fail.
    pub fn try_pop_with(&mut self, fresh: impl FnOnce() -> Option<T>) -> Option<Handle> {
        if let Some(handle) = self.reuse() {
            return Some(handle);
        }
        fresh().map(|value| self.allocate(value))
    }

    pub fn push(&mut self, handle: Handle) -> Result<(), RuntimeError> {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return Err(RuntimeError::invalid(format!(
                "handle {handle:?} does not belong to this pool"
            )));
        };
        if !slot.live || slot.generation != handle.generation {
            return Err(RuntimeError::invalid(format!(
                "handle {handle:?} was already returned to the pool"
            )));
        }
        slot.value.on_dispose();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.stats.released += 1;
        Ok(())
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn reuse(&mut self) -> Option<Handle> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.live = true;
        slot.value.on_create();
        self.stats.reused += 1;
        Some(Handle {
            index,
            generation: slot.generation,
        })
    }

    fn allocate(&mut self, mut value: T) -> Handle {
        value.on_create();
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            value,
            generation: 0,
            live: true,
        });
        self.stats.allocated += 1;
        log::trace!("pool grew to {} slots", self.slots.len());
        Handle {
            index,
            generation: 0,
        }
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Bullet {
        damage: u32,
        active: bool,
    }

    impl Poolable for Bullet {
        fn on_create(&mut self) {
            self.active = true;
        }

        fn on_dispose(&mut self) {
            self.damage = 0;
            self.active = false;
        }
    }

    #[test]
    fn test_push_then_pop_reuses_slot() {
        let mut pool = Pool::<Bullet>::new();
        let x = pool.pop();
        pool.get_mut(x).unwrap().damage = 12;

        pool.push(x).unwrap();
        let y = pool.pop();

        assert_eq!(y.index(), x.index());
        assert_ne!(y.generation(), x.generation());
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_reused_slot_is_reset() {
        let mut pool = Pool::<Bullet>::new();
        let x = pool.pop();
        pool.get_mut(x).unwrap().damage = 40;
        pool.push(x).unwrap();

        let y = pool.pop();
        let bullet = pool.get(y).unwrap();
        assert_eq!(bullet.damage, 0);
        assert!(bullet.active);
    }

    #[test]
    fn test_double_push_is_rejected() {
        let mut pool = Pool::<Bullet>::new();
        let x = pool.pop();
        pool.push(x).unwrap();

        let err = pool.push(x).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidArgument(_)));
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn test_stale_handle_never_resolves() {
        let mut pool = Pool::<Bullet>::new();
        let x = pool.pop();
        pool.push(x).unwrap();
        let y = pool.pop();

        assert!(pool.get(x).is_none());
        assert!(pool.is_live(y));
        // The reissued slot cannot be freed through the old handle.
        assert!(pool.push(x).is_err());
        assert!(pool.is_live(y));
    }

    #[test]
    fn test_no_double_issue() {
        let mut pool = Pool::<Bullet>::new();
        let a = pool.pop();
        let b = pool.pop();
        pool.push(a).unwrap();
        let c = pool.pop();
        let d = pool.pop();

        assert_eq!(c.index(), a.index());
        assert_ne!(d.index(), b.index());
        assert_ne!(d.index(), c.index());
        assert_eq!(pool.live_count(), 3);
    }

    #[test]
    fn test_try_pop_with_reports_failed_allocation() {
        let mut pool = Pool::<Bullet>::new();
        assert!(pool.try_pop_with(|| None).is_none());
        assert_eq!(pool.capacity(), 0);

        let handle = pool
            .try_pop_with(|| Some(Bullet { damage: 3, active: false }))
            .unwrap();
        assert_eq!(pool.get(handle).unwrap().damage, 3);
    }
}
