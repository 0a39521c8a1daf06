//! Component records and the per-entity component set.
//!
//! The set of component types is closed: every record is a variant of
//! [`Component`], and [`ComponentSet`] keeps at most one per [`ComponentKind`]
//! in a dense array indexed by the discriminator.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;
use crate::pool::InstanceHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Vec3);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rotation(pub Quat);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec3);

/// Designer-facing content id of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTag {
    pub conf_id: i32,
}

/// Prefab to show for the entity and the pooled instance currently bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBinding {
    pub prefab_path: String,
    pub instance: Option<InstanceHandle>,
}

impl RenderBinding {
    pub fn new(prefab_path: impl Into<String>) -> Self {
        Self {
            prefab_path: prefab_path.into(),
            instance: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationClip {
    #[default]
    Idle,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationBinding {
    pub clip: AnimationClip,
    pub time: f32,
    pub speed: f32,
}

impl Default for AnimationBinding {
    fn default() -> Self {
        Self {
            clip: AnimationClip::Idle,
            time: 0.0,
            speed: 1.0,
        }
    }
}

/// Which parts of the entity changed since the visual was last synced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncFlags {
    pub position: bool,
    pub rotation: bool,
    pub animation: bool,
}

impl SyncFlags {
    pub fn all() -> Self {
        Self {
            position: true,
            rotation: true,
            animation: true,
        }
    }

    pub fn any(&self) -> bool {
        self.position || self.rotation || self.animation
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterGroup {
    pub group_id: i32,
}

/// Leash and steering state for wandering monsters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderState {
    pub home: Vec3,
    pub radius: f32,
    pub speed: f32,
    pub retarget_in: f32,
}

/// Typed access to one variant of [`Component`].
pub trait ComponentData: Sized {
    const KIND: ComponentKind;

    fn wrap(self) -> Component;
    fn peek(component: &Component) -> Option<&Self>;
    fn peek_mut(component: &mut Component) -> Option<&mut Self>;
}

macro_rules! component_set {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum Component {
            $($variant($ty)),+
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ComponentKind {
            $($variant),+
        }

        impl ComponentKind {
            pub const ALL: &'static [ComponentKind] = &[$(ComponentKind::$variant),+];
            pub const COUNT: usize = Self::ALL.len();

            fn index(self) -> usize {
                self as usize
            }
        }

        impl Component {
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $(Component::$variant(_) => ComponentKind::$variant),+
                }
            }
        }

        $(
            impl ComponentData for $ty {
                const KIND: ComponentKind = ComponentKind::$variant;

                fn wrap(self) -> Component {
                    Component::$variant(self)
                }

                fn peek(component: &Component) -> Option<&Self> {
                    match component {
                        Component::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn peek_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Component {
                fn from(value: $ty) -> Self {
                    Component::$variant(value)
                }
            }
        )+
    };
}

component_set! {
    Position => Position,
    Rotation => Rotation,
    Velocity => Velocity,
    Tag => EntityTag,
    Render => RenderBinding,
    Animation => AnimationBinding,
    Sync => SyncFlags,
    Camera => CameraRig,
    Group => MonsterGroup,
    Wander => WanderState,
}

/// At most one component per discriminator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    slots: [Option<Component>; ComponentKind::COUNT],
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `component`; an existing component of the same kind is kept.
    pub fn insert(&mut self, component: Component) -> Result<(), RuntimeError> {
        let slot = &mut self.slots[component.kind().index()];
        if slot.is_some() {
            return Err(RuntimeError::invalid(format!(
                "component {:?} already attached",
                component.kind()
            )));
        }
        *slot = Some(component);
        Ok(())
    }

    pub fn get<T: ComponentData>(&self) -> Option<&T> {
        self.slots[T::KIND.index()].as_ref().and_then(T::peek)
    }

    pub fn get_mut<T: ComponentData>(&mut self) -> Option<&mut T> {
        self.slots[T::KIND.index()].as_mut().and_then(T::peek_mut)
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn remove(&mut self, kind: ComponentKind) -> Option<Component> {
        self.slots[kind.index()].take()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        ComponentKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.has(*kind))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
