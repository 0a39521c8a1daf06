//! Navigation-surface collaborator used to snap spawned entities.

use glam::Vec3;

use crate::level::LevelExport;

pub trait NavSurface {
    /// Nearest navigable point to `position`, or `None` if there is none.
    fn snap(&self, position: Vec3) -> Option<Vec3>;
}

/// A flat rectangle `[0, width] × [0, depth]` at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNavSurface {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
}

impl FlatNavSurface {
    pub fn new(width: f32, depth: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            depth: depth.max(0.0),
            height,
        }
    }

    /// Surface covering the level's `Width × GridSize` by `Height × GridSize`.
    pub fn for_level(level: &LevelExport, height: f32) -> Self {
        let (width, depth) = level.world_size();
        Self::new(width, depth, height)
    }
}

impl NavSurface for FlatNavSurface {
    fn snap(&self, position: Vec3) -> Option<Vec3> {
        if !position.is_finite() {
            return None;
        }
        Some(Vec3::new(
            position.x.clamp(0.0, self.width),
            self.height,
            position.z.clamp(0.0, self.depth),
        ))
    }
}

/// Accepts every position unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNavSurface;

impl NavSurface for NoNavSurface {
    fn snap(&self, position: Vec3) -> Option<Vec3> {
        Some(position)
    }
}
