//! Spatial model - uniform grid over the XZ ground plane

use std::collections::{BTreeMap, BTreeSet};

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;
use crate::math::ViewRect;

/// Multiplier applied to the Z cell coordinate in [`grid_uid`].
///
/// Ids collide once `|x| >= GRID_UID_STRIDE`; no map extent is assumed.
pub const GRID_UID_STRIDE: i32 = 10_000;

/// Integer cell coordinates on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn uid(self) -> Result<i32, RuntimeError> {
        grid_uid(self.x, self.z)
    }
}

fn axis_cell(coordinate: f32, cell_size: f32) -> i32 {
    if coordinate >= 0.0 {
        (coordinate / cell_size).floor() as i32
    } else {
        -((-coordinate / cell_size).ceil() as i32)
    }
}

/// Cell containing `position`. `cell_size` must be positive.
pub fn grid_xz(position: Vec3, cell_size: f32) -> GridCoord {
    GridCoord {
        x: axis_cell(position.x, cell_size),
        z: axis_cell(position.z, cell_size),
    }
}

/// `x + z * GRID_UID_STRIDE`; overflow of `i32` is a precondition violation.
pub fn grid_uid(x: i32, z: i32) -> Result<i32, RuntimeError> {
    z.checked_mul(GRID_UID_STRIDE)
        .and_then(|zz| zz.checked_add(x))
        .ok_or_else(|| RuntimeError::precondition(format!("grid cell ({x}, {z}) overflows uid")))
}

/// Oriented box of a static collider, projected onto the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderFootprint {
    pub center: Vec3,
    /// Full width along local X and depth along local Z.
    pub size: Vec2,
    pub yaw_degrees: f32,
}

impl ColliderFootprint {
    pub fn corners(&self) -> [Vec3; 4] {
        let half = self.size.abs() * 0.5;
        let rotation = Quat::from_rotation_y(self.yaw_degrees.to_radians());
        [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(sx, sz)| {
            self.center + rotation * Vec3::new(sx * half.x, 0.0, sz * half.y)
        })
    }
}

/// Every cell id covered by the footprint's enclosing cell range, sorted and
/// without duplicates.
pub fn collider_grid_uids(
    footprint: &ColliderFootprint,
    cell_size: f32,
) -> Result<Vec<i32>, RuntimeError> {
    check_cell_size(cell_size)?;
    let cells = footprint.corners().map(|corner| grid_xz(corner, cell_size));
    let min_x = cells.iter().map(|c| c.x).min().unwrap_or_default();
    let max_x = cells.iter().map(|c| c.x).max().unwrap_or_default();
    let min_z = cells.iter().map(|c| c.z).min().unwrap_or_default();
    let max_z = cells.iter().map(|c| c.z).max().unwrap_or_default();

    let mut uids = BTreeSet::new();
    for z in min_z..=max_z {
        for x in min_x..=max_x {
            uids.insert(grid_uid(x, z)?);
        }
    }
    Ok(uids.into_iter().collect())
}

fn check_cell_size(cell_size: f32) -> Result<(), RuntimeError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(RuntimeError::invalid(format!(
            "grid cell size must be positive, got {cell_size}"
        )))
    }
}

/// Broad-phase index of keys by the cell their position falls in.
#[derive(Debug, Clone)]
pub struct GridBuckets<K> {
    cell_size: f32,
    buckets: BTreeMap<GridCoord, Vec<K>>,
}

impl<K: Copy + Ord> GridBuckets<K> {
    pub fn new(cell_size: f32) -> Result<Self, RuntimeError> {
        check_cell_size(cell_size)?;
        Ok(Self {
            cell_size,
            buckets: BTreeMap::new(),
        })
    }

    pub fn insert(&mut self, position: Vec3, key: K) {
        self.buckets
            .entry(grid_xz(position, self.cell_size))
            .or_default()
            .push(key);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Keys in every cell overlapping `rect`, sorted. A superset of the keys
    /// whose position lies inside the rectangle.
    pub fn candidates(&self, rect: &ViewRect) -> Vec<K> {
        let min = rect.min();
        let max = rect.max();
        let lo = grid_xz(Vec3::new(min.x, 0.0, min.y), self.cell_size);
        let hi = grid_xz(Vec3::new(max.x, 0.0, max.y), self.cell_size);

        let mut keys: Vec<K> = self
            .buckets
            .range(GridCoord::new(lo.x, i32::MIN)..=GridCoord::new(hi.x, i32::MAX))
            .filter(|(coord, _)| (lo.z..=hi.z).contains(&coord.z))
            .flat_map(|(_, keys)| keys.iter().copied())
            .collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_xz_floors_both_signs() {
        assert_eq!(grid_xz(Vec3::new(0.5, 0.0, 1.5), 1.0), GridCoord::new(0, 1));
        assert_eq!(grid_xz(Vec3::new(-0.5, 0.0, -1.0), 1.0), GridCoord::new(-1, -1));
        assert_eq!(grid_xz(Vec3::new(-2.5, 0.0, 7.9), 2.0), GridCoord::new(-2, 3));
    }

    #[test]
    fn test_grid_xz_is_stable() {
        let p = Vec3::new(13.37, 2.0, -4.2);
        assert_eq!(grid_xz(p, 0.75), grid_xz(p, 0.75));
    }

    #[test]
    fn test_cells_one_size_apart_differ() {
        let cell = 2.0;
        for x in [-7.3f32, -2.0, -0.1, 0.0, 0.9, 3.99] {
            let a = grid_xz(Vec3::new(x, 0.0, 0.0), cell);
            let b = grid_xz(Vec3::new(x + cell, 0.0, 0.0), cell);
            assert_ne!(a.uid().unwrap(), b.uid().unwrap());

            let c = grid_xz(Vec3::new(0.0, 0.0, x + cell), cell);
            let d = grid_xz(Vec3::new(0.0, 0.0, x), cell);
            assert_ne!(c.uid().unwrap(), d.uid().unwrap());
        }
    }

    #[test]
    fn test_uid_collides_at_stride_boundary() {
        // Known limitation of the encoding.
        assert_eq!(grid_uid(GRID_UID_STRIDE, 0).unwrap(), grid_uid(0, 1).unwrap());
        assert_eq!(grid_uid(3, -2).unwrap(), -19_997);
    }

    #[test]
    fn test_uid_overflow_is_reported() {
        let err = grid_uid(0, i32::MAX).unwrap_err();
        assert!(matches!(err, RuntimeError::PreconditionViolation(_)));
    }

    #[test]
    fn test_axis_aligned_collider_cells() {
        let footprint = ColliderFootprint {
            center: Vec3::new(1.0, 0.0, 1.0),
            size: Vec2::new(2.0, 2.0),
            yaw_degrees: 0.0,
        };
        let uids = collider_grid_uids(&footprint, 1.0).unwrap();
        let cells = [
            (0, 0),
            (1, 0),
            (2, 0),
            (0, 1),
            (1, 1),
            (2, 1),
            (0, 2),
            (1, 2),
            (2, 2),
        ];
        let expected: Vec<i32> = cells
            .iter()
            .map(|&(x, z)| grid_uid(x, z).unwrap())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        assert_eq!(uids, expected);
    }

    #[test]
    fn test_rotated_collider_grows_range() {
        let square = ColliderFootprint {
            center: Vec3::new(0.5, 0.0, 0.5),
            size: Vec2::new(0.8, 0.8),
            yaw_degrees: 0.0,
        };
        assert_eq!(collider_grid_uids(&square, 1.0).unwrap(), vec![0]);

        let rotated = ColliderFootprint {
            size: Vec2::new(2.0, 0.2),
            yaw_degrees: 45.0,
            ..square
        };
        let uids = collider_grid_uids(&rotated, 1.0).unwrap();
        assert!(uids.len() > 1);
        assert!(uids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bad_cell_size_is_rejected() {
        let footprint = ColliderFootprint {
            center: Vec3::ZERO,
            size: Vec2::ONE,
            yaw_degrees: 0.0,
        };
        assert!(collider_grid_uids(&footprint, 0.0).is_err());
        assert!(GridBuckets::<u32>::new(-1.0).is_err());
    }

    #[test]
    fn test_bucket_candidates_cover_rect() {
        let mut buckets = GridBuckets::new(4.0).unwrap();
        buckets.insert(Vec3::new(4.0, 0.0, 4.0), 1u32);
        buckets.insert(Vec3::new(20.0, 0.0, 20.0), 2);
        buckets.insert(Vec3::new(-10.0, 0.0, 10.0), 3);

        let rect = ViewRect::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert_eq!(buckets.candidates(&rect), vec![1, 3]);

        let moved = ViewRect::new(Vec2::new(20.0, 20.0), Vec2::new(10.0, 10.0));
        assert_eq!(buckets.candidates(&moved), vec![2]);
    }
}
