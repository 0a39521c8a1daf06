//! Geometry helpers on top of `glam`: rays, the ground plane and the
//! ground-projected view rectangle.

pub use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Rotation from euler angles in degrees, applied Z then X then Y.
pub fn euler_degrees_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Projects a world position onto the XZ ground axes.
pub fn ground_xz(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundPlane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl GroundPlane {
    /// Below this |dot(direction, normal)| a ray counts as parallel.
    pub const PARALLEL_EPSILON: f32 = 1e-6;

    pub fn horizontal(height: f32) -> Self {
        Self {
            point: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
        }
    }

    /// Intersection in front of the ray origin, if any.
    pub fn raycast(&self, ray: &Ray) -> Option<Vec3> {
        let normal = self.normal.normalize_or_zero();
        let denom = ray.direction.dot(normal);
        if denom.abs() < Self::PARALLEL_EPSILON {
            return None;
        }
        let t = (self.point - ray.origin).dot(normal) / denom;
        if t < 0.0 {
            return None;
        }
        Some(ray.at(t))
    }
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self::horizontal(0.0)
    }
}

/// Perspective camera intrinsics plus pose, enough to cast viewport rays.
///
/// The camera looks along its local +Z with +Y up; viewport coordinates run
/// from (0, 0) bottom-left to (1, 1) top-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov_y_degrees: f32,
    pub aspect: f32,
}

impl CameraView {
    pub fn viewport_ray(&self, u: f32, v: f32) -> Ray {
        let half_height = (self.fov_y_degrees.to_radians() * 0.5).tan();
        let half_width = half_height * self.aspect;
        let local = Vec3::new(
            (2.0 * u - 1.0) * half_width,
            (2.0 * v - 1.0) * half_height,
            1.0,
        );
        Ray::new(self.position, self.rotation * local)
    }

    /// Casts the four corner rays and the center ray onto `plane`.
    pub fn ground_quad(&self, plane: &GroundPlane) -> GroundQuad {
        const CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let mut corners = [None; 4];
        for (slot, (u, v)) in corners.iter_mut().zip(CORNERS) {
            *slot = plane.raycast(&self.viewport_ray(u, v));
        }
        GroundQuad {
            corners,
            center: plane.raycast(&self.viewport_ray(0.5, 0.5)),
        }
    }
}

/// Ground hits of the viewport corners (bottom-left, bottom-right, top-right,
/// top-left) and of the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundQuad {
    pub corners: [Option<Vec3>; 4],
    pub center: Option<Vec3>,
}

impl GroundQuad {
    pub fn missing_corners(&self) -> usize {
        self.corners.iter().filter(|c| c.is_none()).count()
    }

    /// Bounding rectangle of the corner hits, falling back to the center hit
    /// when no corner reached the plane.
    pub fn bounding_rect(&self) -> Option<ViewRect> {
        let hits: Vec<Vec3> = self.corners.iter().flatten().copied().collect();
        if hits.is_empty() {
            return self.center.and_then(|c| ViewRect::from_points([c]));
        }
        ViewRect::from_points(hits)
    }
}

/// Axis-aligned rectangle on the ground (X, Z).
///
/// Containment is closed on every edge; entry and exit checks share
/// [`ViewRect::contains`] so a point on the boundary never oscillates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRect {
    pub center: Vec2,
    pub extents: Vec2,
}

impl ViewRect {
    pub fn new(center: Vec2, extents: Vec2) -> Self {
        Self {
            center,
            extents: extents.abs(),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter().map(ground_xz);
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new((min + max) * 0.5, (max - min) * 0.5))
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.extents
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.extents.x && offset.y <= self.extents.y
    }

    pub fn contains_world(&self, position: Vec3) -> bool {
        self.contains(ground_xz(position))
    }
}
