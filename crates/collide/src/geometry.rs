//! Primitive collision shapes and intersection predicates
//!
//! Provides the geometric primitives (spheres, axis-aligned boxes) that the
//! collider variants wrap, along with their pairwise intersection tests and
//! point-containment queries.

use crate::foundation::math::Vec3;

/// A sphere defined by center and radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Creates a sphere from center coordinates and radius
    pub fn from_coords(x: f32, y: f32, z: f32, radius: f32) -> Self {
        Self::new(Vec3::new(x, y, z), radius)
    }

    /// Check if this sphere intersects with another
    pub fn intersects_sphere(&self, other: &Sphere) -> bool {
        let distance_squared = (self.center - other.center).norm_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Check if this sphere intersects an axis-aligned box
    ///
    /// Tests the distance from the sphere center to the closest point on the
    /// box against the radius.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = aabb.closest_point(self.center);
        (closest - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Check if a point lies inside or on the sphere
    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }
}

/// An axis-aligned bounding box defined by center and size
///
/// The box extends half of `size` in each direction from `center`; the
/// min/max corners are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The center position of the box in world space
    pub center: Vec3,
    /// The full extent of the box along each axis
    pub size: Vec3,
}

impl Aabb {
    /// Creates a new box with the given center and full size
    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self { center, size }
    }

    /// Creates a box from center coordinates and per-axis sizes
    pub fn from_coords(x: f32, y: f32, z: f32, sx: f32, sy: f32, sz: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Vec3::new(sx, sy, sz))
    }

    /// Minimum corner of the box
    pub fn min(&self) -> Vec3 {
        self.center - self.size * 0.5
    }

    /// Maximum corner of the box
    pub fn max(&self) -> Vec3 {
        self.center + self.size * 0.5
    }

    /// Check if this box intersects another box
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        let (amin, amax) = (self.min(), self.max());
        let (bmin, bmax) = (other.min(), other.max());
        amin.x <= bmax.x
            && amax.x >= bmin.x
            && amin.y <= bmax.y
            && amax.y >= bmin.y
            && amin.z <= bmax.z
            && amax.z >= bmin.z
    }

    /// Check if this box intersects a sphere
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        sphere.intersects_aabb(self)
    }

    /// Check if a point lies inside or on the box
    pub fn contains_point(&self, point: Vec3) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x
            && point.x <= max.x
            && point.y >= min.y
            && point.y <= max.y
            && point.z >= min.z
            && point.z <= max.z
    }

    /// Closest point on or inside the box to the given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let (min, max) = (self.min(), self.max());
        Vec3::new(
            point.x.clamp(min.x, max.x),
            point.y.clamp(min.y, max.y),
            point.z.clamp(min.z, max.z),
        )
    }
}
