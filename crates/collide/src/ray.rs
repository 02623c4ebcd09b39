//! Ray casting against leaf collision shapes
//!
//! A [`Ray`] is defined by its origin and a second point it passes through;
//! the unit direction and length are derived. Casting supports the sphere
//! (quadratic) and axis-aligned box (slab method) primitives; composite
//! shapes are not castable directly and yield no hit.

use thiserror::Error;

use crate::collider::Shape;
use crate::foundation::math::Vec3;
use crate::geometry::{Aabb, Sphere};

/// Errors from ray queries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaycastError {
    /// The origin and through-point coincide, so no direction exists
    #[error("ray direction is degenerate: origin and through-point coincide")]
    DegenerateDirection,
}

/// A ray through two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// A second point the ray passes through
    pub through: Vec3,
}

impl Ray {
    /// Creates a ray from its origin through a second point
    pub fn new(origin: Vec3, through: Vec3) -> Self {
        Self { origin, through }
    }

    /// Unit direction from the origin toward the through-point
    ///
    /// `None` when the two points coincide.
    pub fn direction(&self) -> Option<Vec3> {
        let dir = self.through - self.origin;
        let norm = dir.norm();
        if norm > 0.0 {
            Some(dir / norm)
        } else {
            None
        }
    }

    /// Distance between the origin and the through-point
    pub fn length(&self) -> f32 {
        (self.through - self.origin).norm()
    }

    /// Rescale the through-point to sit `length` along the direction,
    /// turning the ray into a fixed-length probe
    pub fn set_length(&mut self, length: f32) {
        if let Some(dir) = self.direction() {
            self.through = self.origin + dir * length;
        }
    }

    /// Cast against a shape, returning the chosen intersection point
    ///
    /// The chosen hit distance is the nearest non-negative root; when both
    /// roots are negative the far root is still used, so a shape entirely
    /// behind the origin reports a hit behind the origin. This mirrors the
    /// long-standing behavior downstream code depends on. Composite shapes
    /// yield `Ok(None)`; only leaf shapes are castable.
    pub fn try_cast(&self, shape: &Shape) -> Result<Option<Vec3>, RaycastError> {
        let unit = self.direction().ok_or(RaycastError::DegenerateDirection)?;
        Ok(match shape {
            Shape::Sphere(sphere) => self.cast_sphere(unit, sphere),
            Shape::Aabb(aabb) => self.cast_aabb(unit, aabb),
            Shape::Composite(_) => None,
        })
    }

    /// Quadratic ray-sphere intersection
    fn cast_sphere(&self, unit: Vec3, sphere: &Sphere) -> Option<Vec3> {
        let oc = self.origin - sphere.center;
        let dot_value = unit.dot(&oc);
        let discriminant = dot_value * dot_value - (oc.norm_squared() - sphere.radius * sphere.radius);

        if discriminant < 0.0 {
            None
        } else if discriminant == 0.0 {
            // Tangent hit
            Some(self.origin + unit * -dot_value)
        } else {
            let sqrt = discriminant.sqrt();
            let dmin = -dot_value - sqrt;
            let dmax = -dot_value + sqrt;
            let d = if dmin < 0.0 { dmax } else { dmin };
            Some(self.origin + unit * d)
        }
    }

    /// Slab-method ray-box intersection
    fn cast_aabb(&self, unit: Vec3, aabb: &Aabb) -> Option<Vec3> {
        let min = aabb.min();
        let max = aabb.max();

        // Per-axis entry/exit parametric distances; division by a zero
        // component yields an infinite slab, which the comparisons handle
        let mut t_min = Vec3::new(
            (min.x - self.origin.x) / unit.x,
            (min.y - self.origin.y) / unit.y,
            (min.z - self.origin.z) / unit.z,
        );
        let mut t_max = Vec3::new(
            (max.x - self.origin.x) / unit.x,
            (max.y - self.origin.y) / unit.y,
            (max.z - self.origin.z) / unit.z,
        );

        if t_min.x > t_max.x {
            std::mem::swap(&mut t_min.x, &mut t_max.x);
        }
        if t_min.y > t_max.y {
            std::mem::swap(&mut t_min.y, &mut t_max.y);
        }
        if t_min.z > t_max.z {
            std::mem::swap(&mut t_min.z, &mut t_max.z);
        }

        if t_min.x > t_max.y || t_min.y > t_max.x {
            return None;
        }
        let mut tmin = t_min.x.max(t_min.y);
        let mut tmax = t_max.x.min(t_max.y);

        if tmin > t_max.z || t_min.z > tmax {
            return None;
        }
        tmin = tmin.max(t_min.z);
        tmax = tmax.min(t_max.z);

        let d = if tmin < 0.0 { tmax } else { tmin };
        Some(self.origin + unit * d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x_ray() -> Ray {
        Ray::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0))
    }

    #[test]
    fn test_direction_and_length() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 3.0, 4.0));
        assert_relative_eq!(ray.length(), 5.0);
        let dir = ray.direction().unwrap();
        assert_relative_eq!(dir.y, 0.6);
        assert_relative_eq!(dir.z, 0.8);
    }

    #[test]
    fn test_set_length() {
        let mut ray = Ray::new(Vec3::zeros(), Vec3::new(2.0, 0.0, 0.0));
        ray.set_length(10.0);
        assert_relative_eq!(ray.length(), 10.0);
        assert_relative_eq!(ray.through.x, 10.0);
    }

    #[test]
    fn test_degenerate_ray() {
        let ray = Ray::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(ray.direction().is_none());
        assert_eq!(
            ray.try_cast(&Shape::Sphere(Sphere::new(Vec3::zeros(), 1.0))),
            Err(RaycastError::DegenerateDirection)
        );
    }

    #[test]
    fn test_sphere_hit_front_face() {
        let shape = Shape::Sphere(Sphere::new(Vec3::zeros(), 1.0));
        let hit = x_ray().try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, -1.0);
        assert_relative_eq!(hit.y, 0.0);
        assert_relative_eq!(hit.z, 0.0);
    }

    #[test]
    fn test_sphere_miss() {
        let shape = Shape::Sphere(Sphere::new(Vec3::new(10.0, 3.0, 0.0), 1.0));
        assert_eq!(x_ray().try_cast(&shape).unwrap(), None);

        let offset = Shape::Sphere(Sphere::new(Vec3::new(0.0, 5.0, 0.0), 1.0));
        assert_eq!(x_ray().try_cast(&offset).unwrap(), None);
    }

    #[test]
    fn test_sphere_from_inside_uses_exit() {
        let shape = Shape::Sphere(Sphere::new(Vec3::zeros(), 2.0));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray.try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, 2.0);
    }

    #[test]
    fn test_sphere_behind_origin_returns_far_root() {
        // Sphere entirely behind the ray still reports its near face; this
        // fallback is intentional (see try_cast docs)
        let shape = Shape::Sphere(Sphere::new(Vec3::new(-5.0, 0.0, 0.0), 1.0));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray.try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, -4.0);
    }

    #[test]
    fn test_aabb_entry_face() {
        let shape = Shape::Aabb(Aabb::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0)));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray.try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, 4.0);
        assert_relative_eq!(hit.y, 0.0);
    }

    #[test]
    fn test_aabb_miss() {
        let shape = Shape::Aabb(Aabb::new(Vec3::new(5.0, 5.0, 0.0), Vec3::new(2.0, 2.0, 2.0)));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.try_cast(&shape).unwrap(), None);
    }

    #[test]
    fn test_aabb_from_inside_uses_exit() {
        let shape = Shape::Aabb(Aabb::new(Vec3::zeros(), Vec3::new(4.0, 4.0, 4.0)));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray.try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, 2.0);
    }

    #[test]
    fn test_aabb_diagonal_hit() {
        let shape = Shape::Aabb(Aabb::new(Vec3::new(4.0, 4.0, 4.0), Vec3::new(2.0, 2.0, 2.0)));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let hit = ray.try_cast(&shape).unwrap().unwrap();
        assert_relative_eq!(hit.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(hit.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(hit.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_composite_shape_not_castable() {
        let shape = Shape::Composite(vec![Shape::Sphere(Sphere::new(Vec3::zeros(), 10.0))]);
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-4.0, 0.0, 0.0));
        assert_eq!(ray.try_cast(&shape).unwrap(), None);
    }
}
