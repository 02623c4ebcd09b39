//! Math utilities and types
//!
//! Provides the fundamental vector types used by the collision primitives.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Distance between two points
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    (b - a).norm()
}
