//! # collide
//!
//! Tag-indexed collision detection with ray casting.
//!
//! Colliders (spheres, axis-aligned boxes, and composite aggregates) are
//! registered with a [`CollisionManager`] under a string tag. Each detection
//! pass tests the member pairs of every enabled tag pair — sequentially or
//! fanned out across threads — and notifies both sides of each intersecting
//! pair through their subscribed handlers. Tag pairs can be switched on and
//! off through a symmetric trigger matrix, and the registered population can
//! be queried with rays.
//!
//! ## Quick Start
//!
//! ```rust
//! use collide::prelude::*;
//!
//! let manager = CollisionManager::new();
//!
//! let player = Collider::sphere(Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0), "Player");
//! let enemy = Collider::sphere(Sphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0), "Enemy");
//! player.on_collision(|other| println!("player touched {}", other.tag()));
//!
//! manager.register_all([player, enemy]);
//! manager.update(false);
//!
//! let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-4.0, 0.0, 0.0));
//! let hits = manager.raycast(ray, &RaycastOptions::default()).unwrap();
//! assert_eq!(hits.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collider;
pub mod config;
pub mod foundation;
pub mod geometry;
pub mod manager;
pub mod ray;

pub use collider::{Collider, ColliderError, CollisionHandler, Shape, UserData, DEFAULT_TAG};
pub use config::ManagerConfig;
pub use geometry::{Aabb, Sphere};
pub use manager::{CollisionManager, RayHit, RaycastOptions};
pub use ray::{Ray, RaycastError};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        collider::{Collider, ColliderError, Shape, DEFAULT_TAG},
        config::ManagerConfig,
        foundation::math::Vec3,
        geometry::{Aabb, Sphere},
        manager::{CollisionManager, RayHit, RaycastOptions},
        ray::{Ray, RaycastError},
    };
}
