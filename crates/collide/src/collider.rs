//! Collision entities
//!
//! A [`Collider`] is a tagged geometric body: a sphere, an axis-aligned box,
//! or a composite aggregate of child colliders. Colliders are shared handles
//! (`Arc<Collider>`) so the same body can be held by the caller, bucketed by
//! a [`CollisionManager`], and owned by a composite at the same time. The
//! back-reference to the manager is a [`Weak`] handle, so a collider never
//! keeps its manager alive.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::geometry::{Aabb, Sphere};
use crate::manager::CollisionManager;

/// Tag assigned to colliders that were not given one explicitly
pub const DEFAULT_TAG: &str = "Default";

/// Callback invoked with the other collider of an intersecting pair
pub type CollisionHandler = dyn Fn(&Arc<Collider>) + Send + Sync;

/// Opaque caller-owned payload attached to a collider
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Errors from shape-specific collider operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColliderError {
    /// The operation is only valid on a composite collider
    #[error("operation requires a composite collider")]
    NotComposite,
    /// The operation is only valid on a sphere collider
    #[error("operation requires a sphere collider")]
    NotSphere,
}

/// Owned snapshot of a collider's geometry
///
/// Leaf variants carry the primitive; a composite carries the ordered
/// snapshots of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A sphere primitive
    Sphere(Sphere),
    /// An axis-aligned box primitive
    Aabb(Aabb),
    /// The ordered shapes of a composite's children
    Composite(Vec<Shape>),
}

impl Shape {
    /// Narrow-phase intersection test between two shapes
    ///
    /// A composite tests true iff any of its children tests true against the
    /// other side. When only the right side is a composite, the test is
    /// delegated to that composite's own child scan (the composite side
    /// always runs the scan; this ordering is part of the observable
    /// behavior and is kept deliberately).
    pub fn intersects(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Composite(children), _) => children.iter().any(|c| c.intersects(other)),
            (_, Shape::Composite(children)) => children.iter().any(|c| c.intersects(self)),
            (Shape::Sphere(a), Shape::Sphere(b)) => a.intersects_sphere(b),
            (Shape::Sphere(a), Shape::Aabb(b)) => a.intersects_aabb(b),
            (Shape::Aabb(a), Shape::Sphere(b)) => a.intersects_sphere(b),
            (Shape::Aabb(a), Shape::Aabb(b)) => a.intersects_aabb(b),
        }
    }

    /// Check if a point lies inside the shape (any child, for composites)
    pub fn contains(&self, point: Vec3) -> bool {
        match self {
            Shape::Sphere(s) => s.contains_point(point),
            Shape::Aabb(b) => b.contains_point(point),
            Shape::Composite(children) => children.iter().any(|c| c.contains(point)),
        }
    }

    /// Position of the shape: primitive center, or the arithmetic mean of
    /// children positions for a composite (zero when empty)
    pub fn position(&self) -> Vec3 {
        match self {
            Shape::Sphere(s) => s.center,
            Shape::Aabb(b) => b.center,
            Shape::Composite(children) => {
                if children.is_empty() {
                    return Vec3::zeros();
                }
                let sum: Vec3 = children.iter().map(Shape::position).sum();
                sum / children.len() as f32
            }
        }
    }
}

/// Internal shape storage; composites own their children exclusively
enum ColliderShape {
    Sphere(Sphere),
    Aabb(Aabb),
    Composite(Vec<Arc<Collider>>),
}

/// A tagged, shape-polymorphic collision body
///
/// Constructed independently of any manager; registration happens through
/// [`CollisionManager::register`] or [`Collider::set_manager`]. Interior
/// mutability lets the same handle be moved, re-tagged, and subscribed to
/// from multiple threads.
pub struct Collider {
    shape: RwLock<ColliderShape>,
    tag: RwLock<String>,
    active: AtomicBool,
    handlers: RwLock<Vec<Arc<CollisionHandler>>>,
    user_data: RwLock<Option<UserData>>,
    manager: RwLock<Weak<CollisionManager>>,
}

impl Collider {
    fn with_shape(shape: ColliderShape, tag: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            shape: RwLock::new(shape),
            tag: RwLock::new(tag.into()),
            active: AtomicBool::new(true),
            handlers: RwLock::new(Vec::new()),
            user_data: RwLock::new(None),
            manager: RwLock::new(Weak::new()),
        })
    }

    /// Creates a sphere collider with the given tag
    pub fn sphere(sphere: Sphere, tag: impl Into<String>) -> Arc<Self> {
        Self::with_shape(ColliderShape::Sphere(sphere), tag)
    }

    /// Creates an axis-aligned box collider with the given tag
    pub fn aabb(aabb: Aabb, tag: impl Into<String>) -> Arc<Self> {
        Self::with_shape(ColliderShape::Aabb(aabb), tag)
    }

    /// Creates a composite collider owning the given children
    ///
    /// Adding children to a composite does not register them with any
    /// manager; only the composite itself can be registered.
    pub fn composite(children: Vec<Arc<Collider>>, tag: impl Into<String>) -> Arc<Self> {
        Self::with_shape(ColliderShape::Composite(children), tag)
    }

    /// Creates a sphere collider with a payload already attached
    pub fn sphere_with_data(sphere: Sphere, tag: impl Into<String>, data: UserData) -> Arc<Self> {
        let collider = Self::sphere(sphere, tag);
        collider.set_user_data(Some(data));
        collider
    }

    /// Creates an axis-aligned box collider with a payload already attached
    pub fn aabb_with_data(aabb: Aabb, tag: impl Into<String>, data: UserData) -> Arc<Self> {
        let collider = Self::aabb(aabb, tag);
        collider.set_user_data(Some(data));
        collider
    }

    /// Narrow-phase test against another collider
    ///
    /// Variants delegate to the geometry predicates; composites test true
    /// iff any child does (see [`Shape::intersects`] for the composite
    /// delegation order).
    pub fn is_colliding(&self, other: &Collider) -> bool {
        self.shape().intersects(&other.shape())
    }

    /// Check if a point lies inside this collider's bounds
    pub fn in_bound(&self, point: Vec3) -> bool {
        self.shape().contains(point)
    }

    /// Owned snapshot of this collider's geometry
    pub fn shape(&self) -> Shape {
        match &*self.shape.read().unwrap() {
            ColliderShape::Sphere(s) => Shape::Sphere(*s),
            ColliderShape::Aabb(b) => Shape::Aabb(*b),
            ColliderShape::Composite(children) => {
                Shape::Composite(children.iter().map(|c| c.shape()).collect())
            }
        }
    }

    /// Position of the collider (primitive center; composite centroid)
    pub fn position(&self) -> Vec3 {
        self.shape().position()
    }

    /// Relocate the collider
    ///
    /// Leaf shapes consume the first point and ignore the rest; an empty
    /// slice is a no-op. A composite applies `points[i]` to `child[i]`
    /// positionally, silently truncating whichever side is longer.
    pub fn set_position(&self, points: &[Vec3]) {
        let children = {
            let mut shape = self.shape.write().unwrap();
            match &mut *shape {
                ColliderShape::Sphere(s) => {
                    if let Some(p) = points.first() {
                        s.center = *p;
                    }
                    return;
                }
                ColliderShape::Aabb(b) => {
                    if let Some(p) = points.first() {
                        b.center = *p;
                    }
                    return;
                }
                ColliderShape::Composite(children) => children.clone(),
            }
        };
        for (child, point) in children.iter().zip(points.iter()) {
            child.set_position(std::slice::from_ref(point));
        }
    }

    /// Resize a sphere collider
    pub fn set_radius(&self, radius: f32) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Sphere(s) => {
                s.radius = radius;
                Ok(())
            }
            _ => Err(ColliderError::NotSphere),
        }
    }

    /// Resize every sphere child of a composite; other children are left as is
    pub fn set_all_radii(&self, radius: f32) -> Result<(), ColliderError> {
        let children = match &*self.shape.read().unwrap() {
            ColliderShape::Composite(children) => children.clone(),
            _ => return Err(ColliderError::NotComposite),
        };
        for child in &children {
            let _ = child.set_radius(radius);
        }
        Ok(())
    }

    /// Current classification tag
    pub fn tag(&self) -> String {
        self.tag.read().unwrap().clone()
    }

    /// Change the classification tag
    ///
    /// While registered, the collider transitions buckets through its
    /// manager (unregister under the old tag, register under the new one);
    /// unregistered colliders just take the new tag.
    pub fn set_tag(self: &Arc<Self>, tag: impl Into<String>) {
        let tag = tag.into();
        if let Some(manager) = self.manager() {
            manager.unregister(Arc::clone(self));
            *self.tag.write().unwrap() = tag;
            manager.register(Arc::clone(self));
        } else {
            *self.tag.write().unwrap() = tag;
        }
    }

    /// Whether the collider participates in detection passes
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Enable or disable detection for this collider
    ///
    /// Inactive colliders stay registered but are skipped during
    /// narrow-phase testing.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// The manager this collider is bound to, if it is still alive
    pub fn manager(&self) -> Option<Arc<CollisionManager>> {
        self.manager.read().unwrap().upgrade()
    }

    /// Move the collider to a different manager (or detach it entirely)
    ///
    /// A no-op when the target is the collider's current manager; otherwise
    /// the collider is unregistered from the old manager before being
    /// registered with the new one.
    pub fn set_manager(self: &Arc<Self>, manager: Option<&Arc<CollisionManager>>) {
        let current = self.manager();
        match (&current, manager) {
            (Some(cur), Some(new)) if Arc::ptr_eq(cur, new) => return,
            (None, None) => return,
            _ => {}
        }
        if let Some(old) = current {
            old.unregister(Arc::clone(self));
        }
        match manager {
            Some(new) => {
                self.bind(&Arc::downgrade(new));
                new.register(Arc::clone(self));
            }
            None => self.bind(&Weak::new()),
        }
    }

    pub(crate) fn bind(&self, manager: &Weak<CollisionManager>) {
        *self.manager.write().unwrap() = manager.clone();
    }

    /// Subscribe a collision handler, invoked with the other collider of an
    /// intersecting pair
    ///
    /// Handlers run in registration order. A handler may be invoked
    /// concurrently from different detection units within one pass when the
    /// collider's tag participates in several enabled tag pairs.
    pub fn on_collision<F>(&self, handler: F)
    where
        F: Fn(&Arc<Collider>) + Send + Sync + 'static,
    {
        self.handlers.write().unwrap().push(Arc::new(handler));
    }

    /// Remove all subscribed handlers
    pub fn clear_handlers(&self) {
        self.handlers.write().unwrap().clear();
    }

    /// Invoke every handler with `other`, isolating panics per handler
    ///
    /// The handler list is snapshotted first, so a handler may subscribe
    /// further handlers or mutate the collider without deadlocking.
    pub(crate) fn notify(&self, other: &Arc<Collider>) {
        let handlers: Vec<Arc<CollisionHandler>> = self.handlers.read().unwrap().clone();
        for handler in handlers {
            // A panicking handler must not abort the remaining handlers or
            // the rest of the pass; the surrounding application is
            // responsible for observing its own failures.
            let _ = catch_unwind(AssertUnwindSafe(|| handler(other)));
        }
    }

    /// Caller-owned payload attached to this collider
    pub fn user_data(&self) -> Option<UserData> {
        self.user_data.read().unwrap().clone()
    }

    /// Attach or clear the caller-owned payload
    pub fn set_user_data(&self, data: Option<UserData>) {
        *self.user_data.write().unwrap() = data;
    }

    // Composite child management. Children are owned exclusively by the
    // composite: a removed child that no other handle refers to is dropped.

    /// Append a child to a composite
    pub fn add_child(&self, child: Arc<Collider>) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                children.push(child);
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Append several children to a composite
    pub fn add_children<I>(&self, new_children: I) -> Result<(), ColliderError>
    where
        I: IntoIterator<Item = Arc<Collider>>,
    {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                children.extend(new_children);
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Remove the first child identical to `child`
    pub fn remove_child(&self, child: &Arc<Collider>) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                if let Some(pos) = children.iter().position(|c| Arc::ptr_eq(c, child)) {
                    children.remove(pos);
                }
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Remove every listed child from a composite
    pub fn remove_children(&self, removed: &[Arc<Collider>]) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                children.retain(|c| !removed.iter().any(|r| Arc::ptr_eq(c, r)));
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Remove a range of children, clamped to the valid index range
    pub fn remove_child_range(&self, index: usize, count: usize) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                let start = index.min(children.len());
                let end = index.saturating_add(count).min(children.len());
                children.drain(start..end);
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Remove all children from a composite
    pub fn clear_children(&self) -> Result<(), ColliderError> {
        match &mut *self.shape.write().unwrap() {
            ColliderShape::Composite(children) => {
                children.clear();
                Ok(())
            }
            _ => Err(ColliderError::NotComposite),
        }
    }

    /// Children of a composite, in order (empty for leaf shapes)
    pub fn children(&self) -> Vec<Arc<Collider>> {
        match &*self.shape.read().unwrap() {
            ColliderShape::Composite(children) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// A range of a composite's children
    ///
    /// An in-range request returns `children[index..index + count]`; a
    /// request past the end falls back to the front of the list, capped at
    /// the child count. Never errors on bad indices.
    pub fn children_range(&self, index: usize, count: usize) -> Vec<Arc<Collider>> {
        match &*self.shape.read().unwrap() {
            ColliderShape::Composite(children) => {
                if index.saturating_add(count) <= children.len() {
                    children[index..index + count].to_vec()
                } else {
                    children[..count.min(children.len())].to_vec()
                }
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collider")
            .field("tag", &self.tag())
            .field("active", &self.is_active())
            .field("shape", &self.shape())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sphere_at(x: f32, radius: f32) -> Arc<Collider> {
        Collider::sphere(Sphere::new(Vec3::new(x, 0.0, 0.0), radius), DEFAULT_TAG)
    }

    #[test]
    fn test_leaf_narrow_phase() {
        let a = sphere_at(0.0, 1.0);
        let b = sphere_at(1.5, 1.0);
        let c = sphere_at(5.0, 1.0);
        let boxed = Collider::aabb(
            Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0)),
            DEFAULT_TAG,
        );

        assert!(a.is_colliding(&b));
        assert!(!a.is_colliding(&c));
        assert!(b.is_colliding(&boxed));
        assert!(boxed.is_colliding(&b));
        assert!(!a.is_colliding(&boxed));
    }

    #[test]
    fn test_set_position_leaf() {
        let a = sphere_at(0.0, 1.0);
        a.set_position(&[Vec3::new(3.0, 4.0, 5.0), Vec3::new(9.0, 9.0, 9.0)]);
        assert_relative_eq!(a.position().x, 3.0);
        assert_relative_eq!(a.position().y, 4.0);

        // Empty slice leaves the collider where it was
        a.set_position(&[]);
        assert_relative_eq!(a.position().z, 5.0);
    }

    #[test]
    fn test_composite_any_child_semantics() {
        let near = sphere_at(0.0, 1.0);
        let far = sphere_at(100.0, 1.0);
        let composite = Collider::composite(vec![far, near], "Group");

        let probe = sphere_at(1.5, 1.0);
        assert!(composite.is_colliding(&probe));
        // Leaf side delegates to the composite's own scan
        assert!(probe.is_colliding(&composite));

        let distant = sphere_at(50.0, 1.0);
        assert!(!composite.is_colliding(&distant));
    }

    #[test]
    fn test_composite_vs_composite() {
        let a = Collider::composite(vec![sphere_at(0.0, 1.0), sphere_at(10.0, 1.0)], "A");
        let b = Collider::composite(vec![sphere_at(10.5, 1.0)], "B");
        let c = Collider::composite(vec![sphere_at(30.0, 1.0)], "C");

        assert!(a.is_colliding(&b));
        assert!(b.is_colliding(&a));
        assert!(!a.is_colliding(&c));
    }

    #[test]
    fn test_composite_positional_move() {
        let c0 = sphere_at(0.0, 1.0);
        let c1 = sphere_at(1.0, 1.0);
        let c2 = sphere_at(2.0, 1.0);
        let composite =
            Collider::composite(vec![c0.clone(), c1.clone(), c2.clone()], "Group");

        // Two points move exactly the first two children
        composite.set_position(&[Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0)]);
        assert_relative_eq!(c0.position().x, 10.0);
        assert_relative_eq!(c1.position().x, 20.0);
        assert_relative_eq!(c2.position().x, 2.0);

        // Excess points are ignored
        composite.set_position(&[
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ]);
        assert_relative_eq!(c2.position().x, 3.0);
    }

    #[test]
    fn test_composite_centroid() {
        let composite = Collider::composite(vec![sphere_at(0.0, 1.0), sphere_at(4.0, 1.0)], "G");
        assert_relative_eq!(composite.position().x, 2.0);

        let empty = Collider::composite(Vec::new(), "G");
        assert_relative_eq!(empty.position().norm(), 0.0);
    }

    #[test]
    fn test_in_bound() {
        let composite = Collider::composite(vec![sphere_at(0.0, 1.0), sphere_at(10.0, 1.0)], "G");
        assert!(composite.in_bound(Vec3::new(10.5, 0.0, 0.0)));
        assert!(!composite.in_bound(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_child_management() {
        let composite = Collider::composite(Vec::new(), "G");
        let a = sphere_at(0.0, 1.0);
        let b = sphere_at(1.0, 1.0);
        let c = sphere_at(2.0, 1.0);

        composite.add_child(a.clone()).unwrap();
        composite.add_children([b.clone(), c.clone()]).unwrap();
        assert_eq!(composite.children().len(), 3);

        composite.remove_child(&b).unwrap();
        assert_eq!(composite.children().len(), 2);
        assert!(Arc::ptr_eq(&composite.children()[1], &c));

        // Ranged access clamps instead of erroring
        assert_eq!(composite.children_range(0, 2).len(), 2);
        assert_eq!(composite.children_range(5, 2).len(), 2);
        composite.remove_child_range(1, 10).unwrap();
        assert_eq!(composite.children().len(), 1);

        composite.clear_children().unwrap();
        assert!(composite.children().is_empty());
    }

    #[test]
    fn test_child_ops_require_composite() {
        let leaf = sphere_at(0.0, 1.0);
        assert_eq!(
            leaf.add_child(sphere_at(1.0, 1.0)),
            Err(ColliderError::NotComposite)
        );
        assert!(leaf.children().is_empty());
        assert_eq!(leaf.set_all_radii(2.0), Err(ColliderError::NotComposite));
    }

    #[test]
    fn test_radius_updates() {
        let sphere = sphere_at(0.0, 1.0);
        sphere.set_radius(3.0).unwrap();
        assert_eq!(sphere.shape(), Shape::Sphere(Sphere::new(Vec3::zeros(), 3.0)));

        let boxed = Collider::aabb(
            Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)),
            DEFAULT_TAG,
        );
        assert_eq!(boxed.set_radius(3.0), Err(ColliderError::NotSphere));

        let composite =
            Collider::composite(vec![sphere_at(0.0, 1.0), boxed.clone()], "G");
        composite.set_all_radii(5.0).unwrap();
        match composite.shape() {
            Shape::Composite(shapes) => {
                assert_eq!(shapes[0], Shape::Sphere(Sphere::new(Vec3::zeros(), 5.0)));
                // Non-sphere children are untouched
                assert_eq!(shapes[1], boxed.shape());
            }
            _ => panic!("expected composite shape"),
        }
    }

    #[test]
    fn test_active_flag() {
        let a = sphere_at(0.0, 1.0);
        assert!(a.is_active());
        a.set_active(false);
        assert!(!a.is_active());
    }

    #[test]
    fn test_user_data() {
        let a = sphere_at(0.0, 1.0);
        assert!(a.user_data().is_none());
        a.set_user_data(Some(Arc::new(42_u32)));
        let data = a.user_data().unwrap();
        assert_eq!(data.downcast_ref::<u32>(), Some(&42));

        let named = Collider::sphere_with_data(
            Sphere::new(Vec3::zeros(), 1.0),
            "Player",
            Arc::new("ship".to_string()),
        );
        let data = named.user_data().unwrap();
        assert_eq!(data.downcast_ref::<String>().map(String::as_str), Some("ship"));
    }

    #[test]
    fn test_handler_order_and_snapshot() {
        use std::sync::Mutex;

        let a = sphere_at(0.0, 1.0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        let second = Arc::clone(&order);
        a.on_collision(move |_| first.lock().unwrap().push(1));
        a.on_collision(move |_| second.lock().unwrap().push(2));

        a.notify(&sphere_at(0.5, 1.0));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_handler_panic_is_isolated() {
        let a = sphere_at(0.0, 1.0);
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        a.on_collision(|_| panic!("handler failure"));
        a.on_collision(move |_| flag.store(true, Ordering::SeqCst));

        a.notify(&sphere_at(0.5, 1.0));
        assert!(reached.load(Ordering::SeqCst));
    }
}
