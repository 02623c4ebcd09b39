//! Collision registry and detection scheduler
//!
//! The [`CollisionManager`] owns every registered collider, bucketed by tag,
//! together with a symmetric trigger matrix that selects which tag pairs are
//! narrow-phase tested each pass. A pass
//! ([`CollisionManager::update`]) tests the member pairs of every enabled
//! tag pair, sequentially or fanned out across a rayon scope, and notifies
//! both sides of each intersecting pair. Structural mutation requested while
//! a pass is in flight is queued and flushed right after it completes, so
//! detection units only ever read a frozen snapshot of the bucket structure.
//!
//! Ray queries scan the registered population directly and are independent
//! of the detection cycle.

mod trigger;

use std::collections::HashMap;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;

use log::{debug, warn};

use crate::collider::Collider;
use crate::config::ManagerConfig;
use crate::foundation::math::Vec3;
use crate::ray::{Ray, RaycastError};
use self::trigger::TriggerMatrix;

/// A single raycast hit
#[derive(Debug, Clone)]
pub struct RayHit {
    /// The collider the ray intersected
    pub collider: Arc<Collider>,
    /// The chosen intersection point
    pub point: Vec3,
    /// Vector from the ray origin to the intersection point
    pub vector: Vec3,
}

/// Optional raycast constraints
#[derive(Debug, Clone, Default)]
pub struct RaycastOptions {
    /// Rescales the ray into a fixed-length probe before casting. The cast
    /// itself only uses the ray's direction, so hits past the limit are
    /// still reported; see [`CollisionManager::raycast`].
    pub max_distance: Option<f32>,
    /// Restrict the scan to these tag buckets; unknown tags are skipped
    pub tags: Option<Vec<String>>,
}

/// Tag-indexed bucket structure, mutated only while the manager is idle
struct TagIndex {
    tags: Vec<String>,
    buckets: HashMap<String, Vec<Arc<Collider>>>,
    triggers: TriggerMatrix,
}

impl TagIndex {
    /// Index of `tag`, creating its bucket and growing the trigger matrix
    /// if it has not been seen before
    fn ensure_tag(&mut self, tag: &str) -> usize {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            return pos;
        }
        debug!("collision tag {tag:?} registered");
        self.tags.push(tag.to_string());
        self.buckets.insert(tag.to_string(), Vec::new());
        self.triggers.grow_to(self.tags.len());
        self.tags.len() - 1
    }

    fn tag_pos(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

/// Idle/updating flag and the queues that buffer structural mutation
/// requested while a pass is in flight
#[derive(Default)]
struct PassSync {
    updating: bool,
    pending_add: Vec<Arc<Collider>>,
    pending_remove: Vec<Arc<Collider>>,
}

/// One independent unit of narrow-phase work: a snapshot of the bucket(s)
/// behind a single enabled tag pair
enum DetectJob {
    /// All unordered pairs within one bucket
    Within(Vec<Arc<Collider>>),
    /// The full cross product between two buckets
    Between(Vec<Arc<Collider>>, Vec<Arc<Collider>>),
}

impl DetectJob {
    /// Narrow-phase test every pair in this unit, notifying both sides of
    /// each intersecting pair (first member before second). Inactive
    /// colliders are skipped.
    fn run(&self) {
        match self {
            DetectJob::Within(bucket) => {
                for i in 0..bucket.len().saturating_sub(1) {
                    if !bucket[i].is_active() {
                        continue;
                    }
                    for j in (i + 1)..bucket.len() {
                        if bucket[j].is_active() && bucket[i].is_colliding(&bucket[j]) {
                            bucket[i].notify(&bucket[j]);
                            bucket[j].notify(&bucket[i]);
                        }
                    }
                }
            }
            DetectJob::Between(left, right) => {
                if left.is_empty() || right.is_empty() {
                    return;
                }
                for a in left {
                    if !a.is_active() {
                        continue;
                    }
                    for b in right {
                        if b.is_active() && a.is_colliding(b) {
                            a.notify(b);
                            b.notify(a);
                        }
                    }
                }
            }
        }
    }
}

/// Registry and scheduler for tagged collision bodies
///
/// Shared through `Arc`; every method takes `&self`, so the manager can be
/// handed to collision handlers and worker threads. Internally a single
/// mutex guards the idle/updating transition and the pending queues, and the
/// bucket structure is only written while idle, which is what makes the
/// concurrent detection fan-out safe.
pub struct CollisionManager {
    config: ManagerConfig,
    index: RwLock<TagIndex>,
    sync: Mutex<PassSync>,
    idle: Condvar,
    active: AtomicBool,
}

impl CollisionManager {
    /// Creates a manager with the default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(ManagerConfig::default())
    }

    /// Creates a manager with the given configuration
    pub fn with_config(config: ManagerConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            index: RwLock::new(TagIndex {
                tags: Vec::new(),
                buckets: HashMap::new(),
                triggers: TriggerMatrix::new(config.default_trigger),
            }),
            sync: Mutex::new(PassSync::default()),
            idle: Condvar::new(),
            active: AtomicBool::new(true),
            config,
        });
        {
            let mut index = manager.index.write().unwrap();
            for tag in &manager.config.initial_tags {
                index.ensure_tag(tag);
            }
        }
        manager
    }

    /// Register a collider under its current tag
    ///
    /// Applied immediately while idle; queued while a pass is in flight and
    /// applied right after it completes. Registering a collider that is
    /// already bucketed is a no-op; a collider registered with a different
    /// manager transitions to this one.
    pub fn register(self: &Arc<Self>, collider: Arc<Collider>) {
        {
            let mut sync = self.sync.lock().unwrap();
            if sync.updating {
                sync.pending_add.push(collider);
                return;
            }
        }
        self.add_collider(&collider);
    }

    /// Register a batch of colliders
    pub fn register_all<I>(self: &Arc<Self>, colliders: I)
    where
        I: IntoIterator<Item = Arc<Collider>>,
    {
        for collider in colliders {
            self.register(collider);
        }
    }

    /// Remove a collider from its tag bucket
    ///
    /// Applied immediately while idle; queued while a pass is in flight.
    /// A no-op if the collider is not registered.
    pub fn unregister(&self, collider: Arc<Collider>) {
        {
            let mut sync = self.sync.lock().unwrap();
            if sync.updating {
                sync.pending_remove.push(collider);
                return;
            }
        }
        self.remove_collider(&collider);
    }

    /// Unregister a batch of colliders
    pub fn unregister_all<I>(&self, colliders: I)
    where
        I: IntoIterator<Item = Arc<Collider>>,
    {
        for collider in colliders {
            self.unregister(collider);
        }
    }

    /// Enable or disable narrow-phase testing between two tags
    ///
    /// Unknown tags are created on the spot (with empty buckets), so
    /// triggers can be configured ahead of registration. Both (a, b) and
    /// (b, a) are set.
    pub fn set_tag_trigger(&self, tag_a: &str, tag_b: &str, enabled: bool) {
        let mut index = self.index.write().unwrap();
        let i = index.ensure_tag(tag_a);
        let j = index.ensure_tag(tag_b);
        index.triggers.set(i, j, enabled);
    }

    /// Whether testing between two tags is enabled; false for unknown tags
    pub fn tag_trigger(&self, tag_a: &str, tag_b: &str) -> bool {
        let index = self.index.read().unwrap();
        match (index.tag_pos(tag_a), index.tag_pos(tag_b)) {
            (Some(i), Some(j)) => index.triggers.get(i, j),
            _ => false,
        }
    }

    /// Run one detection pass over every enabled tag pair
    ///
    /// A no-op when the manager is inactive or a pass is already in flight.
    /// With `concurrent` set, each enabled tag pair is dispatched as an
    /// independent unit on a rayon scope and the call blocks until all units
    /// finish; a panicking unit is caught and suppressed without cancelling
    /// its siblings. Pending registrations are flushed (adds first, then
    /// removes) after the pass.
    ///
    /// Within one unit, pair order and callback order are deterministic; no
    /// ordering holds across concurrently dispatched units, and a collider
    /// whose tag participates in several enabled pairs may have its handlers
    /// invoked concurrently from two units in the same pass.
    pub fn update(self: &Arc<Self>, concurrent: bool) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut sync = self.sync.lock().unwrap();
            if sync.updating {
                return;
            }
            sync.updating = true;
        }

        let jobs = self.snapshot_jobs();
        if concurrent {
            rayon::scope(|scope| {
                for job in &jobs {
                    scope.spawn(move |_| {
                        if catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
                            warn!("detection unit panicked; sibling units continue");
                        }
                    });
                }
            });
        } else {
            for job in &jobs {
                job.run();
            }
        }

        let (added, removed) = {
            let mut sync = self.sync.lock().unwrap();
            sync.updating = false;
            self.idle.notify_all();
            (
                mem::take(&mut sync.pending_add),
                mem::take(&mut sync.pending_remove),
            )
        };
        for collider in &added {
            self.add_collider(collider);
        }
        for collider in &removed {
            self.remove_collider(collider);
        }
    }

    /// Cast a ray against the registered population
    ///
    /// Hits are sorted by ascending distance, keyed on the squared length of
    /// the origin-to-point vector rounded to three decimal places (ties keep
    /// encounter order). `max_distance` rescales the probe's through-point
    /// but does not cull hits past the limit — the cast only uses the ray's
    /// direction, a behavior downstream code depends on.
    pub fn raycast(&self, ray: Ray, options: &RaycastOptions) -> Result<Vec<RayHit>, RaycastError> {
        let mut ray = ray;
        if ray.direction().is_none() {
            return Err(RaycastError::DegenerateDirection);
        }
        if let Some(distance) = options.max_distance {
            ray.set_length(distance);
        }

        let buckets: Vec<Vec<Arc<Collider>>> = {
            let index = self.index.read().unwrap();
            match &options.tags {
                Some(tags) => tags
                    .iter()
                    .filter_map(|tag| index.buckets.get(tag).cloned())
                    .collect(),
                None => index
                    .tags
                    .iter()
                    .filter_map(|tag| index.buckets.get(tag).cloned())
                    .collect(),
            }
        };

        let mut hits = Vec::new();
        for bucket in &buckets {
            for collider in bucket {
                if let Some(point) = ray.try_cast(&collider.shape())? {
                    hits.push(RayHit {
                        collider: Arc::clone(collider),
                        point,
                        vector: point - ray.origin,
                    });
                }
            }
        }
        hits.sort_by_key(|hit| (hit.vector.norm_squared() * 1000.0).round() as i64);
        Ok(hits)
    }

    /// Request a full reset
    ///
    /// Serviced on a spawned thread that waits for any in-flight pass to
    /// finish, then deactivates the manager and empties the buckets, the tag
    /// list, the trigger matrix, and the queued removals (queued additions
    /// survive). Join the returned handle to await completion. Must not be
    /// awaited from inside a collision handler, which runs during a pass.
    pub fn clear(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let manager = Arc::clone(self);
        thread::spawn(move || {
            let mut sync = manager.sync.lock().unwrap();
            while sync.updating {
                sync = manager.idle.wait(sync).unwrap();
            }
            manager.active.store(false, Ordering::SeqCst);
            {
                let mut index = manager.index.write().unwrap();
                index.tags.clear();
                index.buckets.clear();
                index.triggers.clear();
            }
            sync.pending_remove.clear();
            debug!("collision manager cleared");
        })
    }

    /// Whether detection passes run; a cleared manager is inactive until
    /// reactivated
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Enable or disable detection passes (registration is unaffected)
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether a detection pass is currently in flight
    pub fn is_updating(&self) -> bool {
        self.sync.lock().unwrap().updating
    }

    /// Number of registered colliders across all buckets
    pub fn collider_count(&self) -> usize {
        let index = self.index.read().unwrap();
        index.buckets.values().map(Vec::len).sum()
    }

    /// Whether this exact collider is bucketed here
    pub fn is_registered(&self, collider: &Arc<Collider>) -> bool {
        let index = self.index.read().unwrap();
        index
            .buckets
            .values()
            .any(|bucket| bucket.iter().any(|c| Arc::ptr_eq(c, collider)))
    }

    /// Every tag ever registered, in introduction order
    pub fn tags(&self) -> Vec<String> {
        self.index.read().unwrap().tags.clone()
    }

    /// Insert a collider into the bucket for its current tag and bind its
    /// back-reference; detaches it from a previous manager first
    fn add_collider(self: &Arc<Self>, collider: &Arc<Collider>) {
        if let Some(previous) = collider.manager() {
            if !Arc::ptr_eq(&previous, self) {
                previous.unregister(Arc::clone(collider));
            }
        }
        collider.bind(&Arc::downgrade(self));

        let tag = collider.tag();
        let mut index = self.index.write().unwrap();
        index.ensure_tag(&tag);
        if let Some(bucket) = index.buckets.get_mut(&tag) {
            if !bucket.iter().any(|c| Arc::ptr_eq(c, collider)) {
                bucket.push(Arc::clone(collider));
            }
        }
    }

    /// Remove a collider from the bucket for its current tag
    fn remove_collider(&self, collider: &Arc<Collider>) {
        let tag = collider.tag();
        let mut index = self.index.write().unwrap();
        if let Some(bucket) = index.buckets.get_mut(&tag) {
            bucket.retain(|c| !Arc::ptr_eq(c, collider));
        }
    }

    /// Snapshot one detection unit per enabled tag pair
    ///
    /// Bucket membership is cloned out under the read lock so the units run
    /// without touching the manager's locks at all.
    fn snapshot_jobs(&self) -> Vec<DetectJob> {
        let index = self.index.read().unwrap();
        let mut jobs = Vec::new();
        for i in 0..index.tags.len() {
            for j in i..index.tags.len() {
                if !index.triggers.get(i, j) {
                    continue;
                }
                let left = index
                    .buckets
                    .get(&index.tags[i])
                    .cloned()
                    .unwrap_or_default();
                if i == j {
                    jobs.push(DetectJob::Within(left));
                } else {
                    let right = index
                        .buckets
                        .get(&index.tags[j])
                        .cloned()
                        .unwrap_or_default();
                    jobs.push(DetectJob::Between(left, right));
                }
            }
        }
        jobs
    }
}
