//! Paired body/proxy bookkeeping with atomic spawn and idempotent teardown.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        material::MaterialTag,
        rigidbody::{BodyHandle, RigidBody},
        shape::{ShapeDescriptor, ShapeKind},
        types::{Pose, Transform},
    },
    error::SpawnError,
    feedback::{FeedbackRoutes, ListenerToken},
    scene::{ProxyHandle, SceneGraph},
    utils::allocator::{typed_handle, Arena},
    world::PhysicsWorld,
};

typed_handle!(
    /// Handle to a live [`RegistryEntry`].
    EntryHandle
);

/// How the mass of a spawned body is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MassPolicy {
    Static,
    /// Explicit mass; zero makes the body static.
    Mass(f32),
    /// Mass from shape volume times density.
    Density(f32),
}

impl Default for MassPolicy {
    fn default() -> Self {
        MassPolicy::Mass(1.0)
    }
}

impl MassPolicy {
    fn resolve(self, shape: &ShapeDescriptor) -> Result<f32, SpawnError> {
        let mass = match self {
            MassPolicy::Static => 0.0,
            MassPolicy::Mass(mass) => {
                if !(mass.is_finite() && mass >= 0.0) {
                    return Err(SpawnError::InvalidMass(mass));
                }
                mass
            }
            MassPolicy::Density(density) => {
                if !(density.is_finite() && density > 0.0) {
                    return Err(SpawnError::InvalidDensity(density));
                }
                let volume = shape.volume().ok_or(SpawnError::DynamicPlane)?;
                volume * density
            }
        };
        if shape.is_plane() && mass > 0.0 {
            return Err(SpawnError::DynamicPlane);
        }
        Ok(mass)
    }
}

/// Everything needed to create one simulated, rendered object.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub shape: ShapeDescriptor,
    pub material: MaterialTag,
    pub mass: MassPolicy,
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl SpawnRequest {
    pub fn new(shape: ShapeDescriptor) -> Self {
        Self {
            shape,
            material: MaterialTag::DEFAULT,
            mass: MassPolicy::default(),
            pose: Pose::default(),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    pub fn with_material(mut self, material: MaterialTag) -> Self {
        self.material = material;
        self
    }

    pub fn with_mass(mut self, mass: MassPolicy) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    fn validate(&self) -> Result<f32, SpawnError> {
        self.shape.validate()?;
        if !self.pose.is_finite() || self.pose.rotation.length_squared() < 1e-12 {
            return Err(SpawnError::InvalidPose);
        }
        if !(self.linear_velocity.is_finite() && self.angular_velocity.is_finite()) {
            return Err(SpawnError::InvalidVelocity);
        }
        self.mass.resolve(&self.shape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Live,
    TornDown,
}

/// One spawned object: its body, its proxy, and its feedback subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryEntry {
    pub body: BodyHandle,
    pub proxy: ProxyHandle,
    pub token: ListenerToken,
    pub kind: ShapeKind,
    pub material: MaterialTag,
    /// Monotonic spawn order.
    pub sequence: u64,
}

/// Owns the pairing between world bodies and scene proxies.
///
/// A registry-spawned body is present in the world exactly while its entry
/// is live; body and proxy always go away together.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: Arena<RegistryEntry>,
    by_body: HashMap<BodyHandle, EntryHandle>,
    next_sequence: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `request`, then creates proxy, body, and feedback route.
    /// On error nothing has been created.
    pub fn spawn<S, R>(
        &mut self,
        world: &mut PhysicsWorld,
        scene: &mut S,
        bridge: &mut R,
        request: SpawnRequest,
    ) -> Result<EntryHandle, SpawnError>
    where
        S: SceneGraph + ?Sized,
        R: FeedbackRoutes + ?Sized,
    {
        let mass = request.validate().inspect_err(|err| {
            log::debug!("spawn rejected: {err}");
        })?;

        let kind = request.shape.kind();
        let pose = Pose::new(request.pose.position, request.pose.rotation.normalize());
        let transform = Transform::from_pose(pose, request.shape.proxy_scale());
        let proxy = scene
            .create_proxy(&request.shape, request.material, transform)
            .inspect_err(|err| log::debug!("spawn rejected by scene: {err}"))?;

        let body = world.add_body(
            RigidBody::new(request.shape, mass)
                .with_pose(pose)
                .with_material(request.material)
                .with_velocity(request.linear_velocity, request.angular_velocity),
        );

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let entry = EntryHandle(self.entries.insert(RegistryEntry {
            body,
            proxy,
            token: ListenerToken::default(),
            kind,
            material: request.material,
            sequence,
        }));
        let token = bridge.attach(body, Some(entry));
        if let Some(stored) = self.entries.get_mut(entry.id()) {
            stored.token = token;
        }
        self.by_body.insert(body, entry);

        log::debug!("spawned {kind:?} #{sequence} as {body:?}");
        Ok(entry)
    }

    /// Detaches feedback, removes the body, removes the proxy, then drops the
    /// entry. Unknown or already torn-down handles return `false`.
    pub fn teardown<S, R>(
        &mut self,
        world: &mut PhysicsWorld,
        scene: &mut S,
        bridge: &mut R,
        handle: EntryHandle,
    ) -> bool
    where
        S: SceneGraph + ?Sized,
        R: FeedbackRoutes + ?Sized,
    {
        let Some(entry) = self.entries.get(handle.id()).copied() else {
            return false;
        };

        bridge.detach(entry.token);
        if world.remove_body(entry.body).is_none() {
            log::warn!("entry {handle:?} lost its body {:?}", entry.body);
        }
        if !scene.remove_proxy(entry.proxy) {
            log::warn!("entry {handle:?} lost its proxy {:?}", entry.proxy);
        }
        self.entries.remove(handle.id());
        self.by_body.remove(&entry.body);

        log::debug!("tore down {:?} #{}", entry.kind, entry.sequence);
        true
    }

    /// Tears down every live entry; returns how many were removed.
    pub fn teardown_all<S, R>(
        &mut self,
        world: &mut PhysicsWorld,
        scene: &mut S,
        bridge: &mut R,
    ) -> usize
    where
        S: SceneGraph + ?Sized,
        R: FeedbackRoutes + ?Sized,
    {
        self.handles()
            .into_iter()
            .filter(|&handle| self.teardown(world, scene, bridge, handle))
            .count()
    }

    pub fn lifecycle(&self, handle: EntryHandle) -> Lifecycle {
        if self.entries.contains(handle.id()) {
            Lifecycle::Live
        } else {
            Lifecycle::TornDown
        }
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&RegistryEntry> {
        self.entries.get(handle.id())
    }

    pub fn entry_for_body(&self, body: BodyHandle) -> Option<EntryHandle> {
        self.by_body.get(&body).copied()
    }

    pub fn handles(&self) -> Vec<EntryHandle> {
        self.entries.ids().map(EntryHandle).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryHandle, &RegistryEntry)> + '_ {
        self.entries
            .iter_with_ids()
            .map(|(id, entry)| (EntryHandle(id), entry))
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(EntryHandle, &RegistryEntry),
    {
        for (handle, entry) in self.iter() {
            f(handle, entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    use crate::{
        error::SceneError,
        feedback::CollisionFeedbackBridge,
        scene::{ProxyStore, RenderProxy},
    };
    use approx::assert_relative_eq;

    struct Fixture {
        world: PhysicsWorld,
        scene: ProxyStore,
        bridge: CollisionFeedbackBridge,
        registry: EntityRegistry,
    }

    impl Fixture {
        fn new(scene: ProxyStore) -> Self {
            Self {
                world: PhysicsWorld::default(),
                scene,
                bridge: CollisionFeedbackBridge::default(),
                registry: EntityRegistry::new(),
            }
        }

        fn spawn(&mut self, request: SpawnRequest) -> Result<EntryHandle, SpawnError> {
            self.registry
                .spawn(&mut self.world, &mut self.scene, &mut self.bridge, request)
        }

        fn teardown(&mut self, handle: EntryHandle) -> bool {
            self.registry
                .teardown(&mut self.world, &mut self.scene, &mut self.bridge, handle)
        }

        fn counts(&self) -> (usize, usize, usize, usize) {
            (
                self.registry.len(),
                self.world.body_count(),
                self.scene.proxy_count(),
                self.bridge.route_count(),
            )
        }
    }

    #[test]
    fn spawn_pairs_body_proxy_and_route() {
        let mut fx = Fixture::new(ProxyStore::new());
        let handle = fx
            .spawn(SpawnRequest::new(ShapeDescriptor::cuboid(Vec3::new(1.0, 2.0, 3.0))).with_position(Vec3::Y))
            .expect("spawned");

        assert_eq!(fx.counts(), (1, 1, 1, 1));
        let entry = *fx.registry.get(handle).expect("entry");
        assert_eq!(fx.registry.entry_for_body(entry.body), Some(handle));
        assert!(fx.bridge.is_routed(entry.body));

        let proxy = fx.scene.proxy(entry.proxy).expect("proxy");
        assert_eq!(proxy.scale(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(proxy.position(), Vec3::Y);
    }

    #[test]
    fn rejected_spawns_leave_nothing_behind() {
        let mut fx = Fixture::new(ProxyStore::with_capacity_limit(1));
        fx.spawn(SpawnRequest::new(ShapeDescriptor::sphere(1.0)))
            .expect("first fits");
        let before = fx.counts();

        let rejected = [
            SpawnRequest::new(ShapeDescriptor::sphere(0.0)),
            SpawnRequest::new(ShapeDescriptor::sphere(1.0)).with_mass(MassPolicy::Mass(-1.0)),
            SpawnRequest::new(ShapeDescriptor::sphere(1.0)).with_mass(MassPolicy::Density(f32::NAN)),
            SpawnRequest::new(ShapeDescriptor::Plane),
            SpawnRequest::new(ShapeDescriptor::sphere(1.0)).with_position(Vec3::splat(f32::INFINITY)),
            SpawnRequest::new(ShapeDescriptor::sphere(1.0)),
        ];
        let errors: Vec<SpawnError> = rejected
            .into_iter()
            .map(|request| fx.spawn(request).expect_err("rejected"))
            .collect();

        assert!(matches!(errors[0], SpawnError::Shape(_)));
        assert_eq!(errors[1], SpawnError::InvalidMass(-1.0));
        assert!(matches!(errors[2], SpawnError::InvalidDensity(_)));
        assert_eq!(errors[3], SpawnError::DynamicPlane);
        assert_eq!(errors[4], SpawnError::InvalidPose);
        assert_eq!(errors[5], SpawnError::Scene(SceneError::CapacityExceeded(1)));
        assert_eq!(fx.counts(), before);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut fx = Fixture::new(ProxyStore::new());
        let handle = fx
            .spawn(SpawnRequest::new(ShapeDescriptor::sphere(0.5)))
            .expect("spawned");

        assert!(fx.teardown(handle));
        assert_eq!(fx.registry.lifecycle(handle), Lifecycle::TornDown);
        assert_eq!(fx.counts(), (0, 0, 0, 0));

        assert!(!fx.teardown(handle));
        assert_eq!(fx.counts(), (0, 0, 0, 0));
    }

    #[test]
    fn teardown_all_then_again_is_a_no_op() {
        let mut fx = Fixture::new(ProxyStore::new());
        for i in 0..4 {
            fx.spawn(SpawnRequest::new(ShapeDescriptor::sphere(0.5)).with_position(Vec3::X * i as f32 * 2.0))
                .expect("spawned");
        }

        let removed = fx
            .registry
            .teardown_all(&mut fx.world, &mut fx.scene, &mut fx.bridge);
        assert_eq!(removed, 4);
        let again = fx
            .registry
            .teardown_all(&mut fx.world, &mut fx.scene, &mut fx.bridge);
        assert_eq!(again, 0);
        assert_eq!(fx.counts(), (0, 0, 0, 0));
    }

    #[test]
    fn mass_policies() {
        let sphere = ShapeDescriptor::sphere(1.0);
        assert_eq!(MassPolicy::Static.resolve(&sphere), Ok(0.0));
        assert_eq!(MassPolicy::Mass(0.0).resolve(&sphere), Ok(0.0));
        let dense = MassPolicy::Density(2.0).resolve(&sphere).expect("mass");
        assert_relative_eq!(dense, 2.0 * 4.0 / 3.0 * std::f32::consts::PI, epsilon = 1e-4);
        assert_eq!(MassPolicy::Static.resolve(&ShapeDescriptor::Plane), Ok(0.0));
        assert_eq!(
            MassPolicy::Density(1.0).resolve(&ShapeDescriptor::Plane),
            Err(SpawnError::DynamicPlane)
        );
    }

    /// Routes shared with [`WatchingScene`] so proxy removal can inspect them.
    struct SharedRoutes(Rc<RefCell<CollisionFeedbackBridge>>);

    impl FeedbackRoutes for SharedRoutes {
        fn attach(&mut self, body: BodyHandle, entry: Option<EntryHandle>) -> ListenerToken {
            self.0.borrow_mut().attach(body, entry)
        }

        fn detach(&mut self, token: ListenerToken) -> bool {
            self.0.borrow_mut().detach(token)
        }
    }

    /// Scene that records, at removal time, whether the body was still routed.
    struct WatchingScene {
        store: ProxyStore,
        routes: Rc<RefCell<CollisionFeedbackBridge>>,
        watched: Option<BodyHandle>,
        routed_at_removal: Vec<bool>,
    }

    impl SceneGraph for WatchingScene {
        fn create_proxy(
            &mut self,
            shape: &ShapeDescriptor,
            material: MaterialTag,
            transform: Transform,
        ) -> Result<ProxyHandle, SceneError> {
            self.store.create_proxy(shape, material, transform)
        }

        fn remove_proxy(&mut self, handle: ProxyHandle) -> bool {
            if let Some(body) = self.watched {
                self.routed_at_removal.push(self.routes.borrow().is_routed(body));
            }
            self.store.remove_proxy(handle)
        }

        fn proxy(&self, handle: ProxyHandle) -> Option<&RenderProxy> {
            self.store.proxy(handle)
        }

        fn proxy_mut(&mut self, handle: ProxyHandle) -> Option<&mut RenderProxy> {
            self.store.proxy_mut(handle)
        }

        fn proxy_count(&self) -> usize {
            self.store.proxy_count()
        }
    }

    #[test]
    fn feedback_is_detached_before_the_proxy_goes() {
        let shared = Rc::new(RefCell::new(CollisionFeedbackBridge::default()));
        let mut routes = SharedRoutes(Rc::clone(&shared));
        let mut scene = WatchingScene {
            store: ProxyStore::new(),
            routes: Rc::clone(&shared),
            watched: None,
            routed_at_removal: Vec::new(),
        };
        let mut world = PhysicsWorld::default();
        let mut registry = EntityRegistry::new();

        let handle = registry
            .spawn(&mut world, &mut scene, &mut routes, SpawnRequest::new(ShapeDescriptor::sphere(0.5)))
            .expect("spawned");
        let body = registry.get(handle).expect("entry").body;
        assert!(shared.borrow().is_routed(body));

        scene.watched = Some(body);
        assert!(registry.teardown(&mut world, &mut scene, &mut routes, handle));

        assert_eq!(scene.routed_at_removal, vec![false]);
        assert!(!world.contains(body));
        assert_eq!(scene.proxy_count(), 0);
        assert_eq!(shared.borrow().route_count(), 0);
    }
}
