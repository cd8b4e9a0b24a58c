use std::collections::HashSet;

use glam::Vec3;

use crate::{
    collision::{
        broadphase::{BroadPhase, BroadPhaseKind, BroadPhaseProxy},
        contact::{CollisionEvent, Contact, ContactPoint},
        narrowphase::NarrowPhase,
    },
    config::WorldConfig,
    core::{
        material::ContactMaterialTable,
        rigidbody::{BodyHandle, RigidBody},
    },
    dynamics::{integrator::Integrator, solver::ContactSolver},
    utils::{allocator::Arena, logging::ScopedTimer},
};

/// Receives collision events raised while the world steps.
pub trait CollisionListener {
    fn on_collision(&mut self, event: &CollisionEvent);
}

impl<F> CollisionListener for F
where
    F: FnMut(&CollisionEvent),
{
    fn on_collision(&mut self, event: &CollisionEvent) {
        self(event)
    }
}

/// What happened during one [`PhysicsWorld::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub substeps: u32,
    /// Contact points handed to the solver, summed over substeps.
    pub contacts: usize,
    pub events_dispatched: usize,
    /// Events dropped because one of their bodies no longer exists.
    pub events_discarded: usize,
}

/// Central simulation container: bodies, contact materials, and the step pipeline.
pub struct PhysicsWorld {
    bodies: Arena<RigidBody>,
    materials: ContactMaterialTable,
    config: WorldConfig,
    integrator: Integrator,
    solver: ContactSolver,
    broadphase: BroadPhase,
    touching: HashSet<(BodyHandle, BodyHandle)>,
    pending_events: Vec<CollisionEvent>,
    elapsed: f32,
    scratch_points: Vec<ContactPoint>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            bodies: Arena::new(),
            materials: ContactMaterialTable::new(config.default_contact),
            integrator: Integrator::new(),
            solver: ContactSolver::new(config.solver),
            broadphase: BroadPhase::new(config.broadphase, config.grid_cell_size),
            touching: HashSet::new(),
            pending_events: Vec::new(),
            elapsed: 0.0,
            scratch_points: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_broadphase(&mut self, kind: BroadPhaseKind) {
        self.config.broadphase = kind;
        self.broadphase.set_kind(kind);
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.integrator.parallel()
    }

    /// Simulated time advanced so far, in seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn materials(&self) -> &ContactMaterialTable {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut ContactMaterialTable {
        &mut self.materials
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.insert(body));
        if let Some(stored) = self.bodies.get_mut(handle.id()) {
            stored.handle = handle;
        }
        handle
    }

    /// Removes a body. Stale handles return `None` and change nothing.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(handle.id())?;

        let mut neighbours = Vec::new();
        self.touching.retain(|&(a, b)| {
            if a == handle {
                neighbours.push(b);
                false
            } else if b == handle {
                neighbours.push(a);
                false
            } else {
                true
            }
        });
        for neighbour in neighbours {
            if let Some(other) = self.bodies.get_mut(neighbour.id()) {
                other.wake_up();
            }
        }
        self.pending_events.retain(|event| !event.involves(handle));

        Some(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.id())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.id())
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.id())
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.iter()
    }

    /// Whether the two bodies were in contact at the end of the last substep.
    pub fn is_touching(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.touching.contains(&ordered(a, b))
    }

    /// Advances the world by `substeps` steps of `fixed_delta` seconds each.
    ///
    /// Collision events raised along the way reach `listener` before this
    /// returns, in the order they were produced.
    pub fn step(
        &mut self,
        fixed_delta: f32,
        substeps: u32,
        listener: &mut dyn CollisionListener,
    ) -> StepSummary {
        let mut summary = StepSummary::default();
        if !(fixed_delta.is_finite() && fixed_delta > 0.0) {
            log::debug!("ignoring step with invalid delta {fixed_delta}");
            return summary;
        }

        let _timer = ScopedTimer::new("world::step");
        for _ in 0..substeps {
            summary.contacts += self.substep(fixed_delta);
            summary.substeps += 1;
        }

        for event in std::mem::take(&mut self.pending_events) {
            if self.contains(event.body_a) && self.contains(event.body_b) {
                listener.on_collision(&event);
                summary.events_dispatched += 1;
            } else {
                summary.events_discarded += 1;
            }
        }
        summary
    }

    fn substep(&mut self, dt: f32) -> usize {
        let config = self.config;

        {
            let _timer = ScopedTimer::new("integrate::velocities");
            self.integrator.integrate_velocities(
                &mut self.bodies,
                config.gravity,
                config.linear_damping,
                config.angular_damping,
                dt,
            );
        }

        let contacts = {
            let _timer = ScopedTimer::new("contacts::generate");
            self.generate_contacts()
        };

        {
            let _timer = ScopedTimer::new("solver");
            let metrics = self
                .solver
                .solve(&mut self.bodies, &contacts, dt, config.sleep.speed_limit);
            for handle in metrics.woken {
                if let Some(body) = self.bodies.get_mut(handle.id()) {
                    body.wake_up();
                }
            }
        }

        {
            let _timer = ScopedTimer::new("integrate::positions");
            self.integrator.integrate_positions(&mut self.bodies, dt);
        }

        self.elapsed += dt;
        if config.allow_sleep {
            let now = self.elapsed;
            for body in self.bodies.iter_mut() {
                body.update_sleep(now, &config.sleep);
            }
        }

        contacts.len()
    }

    /// Builds solver contacts and records events for pairs that just started touching.
    fn generate_contacts(&mut self) -> Vec<Contact> {
        let proxies: Vec<BroadPhaseProxy> = self
            .bodies
            .iter_with_ids()
            .map(|(id, body)| BroadPhaseProxy {
                handle: BodyHandle(id),
                aabb: body.shape.aabb(&body.pose),
            })
            .collect();
        let pairs = self.broadphase.candidate_pairs(&proxies);

        let previous = std::mem::take(&mut self.touching);
        let mut contacts = Vec::new();

        for (handle_a, handle_b) in pairs {
            let (Some(a), Some(b)) = (self.bodies.get(handle_a.id()), self.bodies.get(handle_b.id()))
            else {
                continue;
            };

            if !a.is_active() && !b.is_active() {
                if previous.contains(&(handle_a, handle_b)) {
                    self.touching.insert((handle_a, handle_b));
                }
                continue;
            }

            self.scratch_points.clear();
            NarrowPhase::collide(&a.shape, &a.pose, &b.shape, &b.pose, &mut self.scratch_points);
            if self.scratch_points.is_empty() {
                continue;
            }

            let material = self.materials.lookup(a.material, b.material);
            let newly_touching = !previous.contains(&(handle_a, handle_b));
            self.touching.insert((handle_a, handle_b));

            for point in &self.scratch_points {
                let relative_normal_velocity =
                    (b.velocity_at(point.point) - a.velocity_at(point.point)).dot(point.normal);
                let contact = Contact {
                    body_a: handle_a,
                    body_b: handle_b,
                    point: point.point,
                    normal: point.normal,
                    depth: point.depth,
                    relative_normal_velocity,
                    material,
                };
                if newly_touching {
                    self.pending_events
                        .push(CollisionEvent::from_contact(&contact, self.elapsed));
                }
                contacts.push(contact);
            }
        }

        contacts
    }
}

fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
