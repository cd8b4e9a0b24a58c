use glam::{Mat3, Vec3};

use crate::{
    collision::contact::Contact,
    config::SolverSettings,
    core::rigidbody::{BodyHandle, RigidBody},
    utils::{allocator::Arena, math::tangent_basis},
};

/// Totals from one [`ContactSolver::solve`] call.
#[derive(Debug, Default, Clone)]
pub struct SolverStepMetrics {
    pub contacts_solved: usize,
    pub normal_impulse_sum: f32,
    pub tangent_impulse_sum: f32,
    /// Sleeping bodies pushed hard enough to wake.
    pub woken: Vec<BodyHandle>,
}

#[derive(Debug, Clone)]
struct ContactConstraint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    ra: Vec3,
    rb: Vec3,
    normal: Vec3,
    tangents: [Vec3; 2],
    normal_mass: f32,
    tangent_mass: [f32; 2],
    target_velocity: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: Mat3,
    inv_inertia_b: Mat3,
}

/// Sequential-impulse contact solver with Coulomb friction and Baumgarte bias.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    pub settings: SolverSettings,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self::new(SolverSettings::default())
    }
}

impl ContactSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Resolves `contacts` in place on `bodies`.
    ///
    /// Sleeping bodies take part as immovable; the returned metrics list those
    /// whose accumulated normal impulse would move them faster than
    /// `wake_speed`.
    pub fn solve(
        &self,
        bodies: &mut Arena<RigidBody>,
        contacts: &[Contact],
        dt: f32,
        wake_speed: f32,
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics::default();
        if contacts.is_empty() || dt <= 0.0 {
            return metrics;
        }

        let mut constraints: Vec<ContactConstraint> = contacts
            .iter()
            .filter_map(|contact| self.prepare(bodies, contact, dt))
            .collect();

        for _ in 0..self.settings.iterations.max(1) {
            for constraint in constraints.iter_mut() {
                if let Some((a, b)) = bodies.get2_mut(constraint.body_a.id(), constraint.body_b.id()) {
                    Self::solve_constraint(a, b, constraint);
                }
            }
        }

        metrics.contacts_solved = constraints.len();
        for constraint in &constraints {
            metrics.normal_impulse_sum += constraint.normal_impulse;
            metrics.tangent_impulse_sum +=
                Vec3::new(constraint.tangent_impulse[0], constraint.tangent_impulse[1], 0.0).length();
            for handle in [constraint.body_a, constraint.body_b] {
                if Self::would_wake(bodies, handle, constraint.normal_impulse, wake_speed)
                    && !metrics.woken.contains(&handle)
                {
                    metrics.woken.push(handle);
                }
            }
        }
        metrics
    }

    fn prepare(
        &self,
        bodies: &Arena<RigidBody>,
        contact: &Contact,
        dt: f32,
    ) -> Option<ContactConstraint> {
        let a = bodies.get(contact.body_a.id())?;
        let b = bodies.get(contact.body_b.id())?;

        let inv_mass_a = a.solver_inverse_mass();
        let inv_mass_b = b.solver_inverse_mass();
        if inv_mass_a == 0.0 && inv_mass_b == 0.0 {
            return None;
        }
        let inv_inertia_a = a.solver_inverse_inertia();
        let inv_inertia_b = b.solver_inverse_inertia();

        let normal = contact.normal;
        let ra = contact.point - a.pose.position;
        let rb = contact.point - b.pose.position;
        let (t1, t2) = tangent_basis(normal);

        let effective_mass = |axis: Vec3| {
            let k = inv_mass_a
                + inv_mass_b
                + ((inv_inertia_a * ra.cross(axis)).cross(ra)
                    + (inv_inertia_b * rb.cross(axis)).cross(rb))
                .dot(axis);
            if k > f32::EPSILON {
                1.0 / k
            } else {
                0.0
            }
        };

        let approach = contact.relative_normal_velocity;
        let bounce = if -approach > self.settings.restitution_threshold {
            -contact.material.restitution * approach
        } else {
            0.0
        };
        let bias = self.settings.baumgarte / dt
            * (contact.depth - self.settings.penetration_slop).max(0.0);

        Some(ContactConstraint {
            body_a: contact.body_a,
            body_b: contact.body_b,
            ra,
            rb,
            normal,
            tangents: [t1, t2],
            normal_mass: effective_mass(normal),
            tangent_mass: [effective_mass(t1), effective_mass(t2)],
            target_velocity: bounce.max(bias),
            friction: contact.material.friction,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            inv_mass_a,
            inv_mass_b,
            inv_inertia_a,
            inv_inertia_b,
        })
    }

    fn relative_velocity(a: &RigidBody, b: &RigidBody, c: &ContactConstraint) -> Vec3 {
        let va = a.velocity.linear + a.velocity.angular.cross(c.ra);
        let vb = b.velocity.linear + b.velocity.angular.cross(c.rb);
        vb - va
    }

    fn apply(a: &mut RigidBody, b: &mut RigidBody, c: &ContactConstraint, impulse: Vec3) {
        a.velocity.linear -= impulse * c.inv_mass_a;
        a.velocity.angular -= c.inv_inertia_a * c.ra.cross(impulse);
        b.velocity.linear += impulse * c.inv_mass_b;
        b.velocity.angular += c.inv_inertia_b * c.rb.cross(impulse);
    }

    fn solve_constraint(a: &mut RigidBody, b: &mut RigidBody, c: &mut ContactConstraint) {
        // Normal
        let vn = Self::relative_velocity(a, b, c).dot(c.normal);
        let lambda = c.normal_mass * (c.target_velocity - vn);
        let accumulated = (c.normal_impulse + lambda).max(0.0);
        let applied = accumulated - c.normal_impulse;
        c.normal_impulse = accumulated;
        Self::apply(a, b, c, c.normal * applied);

        // Friction, bounded by the current normal impulse
        let limit = c.friction * c.normal_impulse;
        for axis in 0..2 {
            let tangent = c.tangents[axis];
            let vt = Self::relative_velocity(a, b, c).dot(tangent);
            let lambda = -c.tangent_mass[axis] * vt;
            let accumulated = (c.tangent_impulse[axis] + lambda).clamp(-limit, limit);
            let applied = accumulated - c.tangent_impulse[axis];
            c.tangent_impulse[axis] = accumulated;
            Self::apply(a, b, c, tangent * applied);
        }
    }

    fn would_wake(bodies: &Arena<RigidBody>, handle: BodyHandle, impulse: f32, wake_speed: f32) -> bool {
        bodies.get(handle.id()).is_some_and(|body| {
            body.is_sleeping() && impulse * body.mass_properties().inverse_mass() > wake_speed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{material::ContactMaterial, shape::ShapeDescriptor};
    use approx::assert_relative_eq;

    fn head_on(restitution: f32) -> (Arena<RigidBody>, Vec<Contact>) {
        let mut bodies = Arena::new();
        let a = bodies.insert(
            RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0)
                .with_position(Vec3::new(-0.45, 0.0, 0.0))
                .with_velocity(Vec3::X * 5.0, Vec3::ZERO),
        );
        let b = bodies.insert(
            RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0)
                .with_position(Vec3::new(0.45, 0.0, 0.0))
                .with_velocity(-Vec3::X * 5.0, Vec3::ZERO),
        );
        let contact = Contact {
            body_a: BodyHandle(a),
            body_b: BodyHandle(b),
            point: Vec3::ZERO,
            normal: Vec3::X,
            depth: 0.1,
            relative_normal_velocity: -10.0,
            material: ContactMaterial {
                friction: 0.0,
                restitution,
            },
        };
        (bodies, vec![contact])
    }

    #[test]
    fn restitution_reverses_approach_velocity() {
        let (mut bodies, contacts) = head_on(0.5);
        let solver = ContactSolver::default();
        let metrics = solver.solve(&mut bodies, &contacts, 1.0 / 60.0, 0.1);

        let va = bodies.get(contacts[0].body_a.id()).expect("a").velocity.linear;
        let vb = bodies.get(contacts[0].body_b.id()).expect("b").velocity.linear;
        assert_relative_eq!((vb - va).x, 5.0, epsilon = 1e-3);
        assert_eq!(metrics.contacts_solved, 1);
        assert!(metrics.woken.is_empty());
    }

    #[test]
    fn inelastic_contact_stops_approach() {
        let (mut bodies, contacts) = head_on(0.0);
        ContactSolver::default().solve(&mut bodies, &contacts, 1.0 / 60.0, 0.1);

        let va = bodies.get(contacts[0].body_a.id()).expect("a").velocity.linear;
        let vb = bodies.get(contacts[0].body_b.id()).expect("b").velocity.linear;
        assert!((vb - va).x >= 0.0);
        assert!((vb - va).x < 2.0, "only the position bias separates them");
    }

    #[test]
    fn sleeping_body_is_immovable_but_reported_for_waking() {
        let (mut bodies, contacts) = head_on(0.0);
        let b = contacts[0].body_b.id();
        bodies.get_mut(b).expect("b").put_to_sleep();

        let metrics = ContactSolver::default().solve(&mut bodies, &contacts, 1.0 / 60.0, 0.1);

        assert_eq!(bodies.get(b).expect("b").velocity.linear, Vec3::ZERO);
        assert_eq!(metrics.woken, vec![contacts[0].body_b]);
    }

    #[test]
    fn friction_is_bounded_by_normal_impulse() {
        let mut bodies = Arena::new();
        let ground = bodies.insert(RigidBody::fixed(ShapeDescriptor::Plane));
        let slider = bodies.insert(
            RigidBody::new(ShapeDescriptor::cuboid(Vec3::ONE), 1.0)
                .with_position(Vec3::new(0.0, 0.5, 0.0))
                .with_velocity(Vec3::new(10.0, -1.0, 0.0), Vec3::ZERO),
        );
        let contact = Contact {
            body_a: BodyHandle(ground),
            body_b: BodyHandle(slider),
            point: Vec3::ZERO,
            normal: Vec3::Y,
            depth: 0.0,
            relative_normal_velocity: -1.0,
            material: ContactMaterial {
                friction: 0.1,
                restitution: 0.0,
            },
        };
        let metrics = ContactSolver::default().solve(&mut bodies, &[contact], 1.0 / 60.0, 0.1);

        assert!(metrics.tangent_impulse_sum <= 0.1 * metrics.normal_impulse_sum + 1e-4);
        let slider = bodies.get(slider).expect("slider");
        assert!(slider.velocity.linear.x > 9.0, "friction only bleeds a little speed");
    }
}
