use glam::Vec3;

use crate::{
    core::rigidbody::RigidBody,
    utils::{allocator::Arena, math::angular_velocity_to_quat},
};

/// Semi-implicit Euler integrator: velocities first, poses after the solver.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    parallel: bool,
}

impl Integrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn integrate_velocity(
        body: &mut RigidBody,
        gravity: Vec3,
        linear_damping: f32,
        angular_damping: f32,
        dt: f32,
    ) {
        if !body.is_active() {
            return;
        }

        body.velocity.linear += gravity * dt;
        body.velocity.linear *= (1.0 - linear_damping).powf(dt);
        body.velocity.angular *= (1.0 - angular_damping).powf(dt);
    }

    pub fn integrate_position(body: &mut RigidBody, dt: f32) {
        if !body.is_active() {
            return;
        }

        body.pose.position += body.velocity.linear * dt;
        let delta = angular_velocity_to_quat(body.velocity.angular, dt);
        body.pose.rotation = (delta * body.pose.rotation).normalize();
    }

    pub fn integrate_velocities(
        &self,
        bodies: &mut Arena<RigidBody>,
        gravity: Vec3,
        linear_damping: f32,
        angular_damping: f32,
        dt: f32,
    ) {
        self.for_each_body(bodies, |body| {
            Self::integrate_velocity(body, gravity, linear_damping, angular_damping, dt)
        });
    }

    pub fn integrate_positions(&self, bodies: &mut Arena<RigidBody>, dt: f32) {
        self.for_each_body(bodies, |body| Self::integrate_position(body, dt));
    }

    #[cfg(feature = "parallel")]
    fn for_each_body<F>(&self, bodies: &mut Arena<RigidBody>, op: F)
    where
        F: Fn(&mut RigidBody) + Send + Sync,
    {
        if self.parallel {
            use rayon::prelude::*;
            bodies.par_iter_mut().for_each(op);
        } else {
            bodies.iter_mut().for_each(op);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn for_each_body<F>(&self, bodies: &mut Arena<RigidBody>, op: F)
    where
        F: Fn(&mut RigidBody),
    {
        bodies.iter_mut().for_each(op);
    }
}
