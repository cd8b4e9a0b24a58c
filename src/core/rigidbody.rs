use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{
    material::MaterialTag,
    shape::ShapeDescriptor,
    types::{MassProperties, Pose, Velocity},
};
use crate::{
    config::SleepSettings,
    utils::{allocator::typed_handle, math::world_inverse_inertia},
};

typed_handle!(
    /// Handle to a body stored in a [`PhysicsWorld`](crate::world::PhysicsWorld).
    BodyHandle
);

/// Sleep lifecycle of a dynamic body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SleepState {
    Awake,
    /// Slow since the given world time; falls asleep once the time limit passes.
    Sleepy { since: f32 },
    Sleeping,
}

/// Rigid body: shape, pose, velocity, and mass data.
///
/// A body with zero mass is static: never integrated, never moved by contacts.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub handle: BodyHandle,
    pub shape: ShapeDescriptor,
    pub material: MaterialTag,
    pub pose: Pose,
    pub velocity: Velocity,
    pub allow_sleep: bool,
    mass_properties: MassProperties,
    inverse_mass: f32,
    inverse_inertia: Vec3,
    sleep_state: SleepState,
}

impl RigidBody {
    /// Builds a body of `mass`; planes and non-positive masses are static.
    pub fn new(shape: ShapeDescriptor, mass: f32) -> Self {
        let mass_properties = if shape.is_plane() {
            MassProperties::immovable()
        } else {
            shape.mass_properties(mass)
        };
        Self {
            handle: BodyHandle::default(),
            inverse_mass: mass_properties.inverse_mass(),
            inverse_inertia: mass_properties.inverse_inertia(),
            mass_properties,
            shape,
            material: MaterialTag::DEFAULT,
            pose: Pose::default(),
            velocity: Velocity::default(),
            allow_sleep: true,
            sleep_state: SleepState::Awake,
        }
    }

    pub fn fixed(shape: ShapeDescriptor) -> Self {
        Self::new(shape, 0.0)
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Pose::new(pose.position, pose.rotation.normalize());
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation.normalize();
        self
    }

    pub fn with_material(mut self, material: MaterialTag) -> Self {
        self.material = material;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.velocity = Velocity { linear, angular };
        self
    }

    pub fn mass_properties(&self) -> MassProperties {
        self.mass_properties
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    pub fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(self.sleep_state, SleepState::Sleeping)
    }

    /// Dynamic and awake: integrated and moved by the solver.
    pub fn is_active(&self) -> bool {
        self.is_dynamic() && !self.is_sleeping()
    }

    pub fn wake_up(&mut self) {
        if self.sleep_state != SleepState::Awake {
            log::trace!("body {:?} woke up", self.handle);
        }
        self.sleep_state = SleepState::Awake;
    }

    pub fn put_to_sleep(&mut self) {
        self.sleep_state = SleepState::Sleeping;
        self.velocity = Velocity::default();
    }

    /// Inverse mass as seen by the solver; sleeping bodies behave as immovable.
    pub fn solver_inverse_mass(&self) -> f32 {
        if self.is_active() {
            self.inverse_mass
        } else {
            0.0
        }
    }

    /// World-space inverse inertia as seen by the solver.
    pub fn solver_inverse_inertia(&self) -> Mat3 {
        if self.is_active() {
            world_inverse_inertia(self.inverse_inertia, self.pose.rotation)
        } else {
            Mat3::ZERO
        }
    }

    /// Velocity of the material point at world position `point`.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(point - self.pose.position)
    }

    pub fn apply_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
        let torque = (point - self.pose.position).cross(impulse);
        self.velocity.angular += world_inverse_inertia(self.inverse_inertia, self.pose.rotation) * torque;
        self.wake_up();
    }

    /// Advances the sleep state machine at world time `now`.
    pub fn update_sleep(&mut self, now: f32, settings: &SleepSettings) {
        if !self.allow_sleep || self.is_static() {
            return;
        }
        let slow = self.velocity.speed_squared() < settings.speed_limit * settings.speed_limit;
        match self.sleep_state {
            SleepState::Awake if slow => {
                self.sleep_state = SleepState::Sleepy { since: now };
            }
            SleepState::Sleepy { .. } if !slow => {
                self.sleep_state = SleepState::Awake;
            }
            SleepState::Sleepy { since } if now - since > settings.time_limit => {
                log::trace!("body {:?} fell asleep", self.handle);
                self.put_to_sleep();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SleepSettings {
        SleepSettings {
            speed_limit: 0.1,
            time_limit: 0.5,
        }
    }

    #[test]
    fn zero_mass_is_static() {
        let body = RigidBody::new(ShapeDescriptor::sphere(1.0), 0.0);
        assert!(body.is_static());
        assert!(!body.is_active());
        assert_eq!(body.solver_inverse_mass(), 0.0);
    }

    #[test]
    fn planes_are_always_static() {
        let body = RigidBody::new(ShapeDescriptor::Plane, 5.0);
        assert!(body.is_static());
    }

    #[test]
    fn slow_body_falls_asleep_after_time_limit() {
        let mut body = RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0);
        body.update_sleep(0.0, &settings());
        assert_eq!(body.sleep_state(), SleepState::Sleepy { since: 0.0 });

        body.update_sleep(0.4, &settings());
        assert!(!body.is_sleeping());

        body.update_sleep(0.6, &settings());
        assert!(body.is_sleeping());
        assert_eq!(body.solver_inverse_mass(), 0.0);
    }

    #[test]
    fn speeding_up_cancels_sleepiness() {
        let mut body = RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0);
        body.update_sleep(0.0, &settings());
        body.velocity.linear = Vec3::X;
        body.update_sleep(0.1, &settings());
        assert_eq!(body.sleep_state(), SleepState::Awake);
    }

    #[test]
    fn impulse_wakes_sleeping_body() {
        let mut body = RigidBody::new(ShapeDescriptor::sphere(0.5), 2.0);
        body.put_to_sleep();
        body.apply_impulse(Vec3::new(0.0, 4.0, 0.0), body.pose.position);
        assert!(!body.is_sleeping());
        assert!((body.velocity.linear.y - 2.0).abs() < 1e-6);
    }
}
