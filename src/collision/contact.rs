use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{material::ContactMaterial, rigidbody::BodyHandle};

/// Raw narrow-phase output for one touching point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub point: Vec3,
    /// Unit normal pointing from the first shape toward the second.
    pub normal: Vec3,
    pub depth: f32,
}

impl ContactPoint {
    pub(crate) fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Contact between two bodies handed to the solver.
#[derive(Debug, Clone)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    /// Relative velocity of B w.r.t. A along the normal before solving (negative = approaching).
    pub relative_normal_velocity: f32,
    pub material: ContactMaterial,
}

/// Raised when two bodies start touching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point: Vec3,
    /// Unit normal pointing from `body_a` toward `body_b`.
    pub normal: Vec3,
    pub relative_normal_velocity: f32,
    /// World time at the start of the substep that produced the event.
    pub time: f32,
}

impl CollisionEvent {
    /// Magnitude of the relative velocity along the contact normal.
    pub fn impact_strength(&self) -> f32 {
        self.relative_normal_velocity.abs()
    }

    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }

    pub(crate) fn from_contact(contact: &Contact, time: f32) -> Self {
        Self {
            body_a: contact.body_a,
            body_b: contact.body_b,
            point: contact.point,
            normal: contact.normal,
            relative_normal_velocity: contact.relative_normal_velocity,
            time,
        }
    }
}
