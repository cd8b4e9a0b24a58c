//! Core types describing bodies, shapes, materials, and shared math data.

pub mod material;
pub mod rigidbody;
pub mod shape;
pub mod types;

pub use material::{ContactMaterial, ContactMaterialTable, MaterialTag};
pub use rigidbody::{BodyHandle, RigidBody, SleepState};
pub use shape::{Aabb, CompoundChild, ShapeDescriptor, ShapeKind};
pub use types::{MassProperties, Pose, Transform, Velocity};
