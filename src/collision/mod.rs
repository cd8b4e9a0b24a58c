//! Collision detection modules: broad-phase, narrow-phase, and contact data.

pub mod broadphase;
pub mod contact;
pub mod narrowphase;

pub use broadphase::{BroadPhase, BroadPhaseKind, BroadPhaseProxy, SpatialGrid};
pub use contact::{CollisionEvent, Contact, ContactPoint};
pub use narrowphase::{NarrowPhase, SATAlgorithm};
