//! Error types surfaced by spawning, scene, audio, material, and configuration APIs.

use glam::Vec3;
use thiserror::Error;

/// Rejections raised while validating a shape descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("sphere radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("box half extents must be positive and finite, got {0:?}")]
    InvalidExtents(Vec3),
    #[error("planes cannot be nested inside a compound shape")]
    PlaneInCompound,
    #[error("compound shape has no children")]
    EmptyCompound,
    #[error("compound child {index} has a non-finite offset")]
    InvalidChildOffset { index: usize },
}

/// Errors produced by a [`SceneGraph`](crate::scene::SceneGraph) implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("scene is full ({0} proxies)")]
    CapacityExceeded(usize),
    #[error("proxy rejected: {0}")]
    Rejected(String),
}

/// Reasons a spawn request was refused. A refused spawn leaves the world,
/// the scene, and the registry exactly as they were.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("mass must be finite and non-negative, got {0}")]
    InvalidMass(f32),
    #[error("density must be positive and finite, got {0}")]
    InvalidDensity(f32),
    #[error("planes are unbounded and can only be static")]
    DynamicPlane,
    #[error("initial pose is not finite")]
    InvalidPose,
    #[error("initial velocity is not finite")]
    InvalidVelocity,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Audio feedback failures. Always logged and dropped, never propagated into the loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("audio asset '{0}' is not loaded")]
    AssetMissing(String),
    #[error("audio device busy, trigger dropped")]
    DeviceBusy,
    #[error("audio device unavailable")]
    DeviceUnavailable,
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Invalid contact material coefficients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterialError {
    #[error("friction must be finite and non-negative, got {0}")]
    InvalidFriction(f32),
    #[error("restitution must lie in [0, 1], got {0}")]
    InvalidRestitution(f32),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Material(#[from] MaterialError),
}
