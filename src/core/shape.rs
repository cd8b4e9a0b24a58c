use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::types::{InertiaTensorExt, MassProperties, Pose};
use crate::error::ShapeError;

/// Geometry attached to a body.
///
/// A `Plane` passes through the body origin with its normal along the body's
/// local +Y axis; rotate the body to tilt it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDescriptor {
    Plane,
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Compound { children: Vec<CompoundChild> },
}

/// Child of a compound shape, placed relative to the owning body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundChild {
    pub offset: Pose,
    pub shape: ShapeDescriptor,
}

impl CompoundChild {
    pub fn new(offset: Pose, shape: ShapeDescriptor) -> Self {
        Self { offset, shape }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Plane,
    Sphere,
    Box,
    Compound,
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

impl ShapeDescriptor {
    pub fn sphere(radius: f32) -> Self {
        ShapeDescriptor::Sphere { radius }
    }

    /// Box from its full edge lengths.
    pub fn cuboid(size: Vec3) -> Self {
        ShapeDescriptor::Box {
            half_extents: size * 0.5,
        }
    }

    pub fn compound(children: Vec<CompoundChild>) -> Self {
        ShapeDescriptor::Compound { children }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeDescriptor::Plane => ShapeKind::Plane,
            ShapeDescriptor::Sphere { .. } => ShapeKind::Sphere,
            ShapeDescriptor::Box { .. } => ShapeKind::Box,
            ShapeDescriptor::Compound { .. } => ShapeKind::Compound,
        }
    }

    pub fn is_plane(&self) -> bool {
        matches!(self, ShapeDescriptor::Plane)
    }

    /// Rejects zero, negative, or non-finite dimensions anywhere in the tree.
    pub fn validate(&self) -> Result<(), ShapeError> {
        match self {
            ShapeDescriptor::Plane => Ok(()),
            ShapeDescriptor::Sphere { radius } => {
                if radius.is_finite() && *radius > 0.0 {
                    Ok(())
                } else {
                    Err(ShapeError::InvalidRadius(*radius))
                }
            }
            ShapeDescriptor::Box { half_extents } => {
                if half_extents.is_finite() && half_extents.min_element() > 0.0 {
                    Ok(())
                } else {
                    Err(ShapeError::InvalidExtents(*half_extents))
                }
            }
            ShapeDescriptor::Compound { children } => {
                if children.is_empty() {
                    return Err(ShapeError::EmptyCompound);
                }
                for (index, child) in children.iter().enumerate() {
                    if child.shape.is_plane() {
                        return Err(ShapeError::PlaneInCompound);
                    }
                    if !child.offset.is_finite() || child.offset.rotation.length_squared() < 1e-12 {
                        return Err(ShapeError::InvalidChildOffset { index });
                    }
                    child.shape.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Solid volume, `None` for unbounded planes.
    pub fn volume(&self) -> Option<f32> {
        match self {
            ShapeDescriptor::Plane => None,
            ShapeDescriptor::Sphere { radius } => Some(4.0 / 3.0 * PI * radius.powi(3)),
            ShapeDescriptor::Box { half_extents } => {
                Some(8.0 * half_extents.x * half_extents.y * half_extents.z)
            }
            ShapeDescriptor::Compound { children } => children
                .iter()
                .map(|child| child.shape.volume())
                .sum::<Option<f32>>(),
        }
    }

    /// Mass properties for a body of `mass` made of this shape.
    ///
    /// Compound children share the mass by volume; their inertia is combined
    /// with the parallel axis theorem, ignoring child rotation.
    pub fn mass_properties(&self, mass: f32) -> MassProperties {
        if mass <= 0.0 {
            return MassProperties::immovable();
        }
        let inertia = match self {
            ShapeDescriptor::Plane => Vec3::ZERO,
            ShapeDescriptor::Sphere { radius } => Vec3::for_solid_sphere(*radius, mass),
            ShapeDescriptor::Box { half_extents } => Vec3::for_solid_box(*half_extents, mass),
            ShapeDescriptor::Compound { children } => {
                let total = self.volume().unwrap_or(0.0).max(f32::EPSILON);
                children.iter().fold(Vec3::ZERO, |acc, child| {
                    let share = child.shape.volume().unwrap_or(0.0) / total * mass;
                    let d = child.offset.position;
                    let parallel = Vec3::new(
                        d.y * d.y + d.z * d.z,
                        d.x * d.x + d.z * d.z,
                        d.x * d.x + d.y * d.y,
                    ) * share;
                    acc + child.shape.mass_properties(share).inertia + parallel
                })
            }
        };
        MassProperties { mass, inertia }
    }

    /// World-space bounds at `pose`; `None` for planes.
    pub fn aabb(&self, pose: &Pose) -> Option<Aabb> {
        match self {
            ShapeDescriptor::Plane => None,
            ShapeDescriptor::Sphere { radius } => {
                Some(Aabb::from_center(pose.position, Vec3::splat(*radius)))
            }
            ShapeDescriptor::Box { half_extents } => {
                let axes = [
                    pose.rotation * Vec3::X,
                    pose.rotation * Vec3::Y,
                    pose.rotation * Vec3::Z,
                ];
                let half = axes[0].abs() * half_extents.x
                    + axes[1].abs() * half_extents.y
                    + axes[2].abs() * half_extents.z;
                Some(Aabb::from_center(pose.position, half))
            }
            ShapeDescriptor::Compound { children } => children
                .iter()
                .filter_map(|child| child.shape.aabb(&pose.combine(&child.offset)))
                .reduce(|a, b| a.union(&b)),
        }
    }

    /// Scale applied to the unit-sized drawable representing this shape.
    pub fn proxy_scale(&self) -> Vec3 {
        match self {
            ShapeDescriptor::Sphere { radius } => Vec3::splat(*radius),
            ShapeDescriptor::Box { half_extents } => *half_extents * 2.0,
            ShapeDescriptor::Plane | ShapeDescriptor::Compound { .. } => Vec3::ONE,
        }
    }
}
