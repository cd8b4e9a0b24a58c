use glam::Vec3;

use super::contact::ContactPoint;
use crate::core::{shape::ShapeDescriptor, types::Pose};

const CORNER_SIGNS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

fn box_corners(pose: &Pose, half_extents: Vec3) -> [Vec3; 8] {
    CORNER_SIGNS.map(|sign| pose.transform_point(sign * half_extents))
}

fn box_axes(pose: &Pose) -> [Vec3; 3] {
    [
        pose.rotation * Vec3::X,
        pose.rotation * Vec3::Y,
        pose.rotation * Vec3::Z,
    ]
}

/// Separating axis theorem for oriented box pairs.
pub struct SATAlgorithm;

impl SATAlgorithm {
    const CORNER_TOLERANCE: f32 = 1e-3;

    /// Returns the axis of least overlap (pointing from A to B) and the overlap depth.
    pub fn separating_axis(
        half_extents_a: Vec3,
        pose_a: &Pose,
        half_extents_b: Vec3,
        pose_b: &Pose,
    ) -> Option<(Vec3, f32)> {
        let relative_pos = pose_b.position - pose_a.position;
        let axes_a = box_axes(pose_a);
        let axes_b = box_axes(pose_b);

        let mut test_axes = Vec::with_capacity(15);
        test_axes.extend_from_slice(&axes_a);
        test_axes.extend_from_slice(&axes_b);

        for axis_a in &axes_a {
            for axis_b in &axes_b {
                let axis = axis_a.cross(*axis_b);
                if axis.length_squared() > 1e-6 {
                    test_axes.push(axis.normalize());
                }
            }
        }

        let mut min_overlap = f32::MAX;
        let mut min_axis = Vec3::ZERO;

        for axis in test_axes {
            let extent_a = (axes_a[0].dot(axis).abs() * half_extents_a.x)
                + (axes_a[1].dot(axis).abs() * half_extents_a.y)
                + (axes_a[2].dot(axis).abs() * half_extents_a.z);

            let extent_b = (axes_b[0].dot(axis).abs() * half_extents_b.x)
                + (axes_b[1].dot(axis).abs() * half_extents_b.y)
                + (axes_b[2].dot(axis).abs() * half_extents_b.z);

            let projection = relative_pos.dot(axis);
            let overlap = (extent_a + extent_b) - projection.abs();

            if overlap <= 0.0 {
                return None;
            }

            if overlap < min_overlap {
                min_overlap = overlap;
                min_axis = if projection < 0.0 { -axis } else { axis };
            }
        }

        Some((min_axis.normalize_or_zero(), min_overlap))
    }

    /// Box-box contacts: corners of either box found inside the other, or the
    /// midpoint between the deepest supports for edge-edge cases.
    pub fn intersect_boxes(
        half_extents_a: Vec3,
        pose_a: &Pose,
        half_extents_b: Vec3,
        pose_b: &Pose,
        out: &mut Vec<ContactPoint>,
    ) {
        let Some((normal, depth)) =
            Self::separating_axis(half_extents_a, pose_a, half_extents_b, pose_b)
        else {
            return;
        };

        let reach_a = Self::support(pose_a, half_extents_a, normal).dot(normal);
        let reach_b = Self::support(pose_b, half_extents_b, -normal).dot(normal);
        let start = out.len();

        for corner in box_corners(pose_b, half_extents_b) {
            if Self::contains(pose_a, half_extents_a, corner) {
                let corner_depth = (reach_a - corner.dot(normal)).clamp(0.0, depth);
                out.push(ContactPoint {
                    point: corner,
                    normal,
                    depth: corner_depth,
                });
            }
        }
        for corner in box_corners(pose_a, half_extents_a) {
            if Self::contains(pose_b, half_extents_b, corner) {
                let corner_depth = (corner.dot(normal) - reach_b).clamp(0.0, depth);
                out.push(ContactPoint {
                    point: corner,
                    normal,
                    depth: corner_depth,
                });
            }
        }

        if out.len() == start {
            let point = Self::support(pose_a, half_extents_a, normal) - normal * depth * 0.5;
            out.push(ContactPoint {
                point,
                normal,
                depth,
            });
        }
    }

    fn support(pose: &Pose, half_extents: Vec3, direction: Vec3) -> Vec3 {
        let dir_local = pose.rotation.conjugate() * direction;
        let local = Vec3::new(
            half_extents.x.copysign(dir_local.x),
            half_extents.y.copysign(dir_local.y),
            half_extents.z.copysign(dir_local.z),
        );
        pose.transform_point(local)
    }

    fn contains(pose: &Pose, half_extents: Vec3, point: Vec3) -> bool {
        let local = pose.inverse_transform_point(point);
        local
            .abs()
            .cmple(half_extents + Vec3::splat(Self::CORNER_TOLERANCE))
            .all()
    }
}

/// Exact contact generation between two posed shapes.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Appends contacts between `a` and `b` to `out`; normals point from `a` to `b`.
    pub fn collide(
        shape_a: &ShapeDescriptor,
        pose_a: &Pose,
        shape_b: &ShapeDescriptor,
        pose_b: &Pose,
        out: &mut Vec<ContactPoint>,
    ) {
        use ShapeDescriptor::*;

        match (shape_a, shape_b) {
            (Compound { children }, _) => {
                for child in children {
                    Self::collide(&child.shape, &pose_a.combine(&child.offset), shape_b, pose_b, out);
                }
            }
            (_, Compound { children }) => {
                for child in children {
                    Self::collide(shape_a, pose_a, &child.shape, &pose_b.combine(&child.offset), out);
                }
            }
            (Plane, Plane) => {}
            (Sphere { radius: ra }, Sphere { radius: rb }) => {
                Self::sphere_sphere(pose_a.position, *ra, pose_b.position, *rb, out)
            }
            (Plane, Sphere { radius }) => Self::plane_sphere(pose_a, pose_b.position, *radius, out),
            (Sphere { radius }, Plane) => Self::flipped(out, |out| {
                Self::plane_sphere(pose_b, pose_a.position, *radius, out)
            }),
            (Plane, Box { half_extents }) => Self::plane_box(pose_a, pose_b, *half_extents, out),
            (Box { half_extents }, Plane) => Self::flipped(out, |out| {
                Self::plane_box(pose_b, pose_a, *half_extents, out)
            }),
            (Box { half_extents }, Sphere { radius }) => {
                Self::box_sphere(pose_a, *half_extents, pose_b.position, *radius, out)
            }
            (Sphere { radius }, Box { half_extents }) => Self::flipped(out, |out| {
                Self::box_sphere(pose_b, *half_extents, pose_a.position, *radius, out)
            }),
            (Box { half_extents: ha }, Box { half_extents: hb }) => {
                SATAlgorithm::intersect_boxes(*ha, pose_a, *hb, pose_b, out)
            }
        }
    }

    fn flipped(out: &mut Vec<ContactPoint>, generate: impl FnOnce(&mut Vec<ContactPoint>)) {
        let start = out.len();
        generate(out);
        for contact in &mut out[start..] {
            *contact = contact.flipped();
        }
    }

    fn sphere_sphere(
        center_a: Vec3,
        radius_a: f32,
        center_b: Vec3,
        radius_b: f32,
        out: &mut Vec<ContactPoint>,
    ) {
        let delta = center_b - center_a;
        let distance = delta.length();
        let depth = radius_a + radius_b - distance;
        if depth <= 0.0 {
            return;
        }
        let normal = if distance > 1e-6 { delta / distance } else { Vec3::Y };
        out.push(ContactPoint {
            point: center_a + normal * (radius_a - depth * 0.5),
            normal,
            depth,
        });
    }

    fn plane_sphere(plane: &Pose, center: Vec3, radius: f32, out: &mut Vec<ContactPoint>) {
        let normal = plane.rotation * Vec3::Y;
        let distance = (center - plane.position).dot(normal);
        let depth = radius - distance;
        if depth <= 0.0 {
            return;
        }
        out.push(ContactPoint {
            point: center - normal * radius,
            normal,
            depth,
        });
    }

    fn plane_box(plane: &Pose, pose: &Pose, half_extents: Vec3, out: &mut Vec<ContactPoint>) {
        let normal = plane.rotation * Vec3::Y;
        for corner in box_corners(pose, half_extents) {
            let distance = (corner - plane.position).dot(normal);
            if distance < 0.0 {
                out.push(ContactPoint {
                    point: corner,
                    normal,
                    depth: -distance,
                });
            }
        }
    }

    fn box_sphere(
        pose: &Pose,
        half_extents: Vec3,
        center: Vec3,
        radius: f32,
        out: &mut Vec<ContactPoint>,
    ) {
        let local = pose.inverse_transform_point(center);
        let clamped = local.clamp(-half_extents, half_extents);

        if clamped == local {
            // Center inside the box: push out through the nearest face.
            let gaps = half_extents - local.abs();
            let (axis, gap) = if gaps.x <= gaps.y && gaps.x <= gaps.z {
                (Vec3::X, gaps.x)
            } else if gaps.y <= gaps.z {
                (Vec3::Y, gaps.y)
            } else {
                (Vec3::Z, gaps.z)
            };
            let sign = if local.dot(axis) < 0.0 { -1.0 } else { 1.0 };
            let normal = pose.rotation * (axis * sign);
            let surface = local + axis * sign * gap;
            out.push(ContactPoint {
                point: pose.transform_point(surface),
                normal,
                depth: radius + gap,
            });
            return;
        }

        let closest = pose.transform_point(clamped);
        let delta = center - closest;
        let distance = delta.length();
        if distance >= radius {
            return;
        }
        let normal = if distance > 1e-6 {
            delta / distance
        } else {
            (center - pose.position).normalize_or_zero()
        };
        out.push(ContactPoint {
            point: closest,
            normal,
            depth: radius - distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::CompoundChild;
    use glam::Quat;

    fn collide(
        a: &ShapeDescriptor,
        pa: Pose,
        b: &ShapeDescriptor,
        pb: Pose,
    ) -> Vec<ContactPoint> {
        let mut out = Vec::new();
        NarrowPhase::collide(a, &pa, b, &pb, &mut out);
        out
    }

    #[test]
    fn overlapping_spheres_report_depth_and_normal() {
        let contacts = collide(
            &ShapeDescriptor::sphere(1.0),
            Pose::default(),
            &ShapeDescriptor::sphere(1.0),
            Pose::from_position(Vec3::new(1.5, 0.0, 0.0)),
        );
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].depth - 0.5).abs() < 1e-5);
        assert!((contacts[0].normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn separated_spheres_do_not_touch() {
        let contacts = collide(
            &ShapeDescriptor::sphere(0.5),
            Pose::default(),
            &ShapeDescriptor::sphere(0.5),
            Pose::from_position(Vec3::new(2.0, 0.0, 0.0)),
        );
        assert!(contacts.is_empty());
    }

    #[test]
    fn sphere_below_plane_surface_pushes_along_plane_normal() {
        let contacts = collide(
            &ShapeDescriptor::sphere(1.0),
            Pose::from_position(Vec3::new(0.0, 0.9, 0.0)),
            &ShapeDescriptor::Plane,
            Pose::default(),
        );
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].normal + Vec3::Y).length() < 1e-5, "normal points sphere -> plane");
        assert!((contacts[0].depth - 0.1).abs() < 1e-5);
    }

    #[test]
    fn tilted_plane_uses_rotated_normal() {
        let plane = Pose::new(Vec3::ZERO, Quat::from_rotation_z(0.3));
        let contacts = collide(
            &ShapeDescriptor::Plane,
            plane,
            &ShapeDescriptor::sphere(1.0),
            Pose::from_position(Vec3::new(0.0, 0.5, 0.0)),
        );
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].normal - plane.rotation * Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn resting_box_touches_plane_at_four_corners() {
        let contacts = collide(
            &ShapeDescriptor::Plane,
            Pose::default(),
            &ShapeDescriptor::cuboid(Vec3::ONE),
            Pose::from_position(Vec3::new(0.0, 0.49, 0.0)),
        );
        assert_eq!(contacts.len(), 4);
        assert!(contacts.iter().all(|c| (c.depth - 0.01).abs() < 1e-4));
    }

    #[test]
    fn sphere_touching_box_face() {
        let contacts = collide(
            &ShapeDescriptor::cuboid(Vec3::splat(2.0)),
            Pose::default(),
            &ShapeDescriptor::sphere(0.5),
            Pose::from_position(Vec3::new(0.0, 1.4, 0.0)),
        );
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].normal - Vec3::Y).length() < 1e-5);
        assert!((contacts[0].depth - 0.1).abs() < 1e-4);
    }

    #[test]
    fn stacked_boxes_produce_face_contacts() {
        let contacts = collide(
            &ShapeDescriptor::cuboid(Vec3::ONE),
            Pose::default(),
            &ShapeDescriptor::cuboid(Vec3::ONE),
            Pose::from_position(Vec3::new(0.0, 0.95, 0.0)),
        );
        assert!(!contacts.is_empty());
        assert!(contacts.iter().all(|c| (c.normal - Vec3::Y).length() < 1e-4));
        assert!(contacts.iter().all(|c| c.depth <= 0.05 + 1e-4));
    }

    #[test]
    fn compound_children_collide_individually() {
        let dumbbell = ShapeDescriptor::compound(vec![
            CompoundChild::new(
                Pose::from_position(Vec3::new(-1.0, 0.0, 0.0)),
                ShapeDescriptor::sphere(0.5),
            ),
            CompoundChild::new(
                Pose::from_position(Vec3::new(1.0, 0.0, 0.0)),
                ShapeDescriptor::sphere(0.5),
            ),
        ]);
        let contacts = collide(
            &ShapeDescriptor::Plane,
            Pose::default(),
            &dumbbell,
            Pose::from_position(Vec3::new(0.0, 0.4, 0.0)),
        );
        assert_eq!(contacts.len(), 2);
    }
}
