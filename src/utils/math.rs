//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Rotates a diagonal body-space inverse inertia into world space.
pub fn world_inverse_inertia(local_inverse: Vec3, rotation: Quat) -> Mat3 {
    let r = Mat3::from_quat(rotation);
    r * Mat3::from_diagonal(local_inverse) * r.transpose()
}

/// Two unit vectors spanning the plane orthogonal to `normal`.
pub fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let helper = if normal.x.abs() < 0.57 { Vec3::X } else { Vec3::Y };
    let t1 = normal.cross(helper).normalize_or_zero();
    let t2 = normal.cross(t1);
    (t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangent_basis_is_orthonormal() {
        for normal in [Vec3::Y, Vec3::X, Vec3::new(1.0, 2.0, -3.0).normalize()] {
            let (t1, t2) = tangent_basis(normal);
            assert!(t1.dot(normal).abs() < 1e-5);
            assert!(t2.dot(normal).abs() < 1e-5);
            assert!(t1.dot(t2).abs() < 1e-5);
            assert!((t1.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_angular_velocity_is_identity() {
        assert_eq!(angular_velocity_to_quat(Vec3::ZERO, 0.1), Quat::IDENTITY);
    }
}
