//! Interpolation primitives:
//! - lerp_f64 / lerp_vec3 (component-wise)
//! - euler_to_quat / quat_to_euler (R = Rz * Ry * Rx)
//! - slerp_euler (Euler in, Euler out, through `DQuat::slerp`)

use glam::{DQuat, EulerRot};

/// Three components, used for translation, Euler rotation, scale and vertex coordinates.
pub type Vec3 = [f64; 3];

#[inline]
pub fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    [
        lerp_f64(a[0], b[0], t),
        lerp_f64(a[1], b[1], t),
        lerp_f64(a[2], b[2], t),
    ]
}

/// Quaternion for Euler angles applied X, then Y, then Z.
#[inline]
pub fn euler_to_quat(e: Vec3) -> DQuat {
    DQuat::from_euler(EulerRot::ZYX, e[2], e[1], e[0])
}

/// Inverse of [`euler_to_quat`].
#[inline]
pub fn quat_to_euler(q: DQuat) -> Vec3 {
    let (z, y, x) = q.normalize().to_euler(EulerRot::ZYX);
    [x, y, z]
}

/// Rotation blend between two Euler orientations. `DQuat::slerp` flips the
/// end quaternion when the two are more than 90 degrees apart in 4D.
pub fn slerp_euler(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    quat_to_euler(euler_to_quat(a).slerp(euler_to_quat(b), t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn approx(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn euler_round_trip() {
        let e = [0.3, -0.4, 1.1];
        let back = quat_to_euler(euler_to_quat(e));
        for i in 0..3 {
            approx(back[i], e[i], 1e-9);
        }
    }

    #[test]
    fn euler_applies_x_then_z() {
        let q = euler_to_quat([FRAC_PI_2, 0.0, FRAC_PI_2]);
        let v = q * glam::DVec3::Z;
        approx(v.x, 1.0, 1e-12);
        approx(v.y, 0.0, 1e-12);
        approx(v.z, 0.0, 1e-12);
    }

    #[test]
    fn slerp_single_axis_halfway() {
        let r = slerp_euler([0.0, 0.0, 0.0], [0.0, 0.0, FRAC_PI_2], 0.5);
        approx(r[0], 0.0, 1e-9);
        approx(r[1], 0.0, 1e-9);
        approx(r[2], FRAC_PI_4, 1e-9);
    }

    #[test]
    fn slerp_takes_shortest_arc() {
        // 170 degrees to -170 degrees about Z passes through 180, not 0.
        let a = [0.0, 0.0, 170f64.to_radians()];
        let b = [0.0, 0.0, -170f64.to_radians()];
        let r = slerp_euler(a, b, 0.5);
        approx(r[2].abs(), PI, 1e-9);
    }

    #[test]
    fn lerp_components() {
        assert_eq!(lerp_vec3([0.0, 2.0, 4.0], [10.0, 2.0, 0.0], 0.25), [2.5, 2.0, 3.0]);
    }
}
