//! Affine transforms for joint hierarchies and skinning, on `glam::DMat4`.
//!
//! Column vectors: `p' = M * p`. Rotations use the Euler convention of
//! [`crate::interp`].

use glam::{DMat4, DVec3};

use crate::interp::{euler_to_quat, quat_to_euler, Vec3};

/// `T * R * S`.
pub fn from_trs(trans: Vec3, rot: Vec3, scale: Vec3) -> DMat4 {
    DMat4::from_scale_rotation_translation(
        DVec3::from_array(scale),
        euler_to_quat(rot),
        DVec3::from_array(trans),
    )
}

#[inline]
pub fn transform_point(m: &DMat4, p: Vec3) -> Vec3 {
    m.transform_point3(DVec3::from_array(p)).to_array()
}

/// Inverse of an affine matrix; a singular linear part yields identity.
pub fn inverse_affine(m: &DMat4) -> DMat4 {
    if m.determinant().abs() < f64::EPSILON {
        return DMat4::IDENTITY;
    }
    m.inverse()
}

/// Translation, Euler rotation and scale of an affine matrix.
pub fn decompose(m: &DMat4) -> (Vec3, Vec3, Vec3) {
    if m.determinant().abs() < f64::EPSILON {
        return (m.w_axis.truncate().to_array(), [0.0; 3], [0.0; 3]);
    }
    let (scale, rot, trans) = m.to_scale_rotation_translation();
    (trans.to_array(), quat_to_euler(rot), scale.to_array())
}

#[inline]
pub fn translation(m: &DMat4) -> Vec3 {
    m.w_axis.truncate().to_array()
}
