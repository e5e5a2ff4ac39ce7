//! Interpolation helpers.
//!
//! Translation and scale blend component-wise; rotations are Euler angles
//! (radians, applied X then Y then Z) blended through quaternion SLERP with
//! shortest-arc sign correction.

pub mod functions;

pub use functions::{euler_to_quat, lerp_f64, lerp_vec3, quat_to_euler, slerp_euler, Vec3};
