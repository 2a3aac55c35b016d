//! Math type aliases and interpolation helpers.
//!
//! Camera states are blended component-wise: positions and scalar lens
//! parameters linearly, orientations spherically.

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// Unit quaternion (f32) used for camera orientations.
pub type UnitQuat = nalgebra::UnitQuaternion<f32>;

/// Weights at or below this value are treated as zero when blending.
pub const BLEND_EPSILON: f32 = 1.0e-4;

/// Below this angle (radians) two orientations are blended with `nlerp`.
const SLERP_EPSILON: f32 = 1.0e-6;

/// World up axis (+Y).
pub fn world_up() -> Vec3 {
    Vec3::y()
}

/// Linear interpolation between two scalars. `t` is not clamped.
///
/// Exact at both endpoints: `lerp_f32(a, b, 0.0) == a` and
/// `lerp_f32(a, b, 1.0) == b`.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Linear interpolation between two vectors. `t` is not clamped.
#[inline]
pub fn lerp_vec3(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Spherical interpolation between two orientations.
///
/// Falls back to normalized linear interpolation when the rotations are
/// (almost) opposite and the slerp arc is undefined.
pub fn slerp_quat(a: &UnitQuat, b: &UnitQuat, t: f32) -> UnitQuat {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    a.try_slerp(b, t, SLERP_EPSILON)
        .unwrap_or_else(|| a.nlerp(b, t))
}

/// Rotation around the world Y axis.
pub fn quat_from_rotation_y(angle: f32) -> UnitQuat {
    UnitQuat::from_axis_angle(&Vec3::y_axis(), angle)
}

/// Orientation whose -Z axis points from `eye` toward `target`.
///
/// Returns identity if `eye` and `target` coincide.
pub fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> UnitQuat {
    let dir = target - eye;
    if dir.norm_squared() <= f32::EPSILON {
        return UnitQuat::identity();
    }
    UnitQuat::face_towards(&-dir, up)
}
