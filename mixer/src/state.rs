use mixcam_core::math::{UnitQuat, Vec3, lerp_f32, lerp_vec3, slerp_quat};

/// A value that can be blended between two camera sources.
///
/// Implementations must be exact at the endpoints:
/// `interpolate(a, b, 0.0) == a` and `interpolate(a, b, 1.0) == b`.
pub trait BlendState: Clone {
    /// Affine blend of `a` toward `b` by `t`.
    fn interpolate(a: &Self, b: &Self, t: f32) -> Self;
}

impl BlendState for f32 {
    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        lerp_f32(*a, *b, t)
    }
}

impl BlendState for Vec3 {
    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        lerp_vec3(a, b, t)
    }
}

/// Pose and lens of a virtual camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: UnitQuat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near clip plane distance.
    pub near_clip: f32,
    /// Far clip plane distance.
    pub far_clip: f32,
}

impl CameraState {
    /// Default lens: 60 degree vertical field of view.
    pub const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_3;

    /// Camera at `position` with `orientation` and the default lens.
    pub fn new(position: Vec3, orientation: UnitQuat) -> Self {
        Self {
            position,
            orientation,
            ..Self::default()
        }
    }

    /// Returns this state with a different vertical field of view.
    #[must_use]
    pub fn with_fov_y(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    /// Returns this state with different clip planes.
    #[must_use]
    pub fn with_clip_planes(mut self, near_clip: f32, far_clip: f32) -> Self {
        self.near_clip = near_clip;
        self.far_clip = far_clip;
        self
    }

    /// Direction the camera looks along (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.orientation * -Vec3::z()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: UnitQuat::identity(),
            fov_y: Self::DEFAULT_FOV_Y,
            near_clip: 0.1,
            far_clip: 1000.0,
        }
    }
}

impl BlendState for CameraState {
    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            position: lerp_vec3(&a.position, &b.position, t),
            orientation: slerp_quat(&a.orientation, &b.orientation, t),
            fov_y: lerp_f32(a.fov_y, b.fov_y, t),
            near_clip: lerp_f32(a.near_clip, b.near_clip, t),
            far_clip: lerp_f32(a.far_clip, b.far_clip, t),
        }
    }
}
