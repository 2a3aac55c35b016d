//! Orbit cameras used as mixer sources.

use std::cell::Cell;
use std::f32::consts::PI;

use mixcam::{CameraSource, CameraState};
use mixcam_core::math::{Vec3, look_at, world_up};

/// Camera circling a target point at a fixed distance and elevation.
///
/// The azimuth advances with [`advance`](Self::advance); state is derived
/// from it on demand, so the camera can be shared through an `Rc`.
pub struct OrbitCamera {
    name: String,
    /// Point the camera circles and looks at.
    pub target: Vec3,
    /// Orbit radius.
    pub distance: f32,
    /// Angle above the horizontal plane, in radians.
    pub elevation: f32,
    /// Radians per second.
    pub angular_speed: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    azimuth: Cell<f32>,
    enabled: Cell<bool>,
    activations: Cell<u32>,
}

impl OrbitCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Vec3::zeros(),
            distance: 8.0,
            elevation: 0.4,
            angular_speed: 0.5,
            fov_y: CameraState::DEFAULT_FOV_Y,
            azimuth: Cell::new(0.0),
            enabled: Cell::new(true),
            activations: Cell::new(0),
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation.clamp(-PI / 2.0 + 0.1, PI / 2.0 - 0.1);
        self
    }

    pub fn with_angular_speed(mut self, angular_speed: f32) -> Self {
        self.angular_speed = angular_speed;
        self
    }

    pub fn with_fov_y(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth.get()
    }

    /// Moves the camera along its orbit.
    pub fn advance(&self, delta_time: f32) {
        let azimuth = (self.azimuth.get() + self.angular_speed * delta_time) % (2.0 * PI);
        self.azimuth.set(azimuth);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// How many times the camera became the mixer's dominant source.
    pub fn activations(&self) -> u32 {
        self.activations.get()
    }

    pub fn position(&self) -> Vec3 {
        let azimuth = self.azimuth.get();
        let x = self.distance * self.elevation.cos() * azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }
}

impl CameraSource<CameraState> for OrbitCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active_and_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn state(&self) -> CameraState {
        let eye = self.position();
        CameraState::new(eye, look_at(&eye, &self.target, &world_up())).with_fov_y(self.fov_y)
    }

    fn on_transition_from(
        &self,
        from: Option<&dyn CameraSource<CameraState>>,
        _world_up: Vec3,
        _delta_time: f32,
    ) {
        self.activations.set(self.activations.get() + 1);
        log::debug!(
            "{} is live (was {})",
            self.name,
            from.map_or("(none)", |source| source.name())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_keeps_distance_to_target() {
        let camera = OrbitCamera::new("orbit").with_distance(5.0);
        for _ in 0..10 {
            camera.advance(0.3);
            let offset = camera.position() - camera.target;
            assert!((offset.norm() - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn state_looks_at_target() {
        let camera = OrbitCamera::new("orbit").with_elevation(0.0);
        let state = camera.state();
        let to_target = (camera.target - state.position).normalize();
        assert!((state.forward() - to_target).norm() < 1e-4);
    }

    #[test]
    fn elevation_is_clamped_short_of_the_poles() {
        let camera = OrbitCamera::new("orbit").with_elevation(PI);
        assert!(camera.elevation < PI / 2.0);
    }
}
