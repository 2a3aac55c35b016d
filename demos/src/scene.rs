//! Scene that owns the demo cameras and reports them to a mixer.

use std::cell::RefCell;
use std::rc::Rc;

use mixcam::{CameraSource, CameraState, SourceProvider, SourceRef};

use crate::orbit::OrbitCamera;

/// Owner of every camera in the demo.
///
/// Mixers only hold weak handles, so removing a camera here is enough for
/// it to drop out of every mix.
#[derive(Default)]
pub struct Scene {
    orbits: RefCell<Vec<Rc<OrbitCamera>>>,
}

impl Scene {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Adds a camera and returns a shared reference to it.
    pub fn spawn(&self, camera: OrbitCamera) -> Rc<OrbitCamera> {
        let camera = Rc::new(camera);
        self.orbits.borrow_mut().push(camera.clone());
        camera
    }

    /// Removes the first camera called `name`.
    pub fn despawn(&self, name: &str) -> Option<Rc<OrbitCamera>> {
        let mut orbits = self.orbits.borrow_mut();
        let index = orbits.iter().position(|camera| camera.name() == name)?;
        Some(orbits.remove(index))
    }

    pub fn cameras(&self) -> Vec<Rc<OrbitCamera>> {
        self.orbits.borrow().clone()
    }

    /// Moves every camera along its orbit.
    pub fn advance(&self, delta_time: f32) {
        for camera in self.orbits.borrow().iter() {
            camera.advance(delta_time);
        }
    }

    /// Provider to hand to a mixer.
    pub fn provider(self: &Rc<Self>) -> SceneProvider {
        SceneProvider(self.clone())
    }
}

/// [`SourceProvider`] view of a [`Scene`].
pub struct SceneProvider(Rc<Scene>);

impl SourceProvider<CameraState> for SceneProvider {
    fn fetch_sources(&self) -> Option<Vec<SourceRef<CameraState>>> {
        let orbits = self.0.orbits.borrow();
        if orbits.is_empty() {
            return None;
        }
        Some(
            orbits
                .iter()
                .map(|camera| camera.clone() as SourceRef<CameraState>)
                .collect(),
        )
    }
}
