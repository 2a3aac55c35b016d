//! Camera source traits and non-owning source handles.

use std::fmt;
use std::rc::{Rc, Weak};

use mixcam_core::math::Vec3;

use crate::state::BlendState;

/// Shared, owning reference to a camera source.
pub type SourceRef<S> = Rc<dyn CameraSource<S>>;

/// Identity of a source: the address of its shared allocation.
///
/// Stable for as long as any [`SourceRef`] or [`SourceHandle`] to the source
/// exists, so it can key maps of handles.
pub type SourceKey = usize;

/// An independently driven virtual camera.
///
/// Sources are owned by the host; mixers only keep [`SourceHandle`]s to them.
/// All methods take `&self`, implementations that track transitions use
/// interior mutability.
pub trait CameraSource<S: BlendState> {
    /// Display name, used in descriptions and configuration lookups.
    fn name(&self) -> &str;

    /// Whether the source currently takes part in blending.
    fn is_active_and_enabled(&self) -> bool;

    /// The source's camera state for the current frame.
    fn state(&self) -> S;

    /// Called when this source becomes the dominant output of a mixer.
    fn notify_becoming_live(
        &self,
        from: Option<&dyn CameraSource<S>>,
        world_up: Vec3,
        delta_time: f32,
    ) {
        self.on_transition_from(from, world_up, delta_time);
    }

    /// Called when the output transitions from `from` to this source.
    fn on_transition_from(
        &self,
        _from: Option<&dyn CameraSource<S>>,
        _world_up: Vec3,
        _delta_time: f32,
    ) {
    }
}

/// Supplies the raw list of child sources, typically by walking a scene.
pub trait SourceProvider<S: BlendState> {
    /// The current child sources, or `None` if the scene is not ready yet.
    fn fetch_sources(&self) -> Option<Vec<SourceRef<S>>>;

    /// Forces a fresh scan when [`fetch_sources`](Self::fetch_sources)
    /// had nothing to return.
    fn rescan_sources(&self) -> Option<Vec<SourceRef<S>>> {
        self.fetch_sources()
    }
}

/// Stage of the camera pipeline a post-processing hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// After the blended state is complete.
    Finalize,
}

/// Post-processing callback: `(owner, stage, state, delta_time)`.
pub type FinalizeHook<S> = Box<dyn Fn(&dyn CameraSource<S>, PipelineStage, &mut S, f32)>;

/// Identity of a source reference.
pub fn source_key<S: BlendState>(source: &SourceRef<S>) -> SourceKey {
    Rc::as_ptr(source).cast::<()>() as usize
}

/// Non-owning reference to a camera source.
///
/// The source may be dropped by its owner at any time; [`is_valid`](Self::is_valid)
/// and [`upgrade`](Self::upgrade) report whether it is still alive.
/// Equality is identity of the referenced source.
pub struct SourceHandle<S: BlendState> {
    inner: Weak<dyn CameraSource<S>>,
}

impl<S: BlendState> SourceHandle<S> {
    /// Creates a handle without taking ownership of `source`.
    pub fn new(source: &SourceRef<S>) -> Self {
        Self {
            inner: Rc::downgrade(source),
        }
    }

    /// Whether the referenced source is still alive.
    pub fn is_valid(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Owning reference to the source, if it is still alive.
    pub fn upgrade(&self) -> Option<SourceRef<S>> {
        self.inner.upgrade()
    }

    /// Identity of the referenced source.
    pub fn key(&self) -> SourceKey {
        self.inner.as_ptr().cast::<()>() as usize
    }

    /// Whether this handle refers to `source`.
    pub fn refers_to(&self, source: &SourceRef<S>) -> bool {
        self.key() == source_key(source)
    }

    /// Name of the source, or `"(destroyed)"`.
    pub fn name(&self) -> String {
        self.upgrade()
            .map(|s| s.name().to_owned())
            .unwrap_or_else(|| "(destroyed)".to_owned())
    }
}

impl<S: BlendState> Clone for SourceHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: BlendState> PartialEq for SourceHandle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<S: BlendState> Eq for SourceHandle<S> {}

impl<S: BlendState> From<&SourceRef<S>> for SourceHandle<S> {
    fn from(source: &SourceRef<S>) -> Self {
        Self::new(source)
    }
}

impl<S: BlendState> fmt::Debug for SourceHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("name", &self.name())
            .field("valid", &self.is_valid())
            .finish()
    }
}
