//! # mixcam
//!
//! Blends several independently driven virtual cameras into one camera state
//! per frame, using per-source weights, and reports the dominant source.
//!
//! ## Pieces
//!
//! - [`WeightTable`] - ordered `(source, weight)` rows, lookups by position or
//!   by source identity
//! - [`LiveCache`] - lazily rebuilt list of live sources; prunes rows whose
//!   source was dropped
//! - [`MixingCamera`] - owns both and runs the per-frame weighted blend
//! - [`CameraSource`] / [`SourceProvider`] - what the host implements
//! - [`CameraState`] - a ready-made blendable camera pose and lens
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use mixcam::{CameraSource, MixingCamera, SourceRef};
//! use mixcam::math::Vec3;
//!
//! struct Fixed(&'static str, f32);
//!
//! impl CameraSource<f32> for Fixed {
//!     fn name(&self) -> &str { self.0 }
//!     fn is_active_and_enabled(&self) -> bool { true }
//!     fn state(&self) -> f32 { self.1 }
//! }
//!
//! let wide: SourceRef<f32> = Rc::new(Fixed("wide", 0.0));
//! let close: SourceRef<f32> = Rc::new(Fixed("close", 4.0));
//!
//! let mixer = MixingCamera::<f32>::new("mix");
//! mixer.add_source(&wide, 1.0);
//! mixer.add_source(&close, 3.0);
//!
//! let result = mixer.update(Vec3::y(), 1.0 / 60.0);
//! assert_eq!(result.state, 3.0);
//! assert_eq!(mixer.description(), "[close 75%]");
//! ```

pub mod cache;
pub mod error;
pub mod mixer;
pub mod settings;
pub mod source;
pub mod state;
pub mod weights;

pub use mixcam_core::math;

pub use cache::{CacheState, LiveCache};
pub use error::{ConfigError, MixError};
pub use mixer::{BlendResult, MixingCamera};
pub use settings::{
    MixerConfig, MixerSettings, PresetWeight, load_config, load_or_default, parse_config,
};
pub use source::{
    CameraSource, FinalizeHook, PipelineStage, SourceHandle, SourceKey, SourceProvider, SourceRef,
};
pub use state::{BlendState, CameraState};
pub use weights::{WeightEntry, WeightTable};
