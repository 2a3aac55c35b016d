//! # Mixer demos
//!
//! Small scene pieces used by the demo binaries.
//!
//! ## Available Demos
//!
//! - `mix_demo` - cross-fades a set of orbiting cameras through a
//!   [`MixingCamera`](mixcam::MixingCamera) and logs the dominant source

pub mod orbit;
pub mod scene;

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
