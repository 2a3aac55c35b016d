//! # mixcam core
//!
//! Math and profiling utilities shared by the camera-mixing crates.

pub mod math;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
