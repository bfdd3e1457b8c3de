//! moodtune-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access, RGB frame conversion and the
//! [`FrameSource`] boundary the detection loop reads frames through.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::Frame;
