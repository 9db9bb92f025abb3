//! Video frames and the shared latest-frame buffer.
//!
//! This module provides:
//! - The `Frame` type (RGB, 8 bits per channel)
//! - `FrameBuffer`, the single-slot buffer between the video source and detection
//! - `ReplaySource`, a still-image feed for running without a capture device

pub mod buffer;
pub mod replay;

pub use buffer::{FrameBuffer, FrameSource};
pub use replay::ReplaySource;

/// One captured video frame with channels in R, G, B order.
pub type Frame = image::RgbImage;
