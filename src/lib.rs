//! GamePRo automation engine.
//!
//! Drives a button-press emulator against a captured video feed and an
//! analog light sensor, looking for rare visual events. Routines are built
//! from a small core: the latest-frame buffer, region detection with
//! timeout and cancellation, an operator calibration handshake, and a
//! background runtime with cooperative cancellation.

pub mod calibration;
pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod paths;
pub mod routines;
pub mod runtime;
