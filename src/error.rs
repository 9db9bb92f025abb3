//! Error types for the automation engine.
//!
//! Library primitives return these typed errors; routine bodies and the
//! binary wrap them in `anyhow` at the outer layer.

use std::path::PathBuf;
use thiserror::Error;

use crate::detection::Region;

/// Failures raised by frame sampling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("region {region} exceeds frame bounds {frame_width}x{frame_height}")]
    InvalidRegion {
        region: Region,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("region {region} has no pixels")]
    EmptyRegion { region: Region },
}

/// Failures from the calibration rendezvous and store.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("no calibration request is waiting for a region")]
    NoPendingRequest,

    #[error("region {0} has no pixels")]
    EmptyRegion(Region),

    #[error("invalid calibration key '{0}'")]
    InvalidKey(String),

    #[error("failed to write calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize calibration record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures talking to the button/sensor hardware.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("hardware command '{command}' failed: {message}")]
    Command { command: String, message: String },

    #[error("hardware device disconnected")]
    Disconnected,
}

/// Failures starting a routine.
#[derive(Error, Debug, PartialEq)]
pub enum RuntimeError {
    #[error("this runtime has already been started")]
    AlreadyStarted,

    #[error("the hardware session is already in use by another routine")]
    HardwareBusy,
}
