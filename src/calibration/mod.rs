//! Calibration: operator-drawn regions and their persisted baselines.
//!
//! This module provides:
//! - The requester/desk rendezvous a routine uses to ask the operator for a region
//! - `CalibrationRecord`, the regions + baselines + tolerance of one routine
//! - `CalibrationStore`, JSON persistence of records keyed by routine

pub mod record;
pub mod rendezvous;
pub mod store;

pub use record::{CalibrationRecord, Deviation, DEFAULT_TOLERANCE};
pub use rendezvous::{calibration_channel, CalibrationDesk, CalibrationRequester};
pub use store::{CalibrationStore, StoredCalibration};
