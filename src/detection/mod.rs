//! Visual and analog event detection.
//!
//! This module provides:
//! - Region sampling: average colour and pixel-class matching
//! - `poll_until`, the timeout/cancel aware polling loop over the latest frame
//! - Step-change analysis over sampled sensor readings

pub mod colour;
pub mod poll;
pub mod step;

pub use colour::{
    average_colour, count_matching, count_of_class, fraction_matching, fraction_of_class,
    ColourSample, PixelClass, Region,
};
pub use poll::{poll_until, DetectionOutcome, Evidence};
pub use step::{classify_step, sample_series, step_change};
