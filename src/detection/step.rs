//! Step-change analysis over a sampled series of scalar readings.
//!
//! Used with the light sensor: a sustained brightness shift between the
//! first and second half of the window marks the rare event, while a single
//! outlier is damped by averaging.

use std::time::Duration;

use super::poll::{DetectionOutcome, Evidence};
use crate::runtime::{cancellable_wait, CancelToken};

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Absolute difference between the means of the two halves of `samples`.
///
/// The first half holds `len / 2` readings and the second half the rest.
/// Fewer than two readings cannot show a step and yield 0.0.
pub fn step_change(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let (first, second) = samples.split_at(samples.len() / 2);
    (mean(second) - mean(first)).abs()
}

/// Turns a sampled series into a detection outcome against `limit`.
pub fn classify_step(samples: &[f64], limit: f64) -> DetectionOutcome {
    let step = step_change(samples);
    if step > limit {
        DetectionOutcome::Detected(Evidence::Step(step))
    } else {
        DetectionOutcome::TimedOut
    }
}

/// Takes `count` readings, waiting `spacing` after each one.
///
/// Returns `None` if `cancel` is set before the series is complete.
pub fn sample_series<R, E>(
    count: usize,
    spacing: Duration,
    cancel: &CancelToken,
    mut read: R,
) -> Result<Option<Vec<f64>>, E>
where
    R: FnMut() -> Result<f64, E>,
{
    let mut readings = Vec::with_capacity(count);
    for _ in 0..count {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        readings.push(read()?);
        if !cancellable_wait(spacing, cancel) {
            return Ok(None);
        }
    }
    Ok(Some(readings))
}
