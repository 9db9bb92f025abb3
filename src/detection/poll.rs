//! Polling the latest frame until a condition holds.

use std::time::{Duration, Instant};

use crate::capture::{Frame, FrameSource};
use crate::error::DetectionError;
use crate::runtime::{cancellable_wait, CancelToken};

/// What a detection measured when it fired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Evidence {
    /// Time from the start of polling to the first matching frame.
    Elapsed(Duration),
    /// Magnitude of a step change over a sampled series.
    Step(f64),
}

/// Result of one detection loop. Consumed immediately by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetectionOutcome {
    Detected(Evidence),
    TimedOut,
    Cancelled,
}

impl DetectionOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, DetectionOutcome::Detected(_))
    }

    /// Elapsed time if this outcome came from [`poll_until`].
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            DetectionOutcome::Detected(Evidence::Elapsed(elapsed)) => Some(*elapsed),
            _ => None,
        }
    }

    /// Step magnitude if this outcome came from a step classification.
    pub fn step(&self) -> Option<f64> {
        match self {
            DetectionOutcome::Detected(Evidence::Step(step)) => Some(*step),
            _ => None,
        }
    }
}

/// Evaluates `predicate` against the latest frame every `interval` until it
/// holds, `timeout` passes, or `cancel` is set.
///
/// Polls where no frame is available count as "no match". The first poll
/// happens immediately, so the reported elapsed time is accurate to within
/// one interval. A sampling error from `predicate` ends the loop.
pub fn poll_until<S, P>(
    source: &S,
    cancel: &CancelToken,
    mut predicate: P,
    timeout: Duration,
    interval: Duration,
) -> Result<DetectionOutcome, DetectionError>
where
    S: FrameSource + ?Sized,
    P: FnMut(&Frame) -> Result<bool, DetectionError>,
{
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Ok(DetectionOutcome::Cancelled);
        }

        if let Some(frame) = source.latest() {
            if predicate(&frame)? {
                return Ok(DetectionOutcome::Detected(Evidence::Elapsed(start.elapsed())));
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(DetectionOutcome::TimedOut);
        }
        if !cancellable_wait(interval.min(timeout - elapsed), cancel) {
            return Ok(DetectionOutcome::Cancelled);
        }
    }
}
