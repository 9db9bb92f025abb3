//! Everything a routine receives when it runs.
//!
//! Collaborators are injected here rather than looked up globally, so a
//! routine can be exercised against fake hardware and a test frame buffer.

use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::cancel::{cancellable_wait, CancelToken};
use super::script::RoutineState;
use crate::calibration::{CalibrationRequester, CalibrationStore};
use crate::capture::{Frame, FrameSource};
use crate::detection::{poll_until, DetectionOutcome, Region};
use crate::error::DetectionError;
use crate::hardware::{Button, ControllerLease, Direction, ResetKind};
use crate::logging::LogSink;

/// Default spacing between detection polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// One automation use case: an entry point plus a name/description pair.
pub trait Routine: Send + Sync {
    /// Stable identifier; also the routine's calibration key.
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Runs until the routine decides to stop or `ctx` is cancelled.
    fn run(&self, ctx: &RoutineContext) -> Result<()>;
}

/// Collaborators shared by every run in a session.
#[derive(Clone)]
pub struct RoutineEnv {
    pub frames: Arc<dyn FrameSource>,
    pub log: Arc<dyn LogSink>,
    pub calibration: CalibrationRequester,
    pub store: CalibrationStore,
    pub poll_interval: Duration,
}

/// Per-run view handed to [`Routine::run`].
pub struct RoutineContext {
    controller: ControllerLease,
    frames: Arc<dyn FrameSource>,
    cancel: CancelToken,
    log: Arc<dyn LogSink>,
    calibration: CalibrationRequester,
    store: CalibrationStore,
    poll_interval: Duration,
    state: Arc<Mutex<RoutineState>>,
}

impl RoutineContext {
    pub(crate) fn new(
        env: RoutineEnv,
        controller: ControllerLease,
        cancel: CancelToken,
        state: Arc<Mutex<RoutineState>>,
    ) -> Self {
        Self {
            controller,
            frames: env.frames,
            cancel,
            log: env.log,
            calibration: env.calibration,
            store: env.store,
            poll_interval: env.poll_interval,
            state,
        }
    }

    pub fn controller(&self) -> &ControllerLease {
        &self.controller
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn log(&self, message: &str) {
        self.log.append(message);
    }

    /// Latest frame from the video source, if any.
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.frames.latest()
    }

    /// State of the video source, for failure messages.
    pub fn describe_frames(&self) -> String {
        self.frames.describe()
    }

    /// Cancellable sleep. Returns `false` if the run was cancelled.
    pub fn wait(&self, duration: Duration) -> bool {
        cancellable_wait(duration, &self.cancel)
    }

    /// Same as [`RoutineContext::wait`] with the duration in seconds.
    pub fn wait_secs(&self, seconds: f64) -> bool {
        self.wait(Duration::from_secs_f64(seconds))
    }

    /// Presses `button`, then waits `seconds`. Returns `false` if cancelled.
    pub fn press_then_wait(&self, button: Button, seconds: f64) -> Result<bool> {
        self.controller.press(button)?;
        Ok(self.wait_secs(seconds))
    }

    /// Holds `direction` for `seconds`, then releases everything.
    ///
    /// Buttons are released even when the wait is cut short by cancellation.
    pub fn hold_for(&self, direction: Direction, seconds: f64) -> Result<bool> {
        self.controller.hold(direction)?;
        let completed = self.wait_secs(seconds);
        self.controller.release_all()?;
        Ok(completed)
    }

    /// Soft-resets, then waits `seconds` for the title to reload.
    pub fn soft_reset_then_wait(&self, kind: ResetKind, seconds: f64) -> Result<bool> {
        self.controller.soft_reset(kind)?;
        Ok(self.wait_secs(seconds))
    }

    /// Asks the operator for a region. See [`CalibrationRequester::request_region`];
    /// check [`RoutineContext::is_cancelled`] right after this returns.
    pub fn request_region(&self, prompt: &str) -> Region {
        self.calibration.request_region(prompt, &self.cancel)
    }

    /// [`poll_until`] against this run's frame source, cancel token and poll interval.
    pub fn poll_until<P>(
        &self,
        predicate: P,
        timeout: Duration,
    ) -> Result<DetectionOutcome, DetectionError>
    where
        P: FnMut(&Frame) -> Result<bool, DetectionError>,
    {
        poll_until(
            self.frames.as_ref(),
            &self.cancel,
            predicate,
            timeout,
            self.poll_interval,
        )
    }

    /// Marks the run completed, logs `message`, then blocks until the
    /// operator cancels. Used once the rare event has been confirmed.
    pub fn complete(&self, message: &str) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.advance(RoutineState::Completed);
        }
        self.log(message);
        self.cancel.wait_for_cancel();
    }
}
