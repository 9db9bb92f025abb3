//! Background execution of one routine run.
//!
//! The run moves through: Idle → Running → Completed | Cancelled | Failed.
//! Terminal states never change again; a new run needs a new runtime.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::cancel::CancelToken;
use super::context::{Routine, RoutineContext, RoutineEnv};
use crate::error::RuntimeError;
use crate::hardware::HardwareSession;
use crate::logging::LogSink;

/// Lifecycle of a routine run.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutineState {
    /// Created, not started yet
    Idle,
    /// Background thread is running the routine
    Running,
    /// The routine chose to stop (event confirmed or work finished)
    Completed,
    /// Stopped by the operator
    Cancelled,
    /// Stopped by an unrecovered error
    Failed(String),
}

impl std::fmt::Display for RoutineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutineState::Idle => write!(f, "Idle"),
            RoutineState::Running => write!(f, "Running"),
            RoutineState::Completed => write!(f, "Completed"),
            RoutineState::Cancelled => write!(f, "Cancelled"),
            RoutineState::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}

impl RoutineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoutineState::Completed | RoutineState::Cancelled | RoutineState::Failed(_)
        )
    }

    /// Applies a transition if the state machine allows it.
    ///
    /// Returns whether the state changed.
    pub fn advance(&mut self, next: RoutineState) -> bool {
        let allowed = match (&*self, &next) {
            (RoutineState::Idle, RoutineState::Running) => true,
            (RoutineState::Running, next) => next.is_terminal(),
            _ => false,
        };
        if allowed {
            *self = next;
        }
        allowed
    }
}

/// Owns the background thread and cancel token of one routine run.
pub struct ScriptRuntime {
    state: Arc<Mutex<RoutineState>>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
    log: Option<Arc<dyn LogSink>>,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RoutineState::Idle)),
            cancel: CancelToken::new(),
            handle: None,
            log: None,
        }
    }

    pub fn state(&self) -> RoutineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RoutineState::Running
    }

    /// Token observed by the run; exposed for collaborators that wait alongside it.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Starts `routine` on a background thread.
    ///
    /// Claims the session's controller for the duration of the run.
    ///
    /// # Errors
    /// - [`RuntimeError::AlreadyStarted`] if this runtime is not idle
    /// - [`RuntimeError::HardwareBusy`] if another run holds the controller
    pub fn start(
        &mut self,
        routine: Arc<dyn Routine>,
        hardware: &HardwareSession,
        env: RoutineEnv,
    ) -> Result<(), RuntimeError> {
        if self.state() != RoutineState::Idle {
            return Err(RuntimeError::AlreadyStarted);
        }
        let controller = hardware.claim()?;

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(RoutineState::Running);

        let log = env.log.clone();
        self.log = Some(log.clone());
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let ctx = RoutineContext::new(env, controller, cancel.clone(), state.clone());

        self.handle = Some(thread::spawn(move || {
            log.append(&format!("Routine '{}' started", routine.name()));

            let result = catch_unwind(AssertUnwindSafe(|| routine.run(&ctx)));
            // Release the controller before reporting the final state
            drop(ctx);

            let next = match result {
                Ok(Ok(())) if cancel.is_cancelled() => RoutineState::Cancelled,
                Ok(Ok(())) => RoutineState::Completed,
                Ok(Err(e)) => {
                    log.append(&format!("Routine '{}' failed: {:#}", routine.name(), e));
                    RoutineState::Failed(format!("{:#}", e))
                }
                Err(_) => {
                    log.append(&format!("Routine '{}' panicked", routine.name()));
                    RoutineState::Failed("routine panicked".to_string())
                }
            };

            let final_state = {
                let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
                current.advance(next);
                current.clone()
            };
            log.append(&format!("Routine '{}' stopped: {}", routine.name(), final_state));
        }));

        Ok(())
    }

    /// Requests cooperative cancellation. Idempotent.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            if let Some(log) = &self.log {
                log.append("Stop requested");
            }
        }
    }

    /// Waits for the background thread to exit and returns the final state.
    pub fn join(&mut self) -> RoutineState {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.state()
    }
}
