//! Routine execution.
//!
//! This module provides:
//! - `CancelToken` and the cancellable wait every loop is built on
//! - `RoutineContext`, the collaborators a routine receives
//! - `ScriptRuntime`, which runs one routine on a background thread

pub mod cancel;
pub mod context;
pub mod script;

pub use cancel::{cancellable_wait, CancelToken, WAIT_INCREMENT};
pub use context::{Routine, RoutineContext, RoutineEnv, DEFAULT_POLL_INTERVAL};
pub use script::{RoutineState, ScriptRuntime};
