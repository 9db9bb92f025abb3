//! Button-press emulator and light sensor interface.
//!
//! The physical device is an external collaborator: anything implementing
//! [`Controller`] can drive a routine. [`HardwareSession`] owns the one
//! controller of a session and hands out at most one lease at a time, so
//! two routines can never issue commands concurrently.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{HardwareError, RuntimeError};
use crate::logging::LogSink;

/// Highest value the light sensor reports.
pub const LIGHT_MAX: u16 = 1020;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Soft-reset button combinations. Which one a title needs depends on the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetKind {
    Standard,
    Alternate,
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fire-and-forget command vocabulary of the button emulator.
///
/// Commands are synchronous enough to be followed directly by a
/// cancellable wait. Only [`Controller::read_light`] returns data.
pub trait Controller: Send {
    fn press(&mut self, button: Button) -> Result<(), HardwareError>;
    fn hold(&mut self, direction: Direction) -> Result<(), HardwareError>;
    fn release_all(&mut self) -> Result<(), HardwareError>;
    fn soft_reset(&mut self, kind: ResetKind) -> Result<(), HardwareError>;
    /// One light sensor reading, 0 (dark) to [`LIGHT_MAX`] (bright).
    fn read_light(&mut self) -> Result<u16, HardwareError>;
}

/// Exclusive owner of a session's controller.
#[derive(Clone)]
pub struct HardwareSession {
    controller: Arc<Mutex<Box<dyn Controller>>>,
    in_use: Arc<AtomicBool>,
}

impl HardwareSession {
    pub fn new(controller: Box<dyn Controller>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the controller for one routine run.
    ///
    /// Fails with [`RuntimeError::HardwareBusy`] while another lease is alive.
    pub fn claim(&self) -> Result<ControllerLease, RuntimeError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::HardwareBusy);
        }
        Ok(ControllerLease {
            controller: self.controller.clone(),
            in_use: self.in_use.clone(),
        })
    }

    pub fn is_claimed(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }
}

/// A routine's handle on the controller. Releases the claim on drop.
pub struct ControllerLease {
    controller: Arc<Mutex<Box<dyn Controller>>>,
    in_use: Arc<AtomicBool>,
}

impl ControllerLease {
    fn with<T>(&self, f: impl FnOnce(&mut dyn Controller) -> T) -> T {
        let mut guard = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut **guard)
    }

    pub fn press(&self, button: Button) -> Result<(), HardwareError> {
        self.with(|c| c.press(button))
    }

    pub fn hold(&self, direction: Direction) -> Result<(), HardwareError> {
        self.with(|c| c.hold(direction))
    }

    pub fn release_all(&self) -> Result<(), HardwareError> {
        self.with(|c| c.release_all())
    }

    pub fn soft_reset(&self, kind: ResetKind) -> Result<(), HardwareError> {
        self.with(|c| c.soft_reset(kind))
    }

    pub fn read_light(&self) -> Result<u16, HardwareError> {
        self.with(|c| c.read_light())
    }
}

impl Drop for ControllerLease {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::SeqCst);
    }
}

/// Logs every command instead of driving a device.
///
/// Used by the binary when no emulator is attached, so routines can be
/// exercised against a replayed video feed.
pub struct DryRunController {
    log: Arc<dyn LogSink>,
    light_level: u16,
}

impl DryRunController {
    pub fn new(log: Arc<dyn LogSink>, light_level: u16) -> Self {
        Self {
            log,
            light_level: light_level.min(LIGHT_MAX),
        }
    }
}

impl Controller for DryRunController {
    fn press(&mut self, button: Button) -> Result<(), HardwareError> {
        self.log.append(&format!("[dry-run] press {}", button));
        Ok(())
    }

    fn hold(&mut self, direction: Direction) -> Result<(), HardwareError> {
        self.log.append(&format!("[dry-run] hold {}", direction));
        Ok(())
    }

    fn release_all(&mut self) -> Result<(), HardwareError> {
        self.log.append("[dry-run] release all");
        Ok(())
    }

    fn soft_reset(&mut self, kind: ResetKind) -> Result<(), HardwareError> {
        self.log.append(&format!("[dry-run] soft reset ({:?})", kind));
        Ok(())
    }

    fn read_light(&mut self) -> Result<u16, HardwareError> {
        Ok(self.light_level)
    }
}
