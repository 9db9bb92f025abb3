//! Fake collaborators for exercising routines end to end.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::calibration::{calibration_channel, CalibrationDesk, CalibrationStore};
use crate::capture::{Frame, FrameBuffer};
use crate::detection::Region;
use crate::error::HardwareError;
use crate::hardware::{Button, Controller, Direction, HardwareSession, ResetKind};
use crate::logging::MemoryLog;
use crate::runtime::{Routine, RoutineEnv, RoutineState, ScriptRuntime};

const PATIENCE: Duration = Duration::from_secs(10);

/// Records every command and serves queued light readings.
struct FakeController {
    commands: Arc<Mutex<Vec<String>>>,
    light: Arc<Mutex<VecDeque<u16>>>,
    idle_light: u16,
}

impl Controller for FakeController {
    fn press(&mut self, button: Button) -> Result<(), HardwareError> {
        self.commands.lock().unwrap().push(format!("press {}", button));
        Ok(())
    }

    fn hold(&mut self, direction: Direction) -> Result<(), HardwareError> {
        self.commands.lock().unwrap().push(format!("hold {}", direction));
        Ok(())
    }

    fn release_all(&mut self) -> Result<(), HardwareError> {
        self.commands.lock().unwrap().push("release".to_string());
        Ok(())
    }

    fn soft_reset(&mut self, kind: ResetKind) -> Result<(), HardwareError> {
        self.commands
            .lock()
            .unwrap()
            .push(format!("reset {:?}", kind));
        Ok(())
    }

    fn read_light(&mut self) -> Result<u16, HardwareError> {
        Ok(self
            .light
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.idle_light))
    }
}

pub struct Harness {
    pub hardware: HardwareSession,
    pub frames: FrameBuffer,
    pub log: Arc<MemoryLog>,
    pub desk: CalibrationDesk,
    pub store: CalibrationStore,
    commands: Arc<Mutex<Vec<String>>>,
    light: Arc<Mutex<VecDeque<u16>>>,
    env: RoutineEnv,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_idle_light(400)
    }

    /// Harness whose sensor reports `idle_light` once queued readings run out.
    pub fn with_idle_light(idle_light: u16) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemoryLog::new());
        let frames = FrameBuffer::new();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let light = Arc::new(Mutex::new(VecDeque::new()));
        let hardware = HardwareSession::new(Box::new(FakeController {
            commands: commands.clone(),
            light: light.clone(),
            idle_light,
        }));
        let (requester, desk) = calibration_channel();
        let store = CalibrationStore::new(dir.path().join("calibration"));
        let env = RoutineEnv {
            frames: Arc::new(frames.clone()),
            log: log.clone(),
            calibration: requester,
            store: store.clone(),
            poll_interval: Duration::from_millis(5),
        };

        Self {
            hardware,
            frames,
            log,
            desk,
            store,
            commands,
            light,
            env,
            _dir: dir,
        }
    }

    pub fn start(&self, routine: impl Routine + 'static) -> ScriptRuntime {
        let mut runtime = ScriptRuntime::new();
        runtime
            .start(Arc::new(routine), &self.hardware, self.env.clone())
            .unwrap();
        runtime
    }

    pub fn publish(&self, frame: Frame) {
        self.frames.publish(frame);
    }

    /// Queues sensor readings served before the idle level.
    pub fn queue_light(&self, readings: &[u16]) {
        self.light.lock().unwrap().extend(readings.iter().copied());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count_commands(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    pub fn wait_for_log(&self, needle: &str) {
        let start = Instant::now();
        while !self.log.contains(needle) {
            assert!(
                start.elapsed() < PATIENCE,
                "log never contained '{}': {:#?}",
                needle,
                self.log.lines()
            );
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// Answers the next calibration request and returns its prompt.
    pub fn answer(&self, region: Region) -> String {
        let start = Instant::now();
        loop {
            if let Some(prompt) = self.desk.pending_prompt() {
                self.desk.respond(region).unwrap();
                return prompt;
            }
            assert!(start.elapsed() < PATIENCE, "no calibration request arrived");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn wait_for_prompt(&self) -> String {
        let start = Instant::now();
        loop {
            if let Some(prompt) = self.desk.pending_prompt() {
                return prompt;
            }
            assert!(start.elapsed() < PATIENCE, "no calibration request arrived");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

pub fn wait_for_state(runtime: &ScriptRuntime, state: RoutineState) {
    let start = Instant::now();
    while runtime.state() != state {
        assert!(
            start.elapsed() < PATIENCE,
            "runtime stuck in {}",
            runtime.state()
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}
