//! GamePRo console runner
//!
//! Runs one automation routine against a dry-run controller and an optional
//! replayed video feed. Calibration requests are answered on stdin.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gamepro_engine::calibration::{calibration_channel, CalibrationDesk, CalibrationStore};
use gamepro_engine::capture::{FrameBuffer, ReplaySource};
use gamepro_engine::config::EngineConfig;
use gamepro_engine::detection::Region;
use gamepro_engine::hardware::{DryRunController, HardwareSession};
use gamepro_engine::logging::{FileLog, LogSink};
use gamepro_engine::paths;
use gamepro_engine::routines::{find_routine, registry};
use gamepro_engine::runtime::{CancelToken, RoutineEnv, RoutineState, ScriptRuntime};

fn print_usage(log: &dyn LogSink) {
    log.append("Usage: gamepro <routine>");
    log.append("Available routines:");
    for routine in registry() {
        log.append(&format!("  {:<20} {}", routine.name(), routine.description()));
    }
}

/// Region answer typed on the console: `x y w h`, spaces or commas between.
const REGION_PATTERN: &str = r"^\s*(\d+)[\s,]+(\d+)[\s,]+(\d+)[\s,]+(\d+)\s*$";

fn parse_region(pattern: &Regex, line: &str) -> Option<Region> {
    let caps = pattern.captures(line)?;
    let value = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let region = Region::new(value(1)?, value(2)?, value(3)?, value(4)?);
    (region.width > 0 && region.height > 0).then_some(region)
}

/// Services the calibration desk and the stop command from stdin.
fn spawn_console(
    desk: CalibrationDesk,
    pattern: Regex,
    stop: impl Fn() + Send + 'static,
    log: Arc<dyn LogSink>,
) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("stop") {
                stop();
                break;
            }

            match parse_region(&pattern, line) {
                Some(region) => match desk.respond(region) {
                    Ok(()) => log.append(&format!("Region submitted: {}", region)),
                    Err(e) => log.append(&format!("Ignored region: {}", e)),
                },
                None => log.append("Expected 'x y w h' or 'stop'"),
            }
        }
    });
}

/// Logs calibration prompts as they appear.
fn spawn_prompt_watcher(desk: CalibrationDesk, log: Arc<dyn LogSink>, cancel: CancelToken) {
    thread::spawn(move || {
        let mut last: Option<String> = None;
        while cancel.wait(Duration::from_millis(100)) {
            let prompt = desk.pending_prompt();
            if prompt.is_some() && prompt != last {
                if let Some(text) = &prompt {
                    log.append(&format!("Calibration needed: {} (enter 'x y w h')", text));
                }
            }
            last = prompt;
        }
    });
}

fn main() -> Result<()> {
    // Ensure output directories exist
    paths::ensure_directories()?;
    let log: Arc<dyn LogSink> = Arc::new(FileLog::new(paths::get_log_path()));

    let config = EngineConfig::load(&paths::get_config_path(), log.as_ref());

    let routine_name = std::env::args()
        .nth(1)
        .or_else(|| config.routine.clone());
    let Some(routine_name) = routine_name else {
        print_usage(log.as_ref());
        return Ok(());
    };
    let Some(routine) = find_routine(&routine_name) else {
        print_usage(log.as_ref());
        return Err(anyhow!("Unknown routine '{}'", routine_name));
    };

    let frames = FrameBuffer::new();
    let _replay = match &config.frame_source {
        Some(source) => Some(
            ReplaySource::start(source, frames.clone(), config.frame_interval(), log.clone())
                .context("Failed to start frame replay")?,
        ),
        None => {
            log.append("No frame_source configured; detection will see no frames.");
            None
        }
    };

    let hardware = HardwareSession::new(Box::new(DryRunController::new(
        log.clone(),
        config.dry_run_light_level,
    )));
    let (requester, desk) = calibration_channel();
    let env = RoutineEnv {
        frames: Arc::new(frames.clone()),
        log: log.clone(),
        calibration: requester,
        store: CalibrationStore::new(config.calibration_dir()),
        poll_interval: config.poll_interval(),
    };

    let mut runtime = ScriptRuntime::new();
    runtime.start(routine, &hardware, env)?;

    let pattern = Regex::new(REGION_PATTERN)?;
    let cancel = runtime.cancel_token();
    let console_log = log.clone();
    spawn_console(
        desk.clone(),
        pattern,
        move || {
            if cancel.cancel() {
                console_log.append("Stop requested");
            }
        },
        log.clone(),
    );
    spawn_prompt_watcher(desk, log.clone(), runtime.cancel_token());
    log.append("Type 'stop' to end the run.");

    let state = runtime.join();
    log.append(&format!("Final state: {} ({})", state, frames.describe()));
    match state {
        RoutineState::Failed(message) => Err(anyhow!("Routine failed: {}", message)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let pattern = Regex::new(REGION_PATTERN).unwrap();
        let parse = |line| parse_region(&pattern, line);

        assert_eq!(parse("10 20 30 40"), Some(Region::new(10, 20, 30, 40)));
        assert_eq!(parse("  1, 2, 3, 4 "), Some(Region::new(1, 2, 3, 4)));
        assert_eq!(parse("1 2 3"), None);
        assert_eq!(parse("1 2 0 4"), None);
        assert_eq!(parse("a b c d"), None);
        assert_eq!(parse("1 2 3 4 5"), None);
        assert_eq!(parse("1 2 3 99999999999"), None);
    }
}
