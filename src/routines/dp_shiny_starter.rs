//! Diamond / Pearl starter hunt using the light sensor.
//!
//! The sensor sits over the bottom DS screen. The sparkle animation shifts
//! its brightness, so after each reset the routine takes a short series of
//! readings and looks for a step between the two halves.

use anyhow::Result;
use std::time::Duration;

use super::SinnohStarter;
use crate::detection::{classify_step, sample_series, step_change};
use crate::hardware::{Button, Direction, ResetKind};
use crate::runtime::{Routine, RoutineContext};

/// Delays in seconds.
#[derive(Clone, Debug)]
pub struct DpTimings {
    pub soft_reset_secs: f64,
    /// After each of the three A presses through title, continue and overworld
    pub menu_secs: [f64; 3],
    pub walk_secs: f64,
    pub settle_secs: f64,
    pub starter_secs: f64,
    pub cursor_secs: f64,
    pub confirm_secs: f64,
    pub battle_secs: f64,
    /// Spacing between light readings
    pub sample_secs: f64,
}

impl Default for DpTimings {
    fn default() -> Self {
        Self {
            soft_reset_secs: 12.0,
            menu_secs: [5.0, 3.0, 3.0],
            walk_secs: 1.0,
            settle_secs: 0.2,
            starter_secs: 4.0,
            cursor_secs: 0.3,
            confirm_secs: 3.0,
            battle_secs: 5.0,
            sample_secs: 0.1,
        }
    }
}

pub struct DpShinyStarter {
    pub starter: SinnohStarter,
    pub timings: DpTimings,
    pub samples: usize,
    /// Minimum brightness step that flags the sparkle
    pub step_limit: f64,
}

impl Default for DpShinyStarter {
    fn default() -> Self {
        Self {
            starter: SinnohStarter::default(),
            timings: DpTimings::default(),
            samples: 10,
            step_limit: 30.0,
        }
    }
}

impl Routine for DpShinyStarter {
    fn name(&self) -> &'static str {
        "dp-shiny-starter"
    }

    fn description(&self) -> &'static str {
        "Uses the light sensor to detect the shiny sparkle (Diamond/Pearl)."
    }

    fn run(&self, ctx: &RoutineContext) -> Result<()> {
        ctx.log(&format!(
            "Diamond/Pearl shiny starter started. Starter: {}",
            self.starter.name()
        ));
        ctx.log("The light sensor must be positioned over the bottom DS screen.");

        let mut resets = 0u32;
        while !ctx.is_cancelled() {
            ctx.controller().soft_reset(ResetKind::Standard)?;
            resets += 1;
            ctx.log(&format!("Soft reset #{} - waiting for game to boot...", resets));
            if !ctx.wait_secs(self.timings.soft_reset_secs) {
                break;
            }
            if !self.reach_battle(ctx)? {
                break;
            }

            let readings = sample_series(
                self.samples,
                Duration::from_secs_f64(self.timings.sample_secs),
                ctx.cancel_token(),
                || ctx.controller().read_light().map(f64::from),
            )?;
            let Some(readings) = readings else {
                break;
            };

            let outcome = classify_step(&readings, self.step_limit);
            ctx.log(&format!(
                "Light step: {:.1} (limit {:.0})",
                step_change(&readings),
                self.step_limit
            ));

            if outcome.is_detected() {
                ctx.log(&format!(
                    "*** Shiny {}! Detected via light sensor on reset #{} ***",
                    self.starter.name(),
                    resets
                ));
                ctx.complete("Script paused - catch your shiny! Stop when done.");
                break;
            }
            ctx.log(&format!("SR #{}: not shiny.", resets));
        }

        ctx.log("Diamond/Pearl shiny starter stopped.");
        Ok(())
    }
}

impl DpShinyStarter {
    /// Title screen through starter selection into the rival battle.
    fn reach_battle(&self, ctx: &RoutineContext) -> Result<bool> {
        let t = &self.timings;
        for delay in t.menu_secs {
            if !ctx.press_then_wait(Button::A, delay)? {
                return Ok(false);
            }
        }
        Ok(ctx.hold_for(Direction::Up, t.walk_secs)?
            && ctx.wait_secs(t.settle_secs)
            && ctx.press_then_wait(Button::A, t.starter_secs)?
            && self.starter.select(ctx, t.cursor_secs)?
            && ctx.press_then_wait(Button::A, t.confirm_secs)?
            && ctx.press_then_wait(Button::A, t.battle_secs)?)
    }
}
