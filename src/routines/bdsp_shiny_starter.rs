//! Brilliant Diamond / Shining Pearl starter hunt at Lake Verity.
//!
//! Two visual stages per reset: a screen blackout confirms the scripted
//! wild battle started, then the delay before dialogue text appears in the
//! starter battle is timed. The shiny sparkle plays before the text box, so
//! a long delay (or no text at all) marks the rare event.

use anyhow::Result;
use std::time::{Duration, Instant};

use super::SinnohStarter;
use crate::capture::Frame;
use crate::detection::{count_of_class, fraction_of_class, PixelClass, Region};
use crate::error::DetectionError;
use crate::hardware::{Button, Direction, ResetKind};
use crate::runtime::{Routine, RoutineContext};

/// Centre of a 640x480 feed, sampled for the battle blackout.
pub const BLACKOUT_REGION: Region = Region::new(100, 100, 440, 300);
/// Share of dark pixels in [`BLACKOUT_REGION`] that counts as a blackout
pub const BLACKOUT_FRACTION: f64 = 0.70;
const DARK: PixelClass = PixelClass::Dark { max: 50 };
/// White pixels in the dialogue region that count as text on screen
pub const TEXT_PIXELS: u64 = 500;
const WHITE: PixelClass = PixelClass::Bright { min: 200 };

/// Delays in seconds unless noted. The Switch title reloads slowly.
#[derive(Clone, Debug)]
pub struct BdspTimings {
    pub soft_reset_secs: f64,
    pub menu_secs: f64,
    pub menu_presses: usize,
    /// Extra wait after the last menu press while the overworld loads
    pub overworld_secs: f64,
    /// Holding Up into the lake cutscene trigger
    pub walk_secs: f64,
    pub cutscene_secs: f64,
    /// Added to `cutscene_secs` as the blackout timeout
    pub blackout_grace_secs: f64,
    pub starly_secs: f64,
    pub briefcase_secs: f64,
    pub cursor_secs: f64,
    pub confirm_secs: f64,
    /// Longest wait for the starter's battle text
    pub battle_load_secs: f64,
    /// Text delays above this flag the sparkle animation
    pub shiny_delay: Duration,
}

impl Default for BdspTimings {
    fn default() -> Self {
        Self {
            soft_reset_secs: 25.0,
            menu_secs: 2.0,
            menu_presses: 3,
            overworld_secs: 3.0,
            walk_secs: 2.0,
            cutscene_secs: 10.0,
            blackout_grace_secs: 5.0,
            starly_secs: 5.0,
            briefcase_secs: 3.0,
            cursor_secs: 0.3,
            confirm_secs: 2.0,
            battle_load_secs: 8.0,
            shiny_delay: Duration::from_millis(3000),
        }
    }
}

#[derive(Default)]
pub struct BdspShinyStarter {
    pub starter: SinnohStarter,
    pub timings: BdspTimings,
}

fn is_blackout(frame: &Frame) -> Result<bool, DetectionError> {
    // Smaller feeds are sampled over whatever part of the region they cover
    match BLACKOUT_REGION.clipped_to(frame.width(), frame.height()) {
        Some(region) => Ok(fraction_of_class(frame, &region, DARK)? > BLACKOUT_FRACTION),
        None => Ok(false),
    }
}

fn has_text(frame: &Frame, dialogue: &Region) -> Result<bool, DetectionError> {
    Ok(count_of_class(frame, dialogue, WHITE)? > TEXT_PIXELS)
}

impl Routine for BdspShinyStarter {
    fn name(&self) -> &'static str {
        "bdsp-shiny-starter"
    }

    fn description(&self) -> &'static str {
        "Soft-resets for a shiny starter at Lake Verity (Brilliant Diamond/Shining Pearl)."
    }

    fn run(&self, ctx: &RoutineContext) -> Result<()> {
        let t = &self.timings;
        ctx.log("BDSP shiny starter started.");
        ctx.log(&format!("Starter: {}", self.starter.name()));
        ctx.log("Calibrate the dialogue region (lower text area of the screen).");

        let dialogue = ctx.request_region("Draw a rectangle over the dialogue / text area");
        if ctx.is_cancelled() {
            return Ok(());
        }
        ctx.log(&format!("Dialogue region: {}", dialogue));
        ctx.log("Starting soft reset loop...");

        let mut resets = 0u32;
        while !ctx.is_cancelled() {
            ctx.controller().soft_reset(ResetKind::Alternate)?;
            resets += 1;
            ctx.log(&format!("SR #{} - reloading game...", resets));
            if !ctx.wait_secs(t.soft_reset_secs) {
                break;
            }

            if !self.reach_lake(ctx)? {
                break;
            }

            ctx.log(&format!("SR #{}: waiting for Starly battle blackout...", resets));
            let blackout = ctx.poll_until(
                is_blackout,
                Duration::from_secs_f64(t.cutscene_secs + t.blackout_grace_secs),
            )?;
            if ctx.is_cancelled() {
                break;
            }
            if !blackout.is_detected() {
                ctx.log(&format!("SR #{}: blackout timed out - retrying", resets));
                continue;
            }
            ctx.log(&format!("SR #{}: Starly battle detected", resets));

            if !ctx.wait_secs(t.cutscene_secs + t.starly_secs) {
                break;
            }
            if !self.choose_starter(ctx)? {
                break;
            }

            let start = Instant::now();
            ctx.log(&format!("SR #{}: waiting for starter battle text...", resets));
            let text = ctx.poll_until(
                |frame| has_text(frame, &dialogue),
                Duration::from_secs_f64(t.battle_load_secs),
            )?;
            if ctx.is_cancelled() {
                break;
            }

            let elapsed = text.elapsed().unwrap_or_else(|| start.elapsed());
            let elapsed_ms = elapsed.as_millis();
            if text.is_detected() {
                ctx.log(&format!("SR #{}: text appeared in {} ms", resets, elapsed_ms));
            } else {
                ctx.log(&format!("SR #{}: no text after {} ms", resets, elapsed_ms));
            }

            if elapsed > t.shiny_delay || !text.is_detected() {
                ctx.log(&format!(
                    "*** Shiny {} detected! Time: {} ms | SR #{} ***",
                    self.starter.name(),
                    elapsed_ms,
                    resets
                ));
                ctx.log(&format!("Total soft resets: {}", resets));
                ctx.complete("Script paused - catch your shiny! Stop when done.");
                break;
            }
            ctx.log(&format!("SR #{}: not shiny - resetting", resets));
        }

        ctx.log("BDSP shiny starter stopped.");
        Ok(())
    }
}

impl BdspShinyStarter {
    /// Title screen to the lake cutscene trigger.
    fn reach_lake(&self, ctx: &RoutineContext) -> Result<bool> {
        let t = &self.timings;
        for _ in 0..t.menu_presses {
            if !ctx.press_then_wait(Button::A, t.menu_secs)? {
                return Ok(false);
            }
        }
        if !ctx.wait_secs(t.overworld_secs) {
            return Ok(false);
        }
        ctx.hold_for(Direction::Up, t.walk_secs)
    }

    /// Opens the briefcase, moves to the chosen starter and confirms twice.
    fn choose_starter(&self, ctx: &RoutineContext) -> Result<bool> {
        let t = &self.timings;
        Ok(ctx.press_then_wait(Button::A, t.briefcase_secs)?
            && self.starter.select(ctx, t.cursor_secs)?
            && ctx.press_then_wait(Button::A, t.confirm_secs)?
            && ctx.press_then_wait(Button::A, t.confirm_secs)?)
    }
}
