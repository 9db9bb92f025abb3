//! Chain fishing for X/Y and Omega Ruby/Alpha Sapphire.
//!
//! Casts repeatedly from the same tile to build a chain. A hook is spotted
//! by the exclamation mark (white or red pixels above the trainer); during
//! the battle the light sensor watches the bottom screen for the sparkle.

use anyhow::Result;
use std::time::Duration;

use crate::capture::Frame;
use crate::detection::{classify_step, count_of_class, sample_series, step_change, PixelClass, Region};
use crate::error::DetectionError;
use crate::hardware::Button;
use crate::runtime::{Routine, RoutineContext};

const WHITE: PixelClass = PixelClass::Bright { min: 200 };
const RED: PixelClass = PixelClass::Red {
    min_red: 180,
    max_green: 100,
};
/// Pixel counts above which the exclamation mark is considered visible
pub const WHITE_PIXELS: u64 = 20;
pub const RED_PIXELS: u64 = 10;

/// Delays in seconds.
#[derive(Clone, Debug)]
pub struct FishingTimings {
    /// After pressing A to cast
    pub cast_secs: f64,
    /// Longest wait for the exclamation mark
    pub hook_window_secs: f64,
    pub after_hook_secs: f64,
    pub battle_secs: f64,
    /// Window the light readings are spread over
    pub monitor_secs: f64,
    pub post_battle_secs: f64,
    /// Cursor moves when nudging the rod or selecting Run
    pub nudge_secs: f64,
}

impl Default for FishingTimings {
    fn default() -> Self {
        Self {
            cast_secs: 1.5,
            hook_window_secs: 15.0,
            after_hook_secs: 1.0,
            battle_secs: 2.0,
            monitor_secs: 25.0,
            post_battle_secs: 6.0,
            nudge_secs: 0.4,
        }
    }
}

pub struct ChainFishing {
    pub timings: FishingTimings,
    pub samples: usize,
    pub step_limit: f64,
}

impl Default for ChainFishing {
    fn default() -> Self {
        Self {
            timings: FishingTimings::default(),
            samples: 10,
            step_limit: 40.0,
        }
    }
}

fn exclamation_visible(frame: &Frame, region: &Region) -> Result<bool, DetectionError> {
    Ok(count_of_class(frame, region, WHITE)? > WHITE_PIXELS
        || count_of_class(frame, region, RED)? > RED_PIXELS)
}

impl Routine for ChainFishing {
    fn name(&self) -> &'static str {
        "chain-fishing"
    }

    fn description(&self) -> &'static str {
        "Builds a fishing chain to hunt shiny encounters (X/Y, ORAS)."
    }

    fn run(&self, ctx: &RoutineContext) -> Result<()> {
        let t = &self.timings;
        ctx.log("Chain fishing started.");
        ctx.log("Calibrate the exclamation mark area - draw a rectangle above your trainer.");

        let region = ctx.request_region("Draw a rectangle above the trainer's head (exclamation mark)");
        if ctx.is_cancelled() {
            return Ok(());
        }
        ctx.log(&format!("Detection region set: {}", region));
        ctx.log("The light sensor must be over the bottom 3DS screen.");

        let mut chain = 0u32;
        while !ctx.is_cancelled() {
            if !ctx.press_then_wait(Button::A, t.cast_secs)? {
                break;
            }

            let hook = ctx.poll_until(
                |frame| exclamation_visible(frame, &region),
                Duration::from_secs_f64(t.hook_window_secs),
            )?;
            if ctx.is_cancelled() {
                break;
            }
            if !hook.is_detected() {
                ctx.log(&format!("Chain {}: missed hook - resetting rod", chain));
                ctx.press_then_wait(Button::Left, t.nudge_secs)?;
                ctx.press_then_wait(Button::Right, t.nudge_secs)?;
                continue;
            }

            if !ctx.press_then_wait(Button::A, t.after_hook_secs + t.battle_secs)? {
                break;
            }

            let spacing = Duration::from_secs_f64(t.monitor_secs / self.samples.max(1) as f64);
            let Some(readings) = sample_series(self.samples, spacing, ctx.cancel_token(), || {
                ctx.controller().read_light().map(f64::from)
            })?
            else {
                break;
            };
            let step = step_change(&readings);
            ctx.log(&format!("Light step: {:.1} (limit {:.0})", step, self.step_limit));

            chain += 1;
            if classify_step(&readings, self.step_limit).is_detected() {
                ctx.log(&format!("*** Shiny on chain {}! Catch it! ***", chain));
                ctx.complete("Script paused - catch your shiny! Stop when done.");
                break;
            }

            ctx.log(&format!("Chain {}: not shiny - fleeing", chain));
            // Run is one to the right of Fight
            ctx.press_then_wait(Button::Right, t.nudge_secs)?;
            if !ctx.press_then_wait(Button::A, t.post_battle_secs)? {
                break;
            }
        }

        ctx.log("Chain fishing stopped.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::test_support::{wait_for_state, Harness};
    use crate::runtime::RoutineState;
    use image::{Rgb, RgbImage};

    const MARK: Region = Region::new(10, 0, 10, 10);

    fn fast() -> ChainFishing {
        ChainFishing {
            timings: FishingTimings {
                cast_secs: 0.001,
                hook_window_secs: 0.05,
                after_hook_secs: 0.001,
                battle_secs: 0.001,
                monitor_secs: 0.01,
                post_battle_secs: 0.001,
                nudge_secs: 0.001,
            },
            ..Default::default()
        }
    }

    fn scene(pixels: u32, colour: [u8; 3]) -> RgbImage {
        let mut frame = RgbImage::from_pixel(30, 10, Rgb([30, 90, 160]));
        for i in 0..pixels {
            frame.put_pixel(10 + i % 10, i / 10, Rgb(colour));
        }
        frame
    }

    #[test]
    fn test_exclamation_thresholds() {
        assert!(!exclamation_visible(&scene(20, [255, 255, 255]), &MARK).unwrap());
        assert!(exclamation_visible(&scene(21, [255, 255, 255]), &MARK).unwrap());
        assert!(!exclamation_visible(&scene(10, [220, 40, 40]), &MARK).unwrap());
        assert!(exclamation_visible(&scene(11, [220, 40, 40]), &MARK).unwrap());
        // Water colour alone never triggers
        assert!(!exclamation_visible(&scene(0, [0, 0, 0]), &MARK).unwrap());
    }

    #[test]
    fn test_missed_hook_nudges_rod() {
        let harness = Harness::new();
        harness.publish(scene(0, [0, 0, 0]));

        let mut runtime = harness.start(fast());
        harness.answer(MARK);
        harness.wait_for_log("Chain 0: missed hook - resetting rod");
        runtime.cancel();

        assert_eq!(runtime.join(), RoutineState::Cancelled);
        assert_eq!(harness.commands()[..3], ["press A", "press Left", "press Right"]);
    }

    #[test]
    fn test_chain_grows_until_light_step() {
        let harness = Harness::with_idle_light(300);
        harness.publish(scene(40, [255, 255, 255]));
        harness.queue_light(&[300; 10]);
        harness.queue_light(&[300, 300, 300, 300, 300, 380, 380, 380, 380, 380]);

        let mut runtime = harness.start(fast());
        harness.answer(MARK);
        wait_for_state(&runtime, RoutineState::Completed);

        assert!(harness.log.contains("Chain 1: not shiny - fleeing"));
        assert!(harness.log.contains("*** Shiny on chain 2! Catch it! ***"));
        assert!(harness.log.contains("Light step: 80.0 (limit 40)"));

        runtime.cancel();
        assert_eq!(runtime.join(), RoutineState::Completed);
        assert_eq!(
            harness.commands(),
            vec!["press A", "press A", "press Right", "press A", "press A", "press A"]
        );
    }
}
