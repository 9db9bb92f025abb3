//! Interactive colour probe.
//!
//! The operator draws a region, then its average colour is logged at a fixed
//! cadence. Used to pick baselines and tolerances for new routines.

use anyhow::Result;
use std::time::Duration;

use crate::detection::average_colour;
use crate::runtime::{Routine, RoutineContext};

pub struct ColourMonitor {
    /// Time between logged samples
    pub sample_interval: Duration,
    /// Retry delay while no frame is available
    pub frame_retry: Duration,
}

impl Default for ColourMonitor {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(500),
            frame_retry: Duration::from_millis(100),
        }
    }
}

impl Routine for ColourMonitor {
    fn name(&self) -> &'static str {
        "colour-monitor"
    }

    fn description(&self) -> &'static str {
        "Select a region on the video feed and log its average RGB values."
    }

    fn run(&self, ctx: &RoutineContext) -> Result<()> {
        ctx.log("Colour monitor started.");

        let region = ctx.request_region("Click and drag to select a region");
        if ctx.is_cancelled() {
            return Ok(());
        }
        ctx.log(&format!("Region selected: {}", region));
        ctx.log(&format!(
            "Logging average RGB values every {:.1} seconds...",
            self.sample_interval.as_secs_f64()
        ));

        let mut count = 0u32;
        while !ctx.is_cancelled() {
            let Some(frame) = ctx.latest_frame() else {
                if !ctx.wait(self.frame_retry) {
                    break;
                }
                continue;
            };

            let sample = average_colour(&frame, &region)?;
            count += 1;
            ctx.log(&format!(
                "Sample {:4} - R: {:6.1}  G: {:6.1}  B: {:6.1}",
                count, sample.r, sample.g, sample.b
            ));

            if !ctx.wait(self.sample_interval) {
                break;
            }
        }

        ctx.log("Colour monitor finished.");
        Ok(())
    }
}
