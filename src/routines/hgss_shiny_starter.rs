//! HeartGold / SoulSilver starter hunt.
//!
//! Calibration records one region per starter sprite and its normal colour.
//! Each cycle walks the menus to the starter selection, compares every
//! sprite against its baseline and soft-resets when nothing differs. A
//! deviation is re-checked after a short delay to rule out transition
//! frames before the run is paused.

use anyhow::{bail, Result};

use crate::calibration::{CalibrationRecord, Deviation, StoredCalibration, DEFAULT_TOLERANCE};
use crate::detection::average_colour;
use crate::hardware::{Button, ResetKind};
use crate::runtime::{Routine, RoutineContext};

pub const STARTERS: [&str; 3] = ["Chikorita", "Cyndaquil", "Totodile"];

/// Delays in seconds. Defaults are tuned for a 3DS running the DS title.
#[derive(Clone, Debug)]
pub struct HgssTimings {
    /// After each of the first four A presses
    pub menu_secs: [f64; 4],
    /// After the final A press, before the starters are on screen
    pub encounter_secs: f64,
    /// After pressing Left to scroll to the next starter
    pub left_move_secs: f64,
    /// Before re-checking a suspected deviation
    pub recheck_secs: f64,
    /// After a soft reset while the game reloads
    pub soft_reset_secs: f64,
    /// Before sampling a freshly drawn baseline region
    pub baseline_settle_secs: f64,
}

impl Default for HgssTimings {
    fn default() -> Self {
        Self {
            menu_secs: [5.0, 7.0, 4.0, 4.0],
            encounter_secs: 3.0,
            left_move_secs: 1.5,
            recheck_secs: 3.0,
            soft_reset_secs: 12.0,
            baseline_settle_secs: 0.1,
        }
    }
}

#[derive(Default)]
pub struct HgssShinyStarter {
    pub timings: HgssTimings,
}

impl Routine for HgssShinyStarter {
    fn name(&self) -> &'static str {
        "hgss-shiny-starter"
    }

    fn description(&self) -> &'static str {
        "Soft-resets HeartGold/SoulSilver until a shiny starter is found. Requires calibration on first run."
    }

    fn run(&self, ctx: &RoutineContext) -> Result<()> {
        ctx.log("HGSS shiny starter started.");

        let record = match self.load_calibration(ctx) {
            Some(record) => record,
            None => {
                ctx.log("No calibration found - starting calibration for all 3 starters.");
                let Some(record) = self.calibrate(ctx)? else {
                    return Ok(());
                };
                let path = ctx.store().save(self.name(), &record)?;
                ctx.log(&format!("Calibration saved to {}", path.display()));
                record
            }
        };

        ctx.log(&format!(
            "Tolerance: +/-{}   Monitoring {} starter regions.",
            record.tolerance,
            STARTERS.len()
        ));
        ctx.log("Soft reset loop running. Stop at any time.");

        let t = &self.timings;
        let mut resets = 0u32;

        while !ctx.is_cancelled() {
            if !self.open_starter_selection(ctx)? {
                break;
            }

            if let Some(deviation) = self.find_deviation(ctx, &record)? {
                ctx.log(&format!(
                    "*** Shiny detected! Starter {} ({}) - {} (baseline {}) ***",
                    deviation.index + 1,
                    STARTERS[deviation.index],
                    deviation.sample,
                    deviation.baseline
                ));
                ctx.log(&format!("Soft resets before shiny: {}", resets));
                ctx.complete("Script paused - catch your shiny! Stop when done.");
                break;
            }
            if ctx.is_cancelled() {
                break;
            }

            resets += 1;
            ctx.log(&format!("No shiny. Soft reset #{}...", resets));
            if !ctx.soft_reset_then_wait(ResetKind::Standard, t.soft_reset_secs)? {
                break;
            }
        }

        ctx.log("HGSS shiny starter stopped.");
        Ok(())
    }
}

impl HgssShinyStarter {
    fn load_calibration(&self, ctx: &RoutineContext) -> Option<CalibrationRecord> {
        match ctx.store().inspect(self.name()) {
            StoredCalibration::Found(record)
                if record.is_consistent() && record.regions.len() == STARTERS.len() =>
            {
                ctx.log("Loaded saved calibration.");
                Some(record)
            }
            StoredCalibration::Found(_) => {
                ctx.log("Ignoring saved calibration: wrong number of regions.");
                None
            }
            StoredCalibration::Unreadable(reason) => {
                ctx.log(&format!("Ignoring saved calibration: {}", reason));
                None
            }
            StoredCalibration::Missing => None,
        }
    }

    /// Walks the operator through drawing one region per starter.
    ///
    /// Returns `None` if the run is cancelled. Fails if no frame can be sampled.
    fn calibrate(&self, ctx: &RoutineContext) -> Result<Option<CalibrationRecord>> {
        let mut record = CalibrationRecord::new(DEFAULT_TOLERANCE);

        for (i, name) in STARTERS.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(None);
            }
            ctx.log(&format!(
                "Calibrating starter {}/{}: {}",
                i + 1,
                STARTERS.len(),
                name
            ));

            let region = ctx.request_region(&format!(
                "Draw a region over {}'s sprite ({}/{})",
                name,
                i + 1,
                STARTERS.len()
            ));
            if ctx.is_cancelled() {
                return Ok(None);
            }
            ctx.log(&format!("{} region: {}", name, region));

            ctx.wait_secs(self.timings.baseline_settle_secs);
            let Some(frame) = ctx.latest_frame() else {
                bail!(
                    "cannot sample {}'s baseline: {} - check that the video source is connected",
                    name,
                    ctx.describe_frames()
                );
            };
            let baseline = average_colour(&frame, &region)?;
            ctx.log(&format!("{} baseline - {}", name, baseline));
            record.push(region, baseline);

            if i + 1 < STARTERS.len() {
                ctx.press_then_wait(Button::Left, self.timings.left_move_secs)?;
            }
        }

        ctx.log(&format!(
            "Calibration regions set. Using default colour tolerance of {}.",
            DEFAULT_TOLERANCE
        ));
        ctx.log("(To change this, edit 'tolerance' in the calibration file.)");
        Ok(Some(record))
    }

    /// Presses through the menus up to the starter selection screen.
    fn open_starter_selection(&self, ctx: &RoutineContext) -> Result<bool> {
        let t = &self.timings;
        for delay in t.menu_secs.iter().chain(std::iter::once(&t.encounter_secs)) {
            if !ctx.press_then_wait(Button::A, *delay)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Checks each starter in turn, scrolling left between them.
    ///
    /// Returns the first region that left its baseline and was still off
    /// after the re-check delay. A deviation that does not survive the
    /// re-check is treated as a transition frame and scanning continues.
    fn find_deviation(
        &self,
        ctx: &RoutineContext,
        record: &CalibrationRecord,
    ) -> Result<Option<Deviation>> {
        let t = &self.timings;
        for i in 0..STARTERS.len() {
            if ctx.is_cancelled() {
                return Ok(None);
            }

            let suspected = match ctx.latest_frame() {
                Some(frame) => record.check(&frame, i)?.is_some(),
                None => false,
            };
            if suspected {
                if !ctx.wait_secs(t.recheck_secs) {
                    return Ok(None);
                }
                if let Some(frame) = ctx.latest_frame() {
                    if let Some(deviation) = record.check(&frame, i)? {
                        return Ok(Some(deviation));
                    }
                }
            }

            if i + 1 < STARTERS.len() && !ctx.press_then_wait(Button::Left, t.left_move_secs)? {
                return Ok(None);
            }
        }
        Ok(None)
    }
}
