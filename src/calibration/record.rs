//! Persisted calibration data for one routine.

use serde::{Deserialize, Serialize};

use crate::capture::Frame;
use crate::detection::{average_colour, ColourSample, Region};
use crate::error::DetectionError;

/// Tolerance used when a routine calibrates without operator input.
pub const DEFAULT_TOLERANCE: u32 = 15;

/// Regions, one baseline colour per region, and a shared tolerance.
///
/// Stored as pretty-printed JSON so the tolerance can be edited by hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub regions: Vec<Region>,
    pub baselines: Vec<ColourSample>,
    pub tolerance: u32,
}

/// A region whose current colour left its baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deviation {
    pub index: usize,
    pub sample: ColourSample,
    pub baseline: ColourSample,
}

impl CalibrationRecord {
    pub fn new(tolerance: u32) -> Self {
        Self {
            regions: Vec::new(),
            baselines: Vec::new(),
            tolerance,
        }
    }

    /// Adds a region together with its baseline colour.
    pub fn push(&mut self, region: Region, baseline: ColourSample) {
        self.regions.push(region);
        self.baselines.push(baseline);
    }

    /// Region/baseline pairs. Extra entries on either side are ignored.
    pub fn entries(&self) -> impl Iterator<Item = (&Region, &ColourSample)> {
        self.regions.iter().zip(self.baselines.iter())
    }

    /// True if every region has exactly one baseline.
    pub fn is_consistent(&self) -> bool {
        !self.regions.is_empty() && self.regions.len() == self.baselines.len()
    }

    /// Samples region `index` in `frame` and reports it if it left its baseline.
    pub fn check(&self, frame: &Frame, index: usize) -> Result<Option<Deviation>, DetectionError> {
        let (Some(region), Some(baseline)) = (self.regions.get(index), self.baselines.get(index))
        else {
            return Ok(None);
        };

        let sample = average_colour(frame, region)?;
        if sample.deviates_from(baseline, self.tolerance) {
            Ok(Some(Deviation {
                index,
                sample,
                baseline: *baseline,
            }))
        } else {
            Ok(None)
        }
    }
}
