//! Built-in automation routines.
//!
//! Routines are registered explicitly in [`registry`]; the binary looks them
//! up by name. Each routine owns its timings so they can be tuned per setup.

pub mod bdsp_shiny_starter;
pub mod chain_fishing;
pub mod colour_monitor;
pub mod dp_shiny_starter;
pub mod hgss_shiny_starter;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::Result;
use std::sync::Arc;

use crate::hardware::Button;
use crate::runtime::{Routine, RoutineContext};

pub use bdsp_shiny_starter::BdspShinyStarter;
pub use chain_fishing::ChainFishing;
pub use colour_monitor::ColourMonitor;
pub use dp_shiny_starter::DpShinyStarter;
pub use hgss_shiny_starter::HgssShinyStarter;
pub use light_sensor_test::LightSensorTest;

/// Every routine shipped with the engine, in display order.
pub fn registry() -> Vec<Arc<dyn Routine>> {
    vec![
        Arc::new(ColourMonitor::default()),
        Arc::new(LightSensorTest::default()),
        Arc::new(HgssShinyStarter::default()),
        Arc::new(BdspShinyStarter::default()),
        Arc::new(DpShinyStarter::default()),
        Arc::new(ChainFishing::default()),
    ]
}

/// Looks up a registered routine by name.
pub fn find_routine(name: &str) -> Option<Arc<dyn Routine>> {
    registry().into_iter().find(|routine| routine.name() == name)
}

/// Starter choice for the Sinnoh titles. The selection screen opens on Turtwig.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SinnohStarter {
    #[default]
    Turtwig,
    Chimchar,
    Piplup,
}

impl SinnohStarter {
    pub fn name(&self) -> &'static str {
        match self {
            SinnohStarter::Turtwig => "Turtwig",
            SinnohStarter::Chimchar => "Chimchar",
            SinnohStarter::Piplup => "Piplup",
        }
    }

    fn right_presses(&self) -> usize {
        match self {
            SinnohStarter::Turtwig => 0,
            SinnohStarter::Chimchar => 1,
            SinnohStarter::Piplup => 2,
        }
    }

    /// Moves the cursor from Turtwig to this starter.
    ///
    /// Returns `false` if cancelled part way.
    pub(crate) fn select(&self, ctx: &RoutineContext, step_secs: f64) -> Result<bool> {
        for _ in 0..self.right_presses() {
            if !ctx.press_then_wait(Button::Right, step_secs)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique_and_valid_keys() {
        let routines = registry();
        let names: HashSet<_> = routines.iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), routines.len());

        let store = crate::calibration::CalibrationStore::new("unused");
        for routine in &routines {
            assert!(store.path_for(routine.name()).is_ok());
            assert!(!routine.description().is_empty());
        }
    }

    #[test]
    fn test_find_routine() {
        assert_eq!(
            find_routine("light-sensor-test").map(|r| r.name()),
            Some("light-sensor-test")
        );
        assert!(find_routine("missing").is_none());
    }
}
