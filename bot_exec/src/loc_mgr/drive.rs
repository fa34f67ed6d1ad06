//! # [`LocMgr<Drive>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use super::{
    states::Scan, LocMgrError, LocMgrParams, LocMgrPersistantData, LocMgrState, StackAction,
    StepOutput,
};
use crate::drive::DriveOutcome;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive state of the LocMgr.
///
/// Follows the street to the next intersection, then hands over to `Scan`.
/// On the very first cycle the robot may have been placed anywhere, so a
/// street is found first.
#[derive(Debug)]
pub struct Drive {
    /// Whether the robot is known to be on a street yet
    on_street: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Drive {
    /// A drive from an unknown placement; finds a street first.
    pub fn new() -> Self {
        Self { on_street: false }
    }

    /// A drive starting from an intersection the robot is already on.
    pub fn on_street() -> Self {
        Self { on_street: true }
    }

    pub fn step(
        &mut self,
        _params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        if !self.on_street {
            persistant.driver.find_street(
                persistant.brick.as_mut(),
                &persistant.classifier,
                &mut persistant.reader,
            )?;
            self.on_street = true;
            info!("Street found");
        }

        let outcome = persistant.driver.to_next_intersection(
            persistant.brick.as_mut(),
            &persistant.classifier,
            &mut persistant.reader,
            &mut persistant.canonical_deg,
        )?;

        if outcome == DriveOutcome::BoundaryReversed {
            // The dead-end reversal is part of the motion model's boundary
            // rule, so the belief update proceeds as normal.
            info!("Turned around at the map border");
        }

        Ok(StepOutput {
            action: StackAction::Replace(LocMgrState::Scan(Scan::new())),
            data: super::LocMgrOutput::None,
        })
    }
}
