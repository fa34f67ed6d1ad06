//! # [`LocMgr<Committed>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use super::{
    states::Decide, LocMgrError, LocMgrOutput, LocMgrParams, LocMgrPersistantData, LocMgrState,
    StackAction, StepOutput,
};
use crate::drive::DriveOutcome;
use crate::loc::GridPose;
use crate::nav;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Committed state of the LocMgr.
///
/// The estimator has accepted a pose; each step takes one navigation move
/// towards the destination, dead-reckoning the pose and keeping the belief
/// motion-propagated alongside it. Commitment is a mode, not an exit:
/// evidence against the pose (a demanded move off the map, or an unexpected
/// border reversal) or an external request drops the machine back to
/// `Decide`.
#[derive(Debug)]
pub struct Committed {
    pose: GridPose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Committed {
    pub fn new(pose: GridPose) -> Self {
        Self { pose }
    }

    pub fn step(
        &mut self,
        _params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        if persistant.relocalize_requested {
            persistant.relocalize_requested = false;
            warn!("Re-localization requested, abandoning the committed pose");

            return Ok(StepOutput {
                action: StackAction::Replace(LocMgrState::Decide(Decide::new())),
                data: LocMgrOutput::None,
            });
        }

        // No turn needed means the believed pose is the destination
        let turn = match nav::turn_toward(&self.pose, &persistant.dest) {
            Some(turn) => turn,
            None => {
                info!("Arrived at destination {}", self.pose);
                persistant.brick.stop_all().map_err(LocMgrError::Brick)?;

                return Ok(StepOutput {
                    action: StackAction::Clear,
                    data: LocMgrOutput::Arrived(self.pose),
                });
            }
        };

        // A demand that would leave the map means the committed pose is
        // wrong
        let next = match nav::advanced_pose(&persistant.map, &self.pose, turn) {
            Some(next) => next,
            None => {
                warn!(
                    "Navigation from believed {} demands a move off the map, re-localizing",
                    self.pose
                );
                return Ok(StepOutput {
                    action: StackAction::Replace(LocMgrState::Decide(Decide::new())),
                    data: LocMgrOutput::None,
                });
            }
        };

        persistant.driver.execute_turn(
            persistant.brick.as_mut(),
            turn,
            &mut persistant.canonical_deg,
        )?;

        let outcome = persistant.driver.to_next_intersection(
            persistant.brick.as_mut(),
            &persistant.classifier,
            &mut persistant.reader,
            &mut persistant.canonical_deg,
        )?;

        persistant.last_turn = turn;
        persistant.belief.predict(turn);

        if outcome == DriveOutcome::BoundaryReversed {
            warn!("Met the map border where none was believed, re-localizing");

            return Ok(StepOutput {
                action: StackAction::Replace(LocMgrState::Decide(Decide::new())),
                data: LocMgrOutput::None,
            });
        }

        self.pose = next;
        info!("Dead-reckoned to {}", self.pose);

        Ok(StepOutput::none())
    }
}
