//! # [`LocMgr<Scan>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use super::{
    states::BeliefUpdate, LocMgrError, LocMgrOutput, LocMgrParams, LocMgrPersistantData,
    LocMgrState, StackAction, StepOutput,
};
use crate::scan::ScanError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Scan state of the LocMgr.
///
/// Runs the intersection scanner. A successful scan carries its observation
/// into `BeliefUpdate`; after the retry budget is spent the cycle degrades
/// to a motion-only update.
#[derive(Debug)]
pub struct Scan {
    attempts: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Scan {
    pub fn new() -> Self {
        Self { attempts: 0 }
    }

    pub fn step(
        &mut self,
        params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        let result = persistant.scanner.scan(
            persistant.brick.as_mut(),
            &persistant.classifier,
            persistant.canonical_deg,
        );

        match result {
            Ok(observation) => {
                info!("Intersection scanned: {}", observation);

                Ok(StepOutput {
                    action: StackAction::Replace(LocMgrState::BeliefUpdate(
                        BeliefUpdate::with_observation(observation),
                    )),
                    data: LocMgrOutput::None,
                })
            }
            Err(ScanError::Brick(e)) => Err(LocMgrError::Brick(e)),
            Err(e) => {
                self.attempts += 1;
                warn!(
                    "Scan attempt {} of {} failed: {}",
                    self.attempts, params.max_scan_retries, e
                );

                if self.attempts >= params.max_scan_retries {
                    warn!("Scan retries exhausted, skipping the observation this cycle");
                    Ok(StepOutput {
                        action: StackAction::Replace(LocMgrState::BeliefUpdate(
                            BeliefUpdate::without_observation(),
                        )),
                        data: LocMgrOutput::None,
                    })
                } else {
                    Ok(StepOutput::none())
                }
            }
        }
    }
}
