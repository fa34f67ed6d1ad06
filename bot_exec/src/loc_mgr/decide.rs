//! # [`LocMgr<Decide>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use super::{
    states::{Committed, Drive},
    LocMgrError, LocMgrOutput, LocMgrParams, LocMgrPersistantData, LocMgrState, StackAction,
    StepOutput,
};
use crate::loc::Turn;
use crate::nav;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decide state of the LocMgr.
///
/// Commits to the most likely pose once it clears the commit threshold,
/// otherwise picks an exploration turn and goes back to driving. The
/// exploration policy prefers turns not recently taken at the believed
/// intersection, and among those, turns whose believed move stays on the
/// map.
#[derive(Debug)]
pub struct Decide;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Decide {
    pub fn new() -> Self {
        Self
    }

    pub fn step(
        &mut self,
        params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        let est = persistant.belief.most_likely();
        let pose = est.grid_pose(&persistant.map);

        info!(
            "Most likely pose: {} with probability {:.3}",
            pose, est.probability
        );

        if est.probability > params.commit_threshold {
            info!("Committing to {}", pose);

            return Ok(StepOutput {
                action: StackAction::Replace(LocMgrState::Committed(Committed::new(pose))),
                data: LocMgrOutput::Localized(pose),
            });
        }

        // Exploration: among turns that keep the believed pose on the map,
        // take the one least taken at this believed intersection
        let map = &persistant.map;
        let on_map: Vec<Turn> = Turn::ALL
            .iter()
            .copied()
            .filter(|t| nav::advanced_pose(map, &pose, *t).is_some())
            .collect();

        let candidates: &[Turn] = if on_map.is_empty() { &Turn::ALL } else { &on_map };

        let counts = persistant
            .turn_counts
            .entry(est.index)
            .or_insert([0; 4]);

        let mut turn = candidates[0];
        for t in candidates.iter() {
            if counts[t.index()] < counts[turn.index()] {
                turn = *t;
            }
        }

        counts[turn.index()] += 1;

        info!("Exploring with a {} at the next block", turn);

        persistant.driver.execute_turn(
            persistant.brick.as_mut(),
            turn,
            &mut persistant.canonical_deg,
        )?;
        persistant.last_turn = turn;

        Ok(StepOutput {
            action: StackAction::Replace(LocMgrState::Drive(Drive::on_street())),
            data: LocMgrOutput::None,
        })
    }
}
