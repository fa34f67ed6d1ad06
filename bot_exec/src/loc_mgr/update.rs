//! # [`LocMgr<BeliefUpdate>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};

use super::{
    states::Decide, LocMgrError, LocMgrOutput, LocMgrParams, LocMgrPersistantData, LocMgrState,
    StackAction, StepOutput,
};
use crate::loc::{Observation, UpdateOutcome};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// BeliefUpdate state of the LocMgr.
///
/// Pure computation: propagates the belief through the last turn, fuses the
/// observation if one was obtained, and records the cycle's telemetry.
#[derive(Debug)]
pub struct BeliefUpdate {
    observation: Option<Observation>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BeliefUpdate {
    pub fn with_observation(observation: Observation) -> Self {
        Self {
            observation: Some(observation),
        }
    }

    pub fn without_observation() -> Self {
        Self { observation: None }
    }

    pub fn step(
        &mut self,
        params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        // Motion update for the turn taken before this intersection
        persistant.belief.predict(persistant.last_turn);

        // Observation update, when the scan produced one
        match self.observation {
            Some(ref obs) => {
                let outcome =
                    persistant
                        .belief
                        .update(obs, &persistant.map, &params.loc);

                if outcome == UpdateOutcome::Degenerate {
                    warn!("Observation assigned zero mass everywhere, cycle is uninformative");
                }
            }
            None => {
                debug!("No observation this cycle, motion update only");
            }
        }

        persistant.cycle += 1;

        // Telemetry for this cycle
        let est = persistant.belief.most_likely();
        let (est_x, est_y) = persistant.map.coords(est.index);
        let obs_indices = self.observation.map(|o| o.indices());

        persistant.tm = super::LocTm {
            cycle: persistant.cycle,
            state: String::from("LocMgrState::BeliefUpdate"),
            est_x,
            est_y,
            est_heading: est.heading.to_string(),
            est_probability: est.probability,
            belief_sum: persistant.belief.sum(),
            obs_tl: obs_indices.map(|o| o[0]),
            obs_tr: obs_indices.map(|o| o[1]),
            obs_br: obs_indices.map(|o| o[2]),
            obs_bl: obs_indices.map(|o| o[3]),
            last_turn: persistant.last_turn.to_string(),
        };
        persistant.archive_tm();

        // Periodic belief snapshot into the session directory
        if params.belief_snapshot_period > 0
            && persistant.cycle % params.belief_snapshot_period == 0
        {
            if let Some(ref session) = persistant.session {
                session.save(
                    format!("belief/cycle_{:04}.json", persistant.cycle),
                    persistant.belief.clone(),
                );
            }
        }

        Ok(StepOutput {
            action: StackAction::Replace(LocMgrState::Decide(Decide::new())),
            data: LocMgrOutput::None,
        })
    }
}
