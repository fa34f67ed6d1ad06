//! # LocMgr telemetry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-cycle summary of the localization state, archived as CSV and exposed
/// for display.
///
/// Kept to scalar fields so the CSV serializer stays happy.
#[derive(Debug, Clone, Serialize)]
pub struct LocTm {
    /// Belief-update cycles completed
    pub cycle: u32,

    /// Name of the manager state that produced this record
    pub state: String,

    /// Most likely intersection coordinates
    pub est_x: usize,
    pub est_y: usize,

    /// Most likely heading
    pub est_heading: String,

    /// Posterior probability of the most likely hypothesis
    pub est_probability: f64,

    /// Belief sum, as an invariant check (should always be 1)
    pub belief_sum: f64,

    /// Palette indices of the last observation, if one was taken
    pub obs_tl: Option<u8>,
    pub obs_tr: Option<u8>,
    pub obs_br: Option<u8>,
    pub obs_bl: Option<u8>,

    /// The last turn fed to the motion model
    pub last_turn: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LocTm {
    fn default() -> Self {
        Self {
            cycle: 0,
            state: String::from("init"),
            est_x: 0,
            est_y: 0,
            est_heading: String::new(),
            est_probability: 0.0,
            belief_sum: 1.0,
            obs_tl: None,
            obs_tr: None,
            obs_br: None,
            obs_bl: None,
            last_turn: String::new(),
        }
    }
}
