//! # LocMgr Parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::drive::DriveParams;
use crate::loc::LocParams;
use crate::scan::ScanParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the localization manager and the modules it drives.
#[derive(Debug, Clone, Deserialize)]
pub struct LocMgrParams {
    /// Posterior probability above which the most likely pose is committed
    pub commit_threshold: f64,

    /// Number of scan attempts per intersection before the cycle degrades to
    /// a motion-only update
    pub max_scan_retries: u32,

    /// Cycles between belief snapshots saved to the session directory; zero
    /// disables snapshots
    pub belief_snapshot_period: u32,

    /// Sensor model parameters
    pub loc: LocParams,

    /// Intersection scanner parameters
    pub scan: ScanParams,

    /// Street driving parameters
    pub drive: DriveParams,
}
