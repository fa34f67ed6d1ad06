//! Parameters structure for the localization estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the sensor fusion step of the estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct LocParams {
    /// Probability assigned to a single observed colour agreeing with the
    /// map when the hypothesis is correct.
    pub p_match: f64,

    /// Probability assigned to a single observed colour when it disagrees
    /// with the map. Must be greater than zero so that no observation can
    /// zero out the whole distribution.
    pub p_mismatch: f64,
}
