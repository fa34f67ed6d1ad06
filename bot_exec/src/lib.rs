//! # Bot library.
//!
//! This library allows the binaries in the crate to access the modules
//! defined inside it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Colour classification - turns raw RGB sensor readings into palette colours
pub mod colour;

/// Street driving - heading-held street following and turns
pub mod drive;

/// Equipment interface - the hardware surface of the robot
pub mod eqpt;

/// Localization estimator - the Bayesian filter over (intersection, heading)
pub mod loc;

/// Localization manager - the state machine running the localization cycle
pub mod loc_mgr;

/// Street map - the static grid of intersections and building colours
pub mod map;

/// Navigation - greedy turn choice and dead reckoning towards a target
pub mod nav;

/// Intersection scanner - reads the four building colours around the robot
pub mod scan;
