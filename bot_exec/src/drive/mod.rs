//! # Street driving module
//!
//! Gets the robot along streets and around corners using gyro feedback. The
//! driver holds the canonical street heading while driving (equal power
//! inside a deadband, inner wheel slowed outside it), stops when the
//! debounced colour reading becomes the intersection colour, and executes
//! 90 and 180 degree turns as a coarse-then-fine spin to a gyro target.
//!
//! Seeing the red map border while driving triggers an immediate
//! turn-around: the robot cannot leave the map, so it reverses and drives
//! back to the intersection it just left. The caller learns this through
//! [`DriveOutcome::BoundaryReversed`] and the canonical heading is rotated
//! half a turn.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::colour::{Classifier, Colour, DebouncedReader};
use crate::eqpt::{read_gyro_filtered, Brick, BrickError};
use crate::loc::Turn;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for street driving.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveParams {
    /// Wheel power while cruising along a street
    pub cruise_power: i32,

    /// Power of the slowed inner wheel during a heading correction
    pub slow_power: i32,

    /// Heading error (degrees) tolerated without correction
    pub heading_deadband_deg: i32,

    /// Wheel power during the coarse stage of a turn
    pub turn_power: i32,

    /// Wheel power during the fine stage of a turn
    pub fine_power: i32,

    /// Gyro tolerance ending the coarse stage of a turn
    pub turn_coarse_tol_deg: i32,

    /// Gyro tolerance ending the fine stage of a turn
    pub turn_fine_tol_deg: i32,

    /// Poll budget for each driving or turning phase
    pub max_polls: u32,

    /// Gyro samples averaged per heading reading
    pub gyro_samples: u32,
}

/// The street driver.
#[derive(Debug, Clone)]
pub struct StreetDriver {
    params: DriveParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a drive phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The robot stopped on the next intersection
    Intersection,

    /// The robot met the map border, turned around, and stopped back on the
    /// intersection it left; the canonical heading has been reversed
    BoundaryReversed,
}

/// Possible driving failures.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("No street found within the poll budget")]
    StreetNotFound,

    #[error("No intersection found within the poll budget")]
    IntersectionNotFound,

    #[error("Could not settle on the turn target of {target_deg} degrees")]
    TurnFailed { target_deg: i32 },

    #[error("Equipment error while driving: {0}")]
    Brick(#[from] BrickError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StreetDriver {
    pub fn new(params: DriveParams) -> Self {
        Self { params }
    }

    /// Drive forward until the sensor sees a street colour.
    ///
    /// Used once at startup in case the robot was placed off a street.
    pub fn find_street(
        &self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
        reader: &mut DebouncedReader,
    ) -> Result<(), DriveError> {
        for _ in 0..self.params.max_polls {
            let colour = reader.read(brick, classifier)?;

            if colour.is_street() {
                brick.stop_all()?;
                return Ok(());
            }

            brick
                .set_motor_power(self.params.cruise_power, self.params.cruise_power)?;
        }

        brick.stop_all()?;
        Err(DriveError::StreetNotFound)
    }

    /// Drive along the street to the next intersection.
    ///
    /// The canonical heading is updated in place if the map border forces a
    /// turn-around.
    pub fn to_next_intersection(
        &self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
        reader: &mut DebouncedReader,
        canonical_deg: &mut i32,
    ) -> Result<DriveOutcome, DriveError> {
        // Clear the intersection the robot is currently standing on
        for _ in 0..self.params.max_polls {
            let colour = reader.read(brick, classifier)?;

            if colour != Colour::Yellow {
                break;
            }

            brick
                .set_motor_power(self.params.cruise_power, self.params.cruise_power)?;
        }

        let mut reversed = false;

        // Follow the street until the next intersection
        for _ in 0..self.params.max_polls {
            let colour = reader.read(brick, classifier)?;
            trace!("Street colour: {}", colour);

            match colour {
                Colour::Yellow => {
                    brick.stop_all()?;
                    return Ok(if reversed {
                        DriveOutcome::BoundaryReversed
                    } else {
                        DriveOutcome::Intersection
                    });
                }
                Colour::Red if !reversed => {
                    info!("Map border ahead, turning around");

                    brick.stop_all()?;
                    self.spin_to(brick, *canonical_deg + 180)?;
                    *canonical_deg += 180;
                    reversed = true;
                }
                _ => {
                    self.hold_heading(brick, *canonical_deg)?;
                }
            }
        }

        brick.stop_all()?;
        Err(DriveError::IntersectionNotFound)
    }

    /// Execute a turn command at an intersection, updating the canonical
    /// heading.
    pub fn execute_turn(
        &self,
        brick: &mut dyn Brick,
        turn: Turn,
        canonical_deg: &mut i32,
    ) -> Result<(), DriveError> {
        if turn == Turn::Straight {
            return Ok(());
        }

        let target = *canonical_deg + turn.angle_deg();
        debug!("Executing {} to gyro target {}", turn, target);

        self.spin_to(brick, target)?;
        *canonical_deg = target;

        Ok(())
    }

    /// One heading-hold control step: equal power inside the deadband,
    /// slowed inner wheel outside it.
    fn hold_heading(&self, brick: &mut dyn Brick, canonical_deg: i32) -> Result<(), DriveError> {
        let angle = read_gyro_filtered(brick, self.params.gyro_samples)?;
        let err = angle - canonical_deg;

        let (left, right) = if err.abs() <= self.params.heading_deadband_deg {
            (self.params.cruise_power, self.params.cruise_power)
        } else if err < 0 {
            // Drifted anticlockwise: slow the right wheel to steer back
            (self.params.cruise_power, self.params.slow_power)
        } else {
            (self.params.slow_power, self.params.cruise_power)
        };

        brick.set_motor_power(left, right)?;

        Ok(())
    }

    /// Spin on the spot to the given gyro target, coarse then fine.
    fn spin_to(&self, brick: &mut dyn Brick, target_deg: i32) -> Result<(), DriveError> {
        self.spin_stage(brick, target_deg, self.params.turn_coarse_tol_deg, self.params.turn_power)?;
        self.spin_stage(brick, target_deg, self.params.turn_fine_tol_deg, self.params.fine_power)?;

        brick.stop_all()?;

        Ok(())
    }

    fn spin_stage(
        &self,
        brick: &mut dyn Brick,
        target_deg: i32,
        tol_deg: i32,
        power: i32,
    ) -> Result<(), DriveError> {
        for _ in 0..self.params.max_polls {
            let angle = read_gyro_filtered(brick, self.params.gyro_samples)?;
            let err = target_deg - angle;

            if err.abs() <= tol_deg {
                brick.stop_all()?;
                return Ok(());
            }

            // Positive error means the gyro must increase: spin clockwise
            let dir = err.signum();
            brick.set_motor_power(dir * power, -dir * power)?;
        }

        brick.stop_all()?;
        warn!("Turn did not settle on {} degrees", target_deg);
        Err(DriveError::TurnFailed {
            target_deg,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
