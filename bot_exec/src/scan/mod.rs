//! # Intersection scanner module
//!
//! With the robot stopped on an intersection, the scanner reads the four
//! building colours around it by pivoting the robot towards each corner in
//! turn: top-left, top-right, bottom-right, bottom-left, relative to the
//! robot's own heading. Each sub-scan pivots on one wheel until the
//! debounced colour reading leaves the street colours (black and yellow),
//! records the building colour it finds, then pivots back until the sensor
//! is over yellow again and the gyro is within tolerance of the
//! intersection's canonical heading.
//!
//! Every sub-scan is bounded by a poll budget; running out is a scan
//! failure, which the localization manager treats as a skipped observation
//! after its own retries.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::colour::{Classifier, Colour, DebouncedReader};
use crate::eqpt::{Brick, BrickError};
use crate::loc::Observation;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Corner names for diagnostics, clockwise from top-left.
const CORNER_NAMES: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the intersection scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanParams {
    /// Motor power used to pivot towards a corner
    pub pivot_power: i32,

    /// Poll budget per corner sub-scan (outward and return sweeps each)
    pub max_polls: u32,

    /// Gyro tolerance around the canonical heading for the return sweep
    pub return_tol_deg: i32,
}

/// The intersection scanner.
#[derive(Debug, Clone)]
pub struct Scanner {
    params: ScanParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible scan failures.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No stable building colour found at corner {0}")]
    NoStableColour(usize),

    #[error("Could not return to the intersection centre from corner {0}")]
    ReturnFailed(usize),

    #[error("Equipment error during scan: {0}")]
    Brick(#[from] BrickError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scanner {
    pub fn new(params: ScanParams) -> Self {
        Self { params }
    }

    /// Scan the four corner colours of the current intersection.
    ///
    /// `canonical_deg` is the gyro angle of the street the robot arrived
    /// along; each sub-scan returns the robot to it before the next corner.
    pub fn scan(
        &self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
        canonical_deg: i32,
    ) -> Result<Observation, ScanError> {
        let p = self.params.pivot_power;

        // Pivot powers per corner, clockwise from top-left
        let pivots: [(i32, i32); 4] = [(0, p), (p, 0), (0, -p), (-p, 0)];

        let mut colours = [Colour::Yellow; 4];
        let mut reader = DebouncedReader::new();

        for (corner, pivot) in pivots.iter().enumerate() {
            colours[corner] = self.sweep_out(brick, classifier, &mut reader, corner, *pivot)?;

            debug!(
                "Scanned {} corner: {}",
                CORNER_NAMES[corner], colours[corner]
            );

            // Anything other than green, blue or white is a misread; it is
            // still recorded and left for the sensor model to discount.
            if !colours[corner].is_building() {
                warn!(
                    "The {} corner read {}, which no building should be",
                    CORNER_NAMES[corner], colours[corner]
                );
            }

            self.sweep_back(brick, classifier, &mut reader, corner, *pivot, canonical_deg)?;
        }

        brick.stop_all()?;

        Ok(Observation(colours))
    }

    /// Pivot towards a corner until the reading leaves the street colours.
    fn sweep_out(
        &self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
        reader: &mut DebouncedReader,
        corner: usize,
        pivot: (i32, i32),
    ) -> Result<Colour, ScanError> {
        for _ in 0..self.params.max_polls {
            brick.set_motor_power(pivot.0, pivot.1)?;

            let colour = reader.read(brick, classifier)?;
            trace!("Sweep out {}: {}", CORNER_NAMES[corner], colour);

            if !colour.is_street() {
                brick.stop_all()?;
                return Ok(colour);
            }
        }

        brick.stop_all()?;
        Err(ScanError::NoStableColour(corner))
    }

    /// Pivot back until the sensor is over the intersection centre and the
    /// gyro agrees with the canonical heading.
    fn sweep_back(
        &self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
        reader: &mut DebouncedReader,
        corner: usize,
        pivot: (i32, i32),
        canonical_deg: i32,
    ) -> Result<(), ScanError> {
        for _ in 0..self.params.max_polls {
            brick.set_motor_power(-pivot.0, -pivot.1)?;

            let colour = reader.read(brick, classifier)?;
            let angle = brick.read_gyro_deg()?;

            if colour == Colour::Yellow
                && (angle - canonical_deg).abs() <= self.params.return_tol_deg
            {
                brick.stop_all()?;
                return Ok(());
            }
        }

        brick.stop_all()?;
        Err(ScanError::ReturnFailed(corner))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "sim"))]
mod test {
    use super::*;
    use crate::colour::ColourParams;
    use crate::eqpt::sim::{nominal_calibration, nominal_rgb, ScriptedBrick, SimBrick, SimParams};
    use crate::loc::Heading;
    use crate::map::StreetMap;

    fn test_map() -> StreetMap {
        let corners = vec![
            [Colour::Green, Colour::Blue, Colour::White, Colour::Green],
            [Colour::Blue, Colour::Blue, Colour::Green, Colour::White],
            [Colour::White, Colour::Green, Colour::Blue, Colour::Blue],
            [Colour::Green, Colour::Green, Colour::Green, Colour::Blue],
            [Colour::Blue, Colour::White, Colour::White, Colour::Green],
            [Colour::White, Colour::White, Colour::Blue, Colour::Green],
            [Colour::Green, Colour::Blue, Colour::Blue, Colour::White],
            [Colour::White, Colour::Green, Colour::White, Colour::Blue],
            [Colour::Blue, Colour::Green, Colour::Blue, Colour::White],
        ];
        StreetMap::from_corners(3, 3, corners).unwrap()
    }

    fn test_classifier() -> Classifier {
        Classifier::new(
            nominal_calibration(),
            ColourParams {
                sat_threshold: 50.0,
                val_threshold: 50.0,
                confirm_count: 3,
            },
        )
    }

    fn test_sim(start_heading: Heading) -> SimBrick {
        SimBrick::new(
            test_map(),
            SimParams {
                start_x: 1,
                start_y: 1,
                start_heading,
                block_ticks: 10,
                border_ticks: 4,
                sweep_rate_deg: 2,
                turn_rate_deg: 5,
                building_angle_deg: 20,
                colour_misread_prob: 0.0,
                seed: 1,
            },
        )
    }

    fn test_scanner() -> Scanner {
        Scanner::new(ScanParams {
            pivot_power: 10,
            max_polls: 400,
            return_tol_deg: 5,
        })
    }

    #[test]
    fn test_scan_reads_corners_facing_up() {
        let mut brick = test_sim(Heading::Up);
        let obs = test_scanner()
            .scan(&mut brick, &test_classifier(), 0)
            .unwrap();

        // Facing up the observation matches the stored map order
        assert_eq!(obs.0, *test_map().corners(4));
    }

    #[test]
    fn test_scan_reads_corners_in_robot_frame() {
        let mut brick = test_sim(Heading::Right);
        let obs = test_scanner()
            .scan(&mut brick, &test_classifier(), 0)
            .unwrap();

        // Facing right the view is the stored colours rotated one position
        assert_eq!(obs.0, test_map().corners_facing(4, Heading::Right));
    }

    #[test]
    fn test_scan_fails_without_stable_colour() {
        // A sensor stuck on street black never produces a building colour
        let mut brick = ScriptedBrick::new();
        for _ in 0..2000 {
            brick.rgb.push_back(nominal_rgb(Colour::Black));
        }

        let result = test_scanner().scan(&mut brick, &test_classifier(), 0);

        assert!(matches!(result, Err(ScanError::NoStableColour(0))));
    }
}
