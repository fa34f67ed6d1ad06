//! Simulated brick
//!
//! A deterministic grid-level world implementing the [`Brick`] trait. It
//! tracks the robot's true pose on the parsed map and synthesises colour and
//! gyro readings from the motor demands, one simulation tick per sensor
//! read. The drive, scan and localization code run against it unmodified,
//! which is what the integration tests and the `loc_test` binary rely on.
//!
//! Misreads are injected from a seeded linear congruential generator so
//! noisy runs are reproducible.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::collections::VecDeque;

// Internal
use super::{Brick, BrickError};
use crate::colour::{CalibrationData, Colour, rgb_to_hsv};
use crate::loc::{GridPose, Heading};
use crate::map::StreetMap;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Corner indices in the observation frame, clockwise from top-left.
const TOP_LEFT: usize = 0;
const TOP_RIGHT: usize = 1;
const BOTTOM_RIGHT: usize = 2;
const BOTTOM_LEFT: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated brick.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// True starting intersection
    pub start_x: usize,
    pub start_y: usize,

    /// True starting heading
    pub start_heading: Heading,

    /// Simulation ticks to drive one block
    pub block_ticks: u32,

    /// Ticks past an edge intersection at which the red border is seen
    pub border_ticks: u32,

    /// Gyro degrees per tick while pivoting on one wheel
    pub sweep_rate_deg: i32,

    /// Gyro degrees per tick while spinning on the spot
    pub turn_rate_deg: i32,

    /// Sweep angle beyond which the sensor sits over a corner building
    pub building_angle_deg: i32,

    /// Probability of a single colour read returning a random colour
    pub colour_misread_prob: f64,

    /// Seed for the misread generator
    pub seed: u64,
}

/// The simulated brick.
pub struct SimBrick {
    map: StreetMap,
    params: SimParams,

    /// Last intersection reached
    cell: (usize, usize),

    /// Tick offset from the cell along the street being driven
    offset: (i64, i64),

    /// Accumulated gyro angle, clockwise positive
    gyro: i32,

    /// True heading at gyro zero
    ref_heading: Heading,

    /// Current motor powers
    powers: (i32, i32),

    /// Misread generator state
    rng: u64,
}

/// A brick that replays scripted sensor readings, for unit tests of the
/// polling and debouncing layers.
#[derive(Default)]
pub struct ScriptedBrick {
    pub rgb: VecDeque<[i32; 3]>,
    pub gyro: VecDeque<i32>,
    pub last_gyro: i32,
    pub stop_count: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimBrick {
    pub fn new(map: StreetMap, params: SimParams) -> Self {
        let rng = params.seed.wrapping_mul(2862933555777941757).wrapping_add(1);
        Self {
            cell: (params.start_x, params.start_y),
            offset: (0, 0),
            gyro: 0,
            ref_heading: params.start_heading,
            powers: (0, 0),
            rng,
            map,
            params,
        }
    }

    /// The robot's true pose, for test assertions and trial reporting.
    pub fn true_pose(&self) -> GridPose {
        GridPose::new(self.cell.0, self.cell.1, self.heading())
    }

    /// True heading, derived from the accumulated gyro angle.
    fn heading(&self) -> Heading {
        let quarters = (self.gyro as f64 / 90.0).round() as i64;
        rotate_quarters(self.ref_heading, quarters)
    }

    /// Gyro deviation from the nearest street heading.
    fn sweep_off(&self) -> i32 {
        let quarters = (self.gyro as f64 / 90.0).round() as i32;
        self.gyro - quarters * 90
    }

    /// Advance the world by one tick based on the current motor demands.
    ///
    /// Colour reads advance both translation and rotation; gyro reads
    /// advance rotation only, since in reality the gyro is polled far faster
    /// than the robot covers ground.
    fn tick(&mut self, translate: bool) {
        let (l, r) = self.powers;

        if l == 0 && r == 0 {
            return;
        }

        if l == r {
            // Both wheels together: drive along the current heading
            if translate {
                let dir = if l > 0 {
                    self.heading()
                } else {
                    self.heading().opposite()
                };
                self.advance(dir);
            }
        } else if l == -r {
            // Spin on the spot; left wheel forward spins clockwise
            let sign = l.signum();
            self.gyro += sign * scaled_rate(self.params.turn_rate_deg, l);
        } else if l == 0 || r == 0 {
            // Pivot on one wheel
            let active = if l != 0 { l } else { r };
            let sign = if l != 0 { l.signum() } else { -r.signum() };
            self.gyro += sign * scaled_rate(self.params.sweep_rate_deg, active);
        } else {
            // Differential drive (heading-hold correction): still a forward
            // step at grid scale
            if translate {
                let dir = if l + r > 0 {
                    self.heading()
                } else {
                    self.heading().opposite()
                };
                self.advance(dir);
            }
        }
    }

    fn advance(&mut self, dir: Heading) {
        let (dx, dy) = dir.step();
        self.offset.0 += dx;
        self.offset.1 += dy;

        let dist = self.offset.0.abs().max(self.offset.1.abs());

        if dist >= self.params.block_ticks as i64 {
            let unit = (self.offset.0.signum(), self.offset.1.signum());
            let nx = self.cell.0 as i64 + unit.0;
            let ny = self.cell.1 as i64 + unit.1;

            if self.map.contains(nx, ny) {
                self.cell = (nx as usize, ny as usize);
                self.offset = (0, 0);
            } else {
                // Off the map edge; the robot keeps rolling over the border
                // sheet until the driver turns it around
                let cap = (self.params.block_ticks * 2) as i64;
                self.offset.0 = self.offset.0.clamp(-cap, cap);
                self.offset.1 = self.offset.1.clamp(-cap, cap);
            }
        }
    }

    /// The palette colour currently under the sensor.
    fn colour_under_sensor(&self) -> Colour {
        let dist = self.offset.0.abs().max(self.offset.1.abs());

        if dist == 0 {
            // At an intersection: the sensor reads yellow unless the robot
            // has pivoted far enough to put it over a corner building
            let sweep = self.sweep_off();
            if sweep.abs() >= self.params.building_angle_deg {
                let index = self.map.index(self.cell.0, self.cell.1);
                let seen = self.map.corners_facing(index, self.heading());
                return seen[self.pivot_corner(sweep)];
            }
            return Colour::Yellow;
        }

        // On a street; past the edge the red border appears
        let unit = (self.offset.0.signum(), self.offset.1.signum());
        let nx = self.cell.0 as i64 + unit.0;
        let ny = self.cell.1 as i64 + unit.1;

        if !self.map.contains(nx, ny) && dist >= self.params.border_ticks as i64 {
            Colour::Red
        } else {
            Colour::Black
        }
    }

    /// Which corner the sensor is over, given the active pivot wheel and the
    /// sweep direction.
    fn pivot_corner(&self, sweep: i32) -> usize {
        let (l, _r) = self.powers;
        let right_wheel_active = l == 0;

        match (right_wheel_active, sweep < 0) {
            (true, true) => TOP_LEFT,
            (true, false) => BOTTOM_RIGHT,
            (false, false) => TOP_RIGHT,
            (false, true) => BOTTOM_LEFT,
        }
    }

    /// Draw from the misread generator.
    fn next_rand(&mut self) -> f64 {
        self.rng = self
            .rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl Brick for SimBrick {
    fn read_colour_rgb(&mut self) -> Result<[i32; 3], BrickError> {
        self.tick(true);

        let mut colour = self.colour_under_sensor();

        if self.params.colour_misread_prob > 0.0
            && self.next_rand() < self.params.colour_misread_prob
        {
            let palette = [
                Colour::Black,
                Colour::Blue,
                Colour::Green,
                Colour::Yellow,
                Colour::Red,
                Colour::White,
            ];
            colour = palette[(self.next_rand() * palette.len() as f64) as usize % palette.len()];
        }

        Ok(nominal_rgb(colour))
    }

    fn read_gyro_deg(&mut self) -> Result<i32, BrickError> {
        self.tick(false);
        Ok(self.gyro)
    }

    fn set_motor_power(&mut self, left: i32, right: i32) -> Result<(), BrickError> {
        self.powers = (left, right);
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), BrickError> {
        self.powers = (0, 0);
        Ok(())
    }
}

impl ScriptedBrick {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Brick for ScriptedBrick {
    fn read_colour_rgb(&mut self) -> Result<[i32; 3], BrickError> {
        self.rgb
            .pop_front()
            .ok_or_else(|| BrickError::SensorRead("colour script exhausted".into()))
    }

    fn read_gyro_deg(&mut self) -> Result<i32, BrickError> {
        match self.gyro.pop_front() {
            Some(g) => {
                self.last_gyro = g;
                Ok(g)
            }
            None => Ok(self.last_gyro),
        }
    }

    fn set_motor_power(&mut self, _left: i32, _right: i32) -> Result<(), BrickError> {
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), BrickError> {
        self.stop_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The nominal RGB triple the simulated sensor returns for each palette
/// colour.
pub fn nominal_rgb(colour: Colour) -> [i32; 3] {
    match colour {
        Colour::Black => [10, 10, 10],
        Colour::Blue => [20, 30, 220],
        Colour::Green => [30, 200, 40],
        Colour::Yellow => [230, 220, 30],
        Colour::Red => [220, 30, 30],
        Colour::White => [230, 230, 230],
    }
}

/// Calibration data matching the simulated sensor's nominal colours.
pub fn nominal_calibration() -> CalibrationData {
    CalibrationData {
        red: rgb_to_hsv(nominal_rgb(Colour::Red)),
        blue: rgb_to_hsv(nominal_rgb(Colour::Blue)),
        white: rgb_to_hsv(nominal_rgb(Colour::White)),
        green: rgb_to_hsv(nominal_rgb(Colour::Green)),
        black: rgb_to_hsv(nominal_rgb(Colour::Black)),
        yellow: rgb_to_hsv(nominal_rgb(Colour::Yellow)),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotation rate scaled by motor power, with 10 as the nominal power.
fn scaled_rate(rate_deg: i32, power: i32) -> i32 {
    ((rate_deg * power.abs()) / 10).max(1)
}

/// Rotate a heading by the given number of clockwise quarter turns.
fn rotate_quarters(heading: Heading, quarters: i64) -> Heading {
    let mut h = heading;
    for _ in 0..quarters.rem_euclid(4) {
        h = h.clockwise();
    }
    h
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
