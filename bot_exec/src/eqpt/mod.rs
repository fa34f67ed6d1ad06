//! # Equipment interface module
//!
//! The estimator never talks to hardware directly; everything it needs from
//! the robot goes through the [`Brick`] trait: a colour sensor read, a gyro
//! read, differential motor demands, and an all-stop. The physical
//! bluetooth-connected brick lives behind this trait in its own daemon; the
//! simulated brick ([`sim`], behind the `sim` feature) implements the same
//! trait over a deterministic grid world for tests and development.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

#[cfg(feature = "sim")]
pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::map::StreetMap;
use util::poll::{PollError, Poller};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The hardware surface of the robot.
pub trait Brick {
    /// Read the colour sensor as a raw RGB triple.
    fn read_colour_rgb(&mut self) -> Result<[i32; 3], BrickError>;

    /// Read the gyro angle in degrees, clockwise positive, relative to the
    /// orientation at power-on.
    fn read_gyro_deg(&mut self) -> Result<i32, BrickError>;

    /// Set the left and right motor powers (roughly -100 to 100).
    fn set_motor_power(&mut self, left: i32, right: i32) -> Result<(), BrickError>;

    /// Stop all motors immediately.
    fn stop_all(&mut self) -> Result<(), BrickError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors when talking to the brick.
#[derive(Debug, Error)]
pub enum BrickError {
    #[error("The brick is not connected")]
    NotConnected,

    #[error("The configured equipment source is not available in this build: {0}")]
    SourceUnavailable(String),

    #[error("Equipment configuration is incomplete: {0}")]
    IncompleteConfig(String),

    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    #[error("Equipment operation failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,

        #[source]
        source: Box<BrickError>,
    },
}

/// Selects the backend implementing the [`Brick`] trait.
#[derive(Debug, Clone, Copy, Deserialize)]
pub enum EqptSource {
    /// The deterministic simulated brick
    Sim,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wraps a brick backend in the bounded-retry polling policy.
///
/// Every call is retried up to the attempt bound before the error is
/// surfaced; estimation code above this layer never loops on I/O failures
/// itself.
pub struct RetryBrick {
    inner: Box<dyn Brick>,
    poller: Poller,
}

/// Parameters for the equipment interface.
#[derive(Debug, Clone, Deserialize)]
pub struct EqptParams {
    /// Which backend to connect to
    pub source: EqptSource,

    /// Attempt bound for retried sensor reads
    pub poll_max_attempts: u32,

    /// Simulated brick configuration, required when `source` is `Sim`
    #[cfg(feature = "sim")]
    pub sim: Option<sim::SimParams>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RetryBrick {
    pub fn new(inner: Box<dyn Brick>, max_attempts: u32) -> Self {
        Self {
            inner,
            poller: Poller::new(max_attempts),
        }
    }
}

impl Brick for RetryBrick {
    fn read_colour_rgb(&mut self) -> Result<[i32; 3], BrickError> {
        let inner = &mut self.inner;
        self.poller
            .poll_with_retry(|| inner.read_colour_rgb())
            .map_err(exhausted)
    }

    fn read_gyro_deg(&mut self) -> Result<i32, BrickError> {
        let inner = &mut self.inner;
        self.poller
            .poll_with_retry(|| inner.read_gyro_deg())
            .map_err(exhausted)
    }

    fn set_motor_power(&mut self, left: i32, right: i32) -> Result<(), BrickError> {
        let inner = &mut self.inner;
        self.poller
            .poll_with_retry(|| inner.set_motor_power(left, right))
            .map_err(exhausted)
    }

    fn stop_all(&mut self) -> Result<(), BrickError> {
        let inner = &mut self.inner;
        self.poller
            .poll_with_retry(|| inner.stop_all())
            .map_err(exhausted)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Connect to the configured equipment backend, wrapped in the retry
/// policy.
pub fn connect(params: &EqptParams, map: &StreetMap) -> Result<Box<dyn Brick>, BrickError> {
    match params.source {
        EqptSource::Sim => connect_sim(params, map),
    }
}

/// Read the gyro as the mean of several samples.
///
/// The gyro is noisy at rest; averaging a handful of samples is enough to
/// hold a street heading.
pub fn read_gyro_filtered(brick: &mut dyn Brick, samples: u32) -> Result<i32, BrickError> {
    let samples = samples.max(1);
    let mut sum = 0i64;

    for _ in 0..samples {
        sum += brick.read_gyro_deg()? as i64;
    }

    Ok((sum / samples as i64) as i32)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

#[cfg(feature = "sim")]
fn connect_sim(params: &EqptParams, map: &StreetMap) -> Result<Box<dyn Brick>, BrickError> {
    let sim_params = params
        .sim
        .clone()
        .ok_or_else(|| BrickError::IncompleteConfig("missing [sim] table".into()))?;

    let inner: Box<dyn Brick> = Box::new(sim::SimBrick::new(map.clone(), sim_params));

    Ok(Box::new(RetryBrick::new(inner, params.poll_max_attempts)))
}

#[cfg(not(feature = "sim"))]
fn connect_sim(_params: &EqptParams, _map: &StreetMap) -> Result<Box<dyn Brick>, BrickError> {
    Err(BrickError::SourceUnavailable("sim".into()))
}

fn exhausted(err: PollError<BrickError>) -> BrickError {
    match err {
        PollError::Exhausted { attempts, last } => BrickError::RetriesExhausted {
            attempts,
            source: Box::new(last),
        },
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "sim"))]
mod test {
    use super::*;
    use super::sim::{nominal_rgb, ScriptedBrick};
    use crate::colour::Colour;

    #[test]
    fn test_retry_brick_recovers_from_transient_failure() {
        // Script one reading; the retry layer returns it on the first call
        let mut script = ScriptedBrick::new();
        script.rgb.push_back(nominal_rgb(Colour::Yellow));

        let mut brick = RetryBrick::new(Box::new(script), 3);
        assert_eq!(
            brick.read_colour_rgb().unwrap(),
            nominal_rgb(Colour::Yellow)
        );
    }

    #[test]
    fn test_retry_brick_exhausts() {
        // An empty script fails every attempt
        let script = ScriptedBrick::new();
        let mut brick = RetryBrick::new(Box::new(script), 3);

        assert!(matches!(
            brick.read_colour_rgb(),
            Err(BrickError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_gyro_filtering_averages() {
        let mut script = ScriptedBrick::new();
        script.gyro.extend([88, 90, 92, 90, 90].iter());

        assert_eq!(read_gyro_filtered(&mut script, 5).unwrap(), 90);
    }
}
