//! # LocMgr module
//!
//! This module implements the [`LocMgr`] state machine, which owns the
//! belief state and runs the localization cycle. The machine is broken down
//! into a number of states:
//!
//! - `Drive` - Follow the street to the next intersection.
//! - `Scan` - Read the four building colours around the intersection,
//!   retrying a bounded number of times.
//! - `BeliefUpdate` - Propagate the belief through the last turn and fuse
//!   the observation, if one was obtained.
//! - `Decide` - Commit to the most likely pose if it is probable enough,
//!   otherwise pick an exploration turn and go back to `Drive`.
//! - `Committed` - Navigate towards the destination by dead reckoning.
//!   Contradictory evidence or an external request drops the machine back to
//!   `Decide` for re-localization, so commitment is a mode, not an exit.
//!
//! States are kept on a stack and each `step` runs the top state once,
//! applying the stack action it returns. Any state error stops the motors,
//! clears the stack and surfaces the error to the caller; the belief is only
//! ever replaced whole, so it stays normalized and consistent through an
//! abort.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod committed;
mod decide;
mod drive;
mod params;
mod scan;
mod tm;
mod update;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use self::{params::LocMgrParams, tm::LocTm};

pub mod states {
    pub use super::committed::Committed;
    pub use super::decide::Decide;
    pub use super::drive::Drive;
    pub use super::scan::Scan;
    pub use super::update::BeliefUpdate;
}

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{error, info, warn};
use nalgebra::Point2;
use std::collections::HashMap;
use std::fmt::Display;

// Internal
use crate::colour::{Classifier, DebouncedReader};
use crate::drive::{DriveError, StreetDriver};
use crate::eqpt::{Brick, BrickError};
use crate::loc::{Belief, GridPose, Turn};
use crate::map::StreetMap;
use crate::scan::Scanner;
use states::*;
use util::archive::Archiver;
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Localization Manager
///
/// This struct owns the belief state and the equipment handle, and is
/// responsible for running the localization cycle until the robot has
/// committed to a pose and reached its destination.
pub struct LocMgr {
    /// Parameters for the LocMgr and all its states.
    pub params: LocMgrParams,

    /// Persistant data of the LocMgr.
    ///
    /// This is data which is valid over all states, such as the map and the
    /// belief, so that nothing is lost when a new state is entered.
    pub persistant: LocMgrPersistantData,

    /// The stack of states in the machine.
    stack: LocMgrStack,
}

pub struct LocMgrPersistantData {
    /// The static street map
    pub map: StreetMap,

    /// The belief over (intersection, heading) hypotheses
    pub belief: Belief,

    /// Equipment handle
    pub brick: Box<dyn Brick>,

    /// Calibrated colour classifier
    pub classifier: Classifier,

    /// Street driver
    pub driver: StreetDriver,

    /// Intersection scanner
    pub scanner: Scanner,

    /// Debounced colour reader shared by the driving states
    pub reader: DebouncedReader,

    /// Destination intersection
    pub dest: Point2<usize>,

    /// Gyro angle of the street the robot is currently aligned with
    pub canonical_deg: i32,

    /// The turn taken at the previous intersection, consumed by the motion
    /// update
    pub last_turn: Turn,

    /// How often each turn has been taken at each believed intersection,
    /// for the exploration policy
    pub turn_counts: HashMap<usize, [u32; 4]>,

    /// Set by [`LocMgr::request_relocalization`]; consumed by `Committed`
    pub relocalize_requested: bool,

    /// Belief-update cycles completed
    pub cycle: u32,

    /// Telemetry summary of the latest cycle
    pub tm: LocTm,

    /// CSV archiver for the telemetry, present when a session is attached
    pub arch_tm: Option<Archiver>,

    /// Session for archives and belief snapshots, when attached
    pub session: Option<Session>,
}

/// State stacking abstraction.
#[derive(Debug, Default)]
pub struct LocMgrStack(Vec<LocMgrState>);

/// Output of a state's step function.
pub struct StepOutput {
    /// Action to perform on the stack itself
    pub action: StackAction,

    /// Data to pass out of the manager
    pub data: LocMgrOutput,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the localization manager.
#[derive(Debug, thiserror::Error)]
pub enum LocMgrError {
    #[error("Failed to load LocMgrParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Driving error: {0}")]
    Drive(#[from] DriveError),

    #[error("Equipment error: {0}")]
    Brick(#[from] BrickError),

    #[error("Could not set up the telemetry archive: {0}")]
    ArchiveSetup(String),
}

#[derive(Debug)]
pub enum LocMgrState {
    Drive(Drive),
    Scan(Scan),
    BeliefUpdate(BeliefUpdate),
    Decide(Decide),
    Committed(Committed),
}

/// Actions that can be performed on the stack at the end of a state's step
/// function.
#[derive(Debug)]
pub enum StackAction {
    None,
    Clear,
    Replace(LocMgrState),
}

/// Data passed out of a step.
#[derive(Debug, Clone, Copy)]
pub enum LocMgrOutput {
    /// Nothing to report this step
    None,

    /// The estimator has committed to this pose
    Localized(GridPose),

    /// The robot has arrived at the destination intersection
    Arrived(GridPose),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LocMgr {
    /// Initialise the manager from a parameter file.
    pub fn init(
        params_path: &str,
        map: StreetMap,
        brick: Box<dyn Brick>,
        classifier: Classifier,
        dest: Point2<usize>,
    ) -> Result<Self, LocMgrError> {
        let params: LocMgrParams =
            util::params::load(params_path).map_err(LocMgrError::ParamLoadError)?;

        Ok(Self::new(params, map, brick, classifier, dest))
    }

    /// Build the manager from already-loaded parameters.
    pub fn new(
        params: LocMgrParams,
        map: StreetMap,
        brick: Box<dyn Brick>,
        classifier: Classifier,
        dest: Point2<usize>,
    ) -> Self {
        let belief = Belief::uniform(map.sx(), map.sy());

        let mut stack = LocMgrStack::new();
        stack.push(LocMgrState::Drive(Drive::new()));

        Self {
            persistant: LocMgrPersistantData {
                map,
                belief,
                brick,
                classifier,
                driver: StreetDriver::new(params.drive.clone()),
                scanner: Scanner::new(params.scan.clone()),
                reader: DebouncedReader::new(),
                dest,
                canonical_deg: 0,
                last_turn: Turn::Straight,
                turn_counts: HashMap::new(),
                relocalize_requested: false,
                cycle: 0,
                tm: LocTm::default(),
                arch_tm: None,
                session: None,
            },
            params,
            stack,
        }
    }

    /// Attach a session for telemetry archiving and belief snapshots.
    pub fn attach_session(&mut self, session: Session) -> Result<(), LocMgrError> {
        let arch = Archiver::from_path(&session, "loc_mgr/tm.csv")
            .map_err(|e| LocMgrError::ArchiveSetup(e.to_string()))?;

        self.persistant.arch_tm = Some(arch);
        self.persistant.session = Some(session);

        Ok(())
    }

    /// Run the top state once and apply its stack action.
    ///
    /// On a state error the motors are stopped, the stack cleared, and the
    /// error returned; the belief keeps its last consistent value.
    pub fn step(&mut self) -> Result<LocMgrOutput, LocMgrError> {
        let top = match self.stack.top() {
            Some(top) => top,
            None => return Ok(LocMgrOutput::None),
        };

        let output = match top.step(&self.params, &mut self.persistant) {
            Ok(o) => o,
            Err(e) => {
                error!("State error, stopping: {}", e);
                self.make_safe();
                return Err(e);
            }
        };

        let is_action = output.action.is_some();

        match output.action {
            StackAction::None => (),
            StackAction::Clear => self.stack.clear(),
            StackAction::Replace(s) => {
                self.stack.pop();
                self.stack.push(s);
            }
        }

        if is_action {
            if let Some(top) = self.stack.top() {
                info!("LocMgr state change to: {}", top);
                self.persistant.tm.state = top.to_string();
            }
        }

        Ok(output.data)
    }

    /// Stop all actuation and clear the state stack.
    ///
    /// Used for operator aborts; the belief retains its last-normalized
    /// value.
    pub fn make_safe(&mut self) {
        if let Err(e) = self.persistant.brick.stop_all() {
            error!("Could not stop motors during abort: {}", e);
        }
        self.stack.clear();
    }

    /// Ask the manager to abandon a committed pose and re-enter exploration
    /// on its next committed step.
    pub fn request_relocalization(&mut self) {
        self.persistant.relocalize_requested = true;
    }

    pub fn is_off(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn is_on(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn get_tm(&self) -> LocTm {
        self.persistant.tm.clone()
    }
}

impl LocMgrStack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns true if the stack is empty (has no states)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a mutable reference to the top state in the stack. Returns
    /// None if the stack is empty.
    pub fn top(&mut self) -> Option<&mut LocMgrState> {
        self.0.last_mut()
    }

    /// Pushes a new state onto the stack
    pub fn push(&mut self, new: LocMgrState) {
        self.0.push(new)
    }

    /// Pops the current top of the stack, removing it. Returns None if the
    /// stack is empty.
    pub fn pop(&mut self) -> Option<LocMgrState> {
        self.0.pop()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl Display for LocMgrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocMgrState::Drive(_) => write!(f, "LocMgrState::Drive"),
            LocMgrState::Scan(_) => write!(f, "LocMgrState::Scan"),
            LocMgrState::BeliefUpdate(_) => write!(f, "LocMgrState::BeliefUpdate"),
            LocMgrState::Decide(_) => write!(f, "LocMgrState::Decide"),
            LocMgrState::Committed(_) => write!(f, "LocMgrState::Committed"),
        }
    }
}

impl LocMgrState {
    fn step(
        &mut self,
        params: &LocMgrParams,
        persistant: &mut LocMgrPersistantData,
    ) -> Result<StepOutput, LocMgrError> {
        match self {
            LocMgrState::Drive(drive) => drive.step(params, persistant),
            LocMgrState::Scan(scan) => scan.step(params, persistant),
            LocMgrState::BeliefUpdate(update) => update.step(params, persistant),
            LocMgrState::Decide(decide) => decide.step(params, persistant),
            LocMgrState::Committed(committed) => committed.step(params, persistant),
        }
    }
}

impl StepOutput {
    pub fn none() -> Self {
        Self {
            action: StackAction::None,
            data: LocMgrOutput::None,
        }
    }
}

impl StackAction {
    pub fn is_some(&self) -> bool {
        !matches!(self, &StackAction::None)
    }
}

impl LocMgrPersistantData {
    /// Archive the current telemetry record, if a session is attached.
    pub(super) fn archive_tm(&mut self) {
        if let Some(ref mut arch) = self.arch_tm {
            if let Err(e) = arch.serialise(&self.tm) {
                warn!("Could not archive telemetry: {}", e);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(all(test, feature = "sim"))]
mod test {
    use super::*;
    use crate::colour::{Colour, ColourParams};
    use crate::drive::DriveParams;
    use crate::eqpt::sim::{nominal_calibration, SimBrick, SimParams};
    use crate::eqpt::BrickError;
    use crate::loc::{Heading, LocParams};
    use crate::scan::ScanParams;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shares a simulated brick between the manager and the test, so the
    /// true pose can be checked after the run.
    struct SharedBrick(Rc<RefCell<SimBrick>>);

    impl Brick for SharedBrick {
        fn read_colour_rgb(&mut self) -> Result<[i32; 3], BrickError> {
            self.0.borrow_mut().read_colour_rgb()
        }

        fn read_gyro_deg(&mut self) -> Result<i32, BrickError> {
            self.0.borrow_mut().read_gyro_deg()
        }

        fn set_motor_power(&mut self, left: i32, right: i32) -> Result<(), BrickError> {
            self.0.borrow_mut().set_motor_power(left, right)
        }

        fn stop_all(&mut self) -> Result<(), BrickError> {
            self.0.borrow_mut().stop_all()
        }
    }

    /// A 3x3 map whose 36 (intersection, heading) views are pairwise
    /// distinct, so observations are informative everywhere.
    fn test_map() -> StreetMap {
        let g = Colour::Green;
        let b = Colour::Blue;
        let w = Colour::White;
        let corners = vec![
            [g, g, g, b],
            [g, g, g, w],
            [g, g, b, b],
            [g, g, b, w],
            [g, g, w, b],
            [g, g, w, w],
            [g, b, g, w],
            [g, b, w, w],
            [g, w, b, b],
        ];
        StreetMap::from_corners(3, 3, corners).unwrap()
    }

    fn test_params() -> LocMgrParams {
        LocMgrParams {
            commit_threshold: 0.6,
            max_scan_retries: 3,
            belief_snapshot_period: 0,
            loc: LocParams {
                p_match: 0.7,
                p_mismatch: 0.1,
            },
            scan: ScanParams {
                pivot_power: 10,
                max_polls: 400,
                return_tol_deg: 5,
            },
            drive: DriveParams {
                cruise_power: 10,
                slow_power: 7,
                heading_deadband_deg: 2,
                turn_power: 10,
                fine_power: 5,
                turn_coarse_tol_deg: 10,
                turn_fine_tol_deg: 3,
                max_polls: 2000,
                gyro_samples: 5,
            },
        }
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

    #[test]
    fn test_localizes_and_reaches_destination() {
        let sim = Rc::new(RefCell::new(SimBrick::new(
            test_map(),
            SimParams {
                start_x: 0,
                start_y: 2,
                start_heading: Heading::Up,
                block_ticks: 10,
                border_ticks: 4,
                sweep_rate_deg: 2,
                turn_rate_deg: 2,
                building_angle_deg: 20,
                colour_misread_prob: 0.0,
                seed: 3,
            },
        )));

        let dest = Point2::new(2, 0);
        let mut mgr = LocMgr::new(
            test_params(),
            test_map(),
            Box::new(SharedBrick(sim.clone())),
            test_classifier(),
            dest,
        );

        let mut localized = None;
        let mut arrived = None;

        for _ in 0..500 {
            if mgr.is_off() {
                break;
            }

            match mgr.step().expect("manager step failed") {
                LocMgrOutput::Localized(pose) => localized = Some(pose),
                LocMgrOutput::Arrived(pose) => arrived = Some(pose),
                LocMgrOutput::None => (),
            }
        }

        let arrived = arrived.expect("never arrived at the destination");
        assert_eq!((arrived.x, arrived.y), (2, 0));

        // The believed arrival matches the simulated truth
        let truth = sim.borrow().true_pose();
        assert_eq!((truth.x, truth.y), (2, 0));
    }

    #[test]
    fn test_belief_stays_normalized_through_run() {
        let sim = Rc::new(RefCell::new(SimBrick::new(
            test_map(),
            SimParams {
                start_x: 1,
                start_y: 1,
                start_heading: Heading::Right,
                block_ticks: 10,
                border_ticks: 4,
                sweep_rate_deg: 2,
                turn_rate_deg: 2,
                building_angle_deg: 20,
                colour_misread_prob: 0.0,
                seed: 11,
            },
        )));

        let mut mgr = LocMgr::new(
            test_params(),
            test_map(),
            Box::new(SharedBrick(sim)),
            test_classifier(),
            Point2::new(0, 0),
        );

        for _ in 0..100 {
            if mgr.is_off() {
                break;
            }
            mgr.step().expect("manager step failed");
            assert!((mgr.persistant.belief.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_external_relocalization_reenters_decide() {
        let sim = Rc::new(RefCell::new(SimBrick::new(
            test_map(),
            SimParams {
                start_x: 1,
                start_y: 1,
                start_heading: Heading::Up,
                block_ticks: 10,
                border_ticks: 4,
                sweep_rate_deg: 2,
                turn_rate_deg: 2,
                building_angle_deg: 20,
                colour_misread_prob: 0.0,
                seed: 5,
            },
        )));

        let mut mgr = LocMgr::new(
            test_params(),
            test_map(),
            Box::new(SharedBrick(sim)),
            test_classifier(),
            Point2::new(2, 2),
        );

        // Run until the manager commits
        let mut committed = false;
        for _ in 0..500 {
            if let LocMgrOutput::Localized(_) = mgr.step().expect("manager step failed") {
                committed = true;
                break;
            }
        }
        assert!(committed, "never committed to a pose");

        // An external trigger must drop the machine back to Decide
        mgr.request_relocalization();
        mgr.step().expect("manager step failed");

        assert_eq!(
            mgr.persistant.tm.state, "LocMgrState::Decide",
            "relocalization request did not re-enter Decide"
        );
    }
}
