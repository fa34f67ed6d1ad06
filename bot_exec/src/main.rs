//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Parse the command line and the map image
//!     - Initialise the session, logging, and parameters
//!     - Either run the sensor calibration routine (destination `-1 -1`),
//!       or hand the parsed map, equipment and classifier to the
//!       localization manager and step it until the robot has found itself
//!       and reached the destination
//!
//! An operator interrupt stops all actuation immediately; the belief state
//! is only ever replaced whole, so it is left consistent.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nalgebra::Point2;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Internal
use bot_lib::{
    colour::{self, CalibrationData, Classifier, ColourParams},
    eqpt::{self, EqptParams},
    loc_mgr::{LocMgr, LocMgrOutput},
    map,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Calibration file name within the params directory.
const CALIB_FILE_NAME: &str = "hsv_calib.txt";

/// Number of sensor samples averaged per colour during calibration.
const CALIB_SAMPLES: u32 = 10;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("bot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Hermes Street Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- COMMAND LINE ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    if args.len() != 4 {
        return Err(eyre!(
            "Usage: bot_exec <map_image> <dest_x> <dest_y> (-1 -1 runs calibration)"
        ));
    }

    let map_path = &args[1];
    let dest_x: i64 = args[2]
        .parse()
        .wrap_err("dest_x is not an integer")?;
    let dest_y: i64 = args[3]
        .parse()
        .wrap_err("dest_y is not an integer")?;

    // ---- MAP ----

    let street_map = map::load_map_image(map_path)
        .wrap_err_with(|| format!("Unable to parse the map image {:?}", map_path))?;

    info!(
        "Parsed map with {} x {} intersections:\n\n{}",
        street_map.sx(),
        street_map.sy(),
        street_map.render()
    );

    // ---- EQUIPMENT ----

    let eqpt_params: EqptParams =
        util::params::load("eqpt.toml").wrap_err("Could not load eqpt params")?;

    let mut brick = eqpt::connect(&eqpt_params, &street_map)
        .wrap_err("Unable to connect to the robot equipment")?;

    info!("Equipment connected");

    // Path to the calibration file
    let mut calib_path = host::get_hermes_sw_root()
        .map_err(|_| eyre!("The software root environment variable (HERMES_SW_ROOT) is not set"))?;
    calib_path.push("params");
    calib_path.push(CALIB_FILE_NAME);

    // ---- CALIBRATION MODE ----

    // A destination of -1 -1 runs the calibration routine instead of
    // localization
    if dest_x == -1 && dest_y == -1 {
        info!("Running sensor calibration, writing to {:?}", calib_path);

        colour::run_calibration(brick.as_mut(), &calib_path, CALIB_SAMPLES)
            .wrap_err("Calibration failed")?;

        info!("Calibration complete");
        session.exit();
        return Ok(());
    }

    // ---- LOCALIZATION MODE ----

    // Destination must be on the map
    if dest_x < 0
        || dest_y < 0
        || dest_x >= street_map.sx() as i64
        || dest_y >= street_map.sy() as i64
    {
        return Err(eyre!(
            "Destination ({}, {}) is outside of the {} x {} map",
            dest_x,
            dest_y,
            street_map.sx(),
            street_map.sy()
        ));
    }
    let dest = Point2::new(dest_x as usize, dest_y as usize);

    // Calibrated classifier
    let calib = CalibrationData::load(&calib_path)
        .wrap_err_with(|| format!("Cannot load the calibration file {:?}", calib_path))?;
    let colour_params: ColourParams =
        util::params::load("colour.toml").wrap_err("Could not load colour params")?;
    let classifier = Classifier::new(calib, colour_params);

    info!("Classifier calibrated");

    // ---- MODULE INIT ----

    let mut loc_mgr = LocMgr::init("loc_mgr.toml", street_map, brick, classifier, dest)
        .wrap_err("Failed to initialise LocMgr")?;
    loc_mgr
        .attach_session(session.clone())
        .wrap_err("Failed to attach the session to LocMgr")?;

    info!("LocMgr init complete, localizing towards ({}, {})\n", dest.x, dest.y);

    // Operator abort flag, set from ctrl-c
    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = abort.clone();
        ctrlc::set_handler(move || abort.store(true, Ordering::SeqCst))
            .wrap_err("Failed to set the interrupt handler")?;
    }

    // ---- MAIN LOOP ----

    while loc_mgr.is_on() {
        if abort.load(Ordering::SeqCst) {
            warn!("Operator abort, stopping all actuation");
            loc_mgr.make_safe();
            break;
        }

        match loc_mgr.step().wrap_err("LocMgr processing failed")? {
            LocMgrOutput::Localized(pose) => {
                info!("Localization committed: robot believes it is at {}", pose)
            }
            LocMgrOutput::Arrived(pose) => info!("Destination reached at {}", pose),
            LocMgrOutput::None => (),
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");
    session.exit();

    Ok(())
}
