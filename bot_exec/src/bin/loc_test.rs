//! # Localization Test
//!
//! This binary runs the full localization stack against the simulated brick
//! without requiring a map image or physical robot. It is designed to allow
//! quick and easy development of the estimator itself: a handful of trials
//! are run from different true starting poses and the outcome of each is
//! reported.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use nalgebra::Point2;

// Internal
use bot_lib::{
    colour::{Classifier, Colour, ColourParams},
    eqpt::sim::{nominal_calibration, SimBrick, SimParams},
    loc::Heading,
    loc_mgr::{LocMgr, LocMgrOutput, LocMgrParams},
    map::StreetMap,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Bound on manager steps per trial.
const MAX_STEPS: u32 = 2000;

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("loc_test", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Localization Test\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: LocMgrParams =
        util::params::load("loc_mgr.toml").wrap_err("Could not load loc_mgr params")?;
    let colour_params: ColourParams =
        util::params::load("colour.toml").wrap_err("Could not load colour params")?;

    // ---- TRIALS ----

    let map = demo_map();
    info!("Demo map:\n\n{}", map.render());

    let dest = Point2::new(2, 0);

    let starts = [
        (0, 2, Heading::Up),
        (2, 2, Heading::Left),
        (1, 1, Heading::Right),
        (0, 0, Heading::Down),
    ];

    let mut successes = 0;

    for (i, (x, y, heading)) in starts.iter().enumerate() {
        info!(
            "---- Trial {}: true start ({}, {}) facing {} ----",
            i, x, y, heading
        );

        let brick = SimBrick::new(
            map.clone(),
            SimParams {
                start_x: *x,
                start_y: *y,
                start_heading: *heading,
                block_ticks: 40,
                border_ticks: 15,
                sweep_rate_deg: 2,
                turn_rate_deg: 2,
                building_angle_deg: 20,
                colour_misread_prob: 0.02,
                seed: 17 + i as u64,
            },
        );

        let classifier = Classifier::new(nominal_calibration(), colour_params.clone());

        let mut mgr = LocMgr::new(
            params.clone(),
            map.clone(),
            Box::new(brick),
            classifier,
            dest,
        );

        let mut arrived = false;

        for _ in 0..MAX_STEPS {
            if mgr.is_off() {
                break;
            }

            match mgr.step() {
                Ok(LocMgrOutput::Localized(pose)) => {
                    info!("Trial {}: committed to {}", i, pose)
                }
                Ok(LocMgrOutput::Arrived(pose)) => {
                    info!("Trial {}: arrived at {}", i, pose);
                    arrived = true;
                }
                Ok(LocMgrOutput::None) => (),
                Err(e) => {
                    warn!("Trial {}: manager error: {}", i, e);
                    break;
                }
            }
        }

        if arrived {
            successes += 1;
        } else {
            warn!("Trial {} did not reach the destination", i);
        }
    }

    info!(
        "\n{} of {} trials reached the destination",
        successes,
        starts.len()
    );

    session.exit();

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// A 3x3 demo map whose (intersection, heading) views are pairwise
/// distinct.
fn demo_map() -> StreetMap {
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

    StreetMap::from_corners(3, 3, corners).expect("demo map is well formed")
}
