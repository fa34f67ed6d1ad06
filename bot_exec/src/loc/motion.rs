//! Motion model
//!
//! The motion model propagates the belief through a commanded turn followed
//! by a one-block drive. The commanded motion is assumed to succeed exactly,
//! so the update is a pure permutation of the belief array: for every
//! destination cell the rule table below names the single source cell whose
//! probability flows into it.
//!
//! For a destination `(x, y)` facing `h` after the turn, the source is the
//! cell one block behind the destination along `h`, holding the pre-turn
//! heading. Where the map boundary removes that behind-cell, the source is
//! the destination itself holding the opposite pre-turn heading: a robot
//! commanded into a dead end is modelled as having turned around on the
//! spot. The boundary rows and columns are derived from the map size, never
//! hard-coded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ndarray::Array2;

use super::{Belief, Heading, Turn};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One entry of the motion rule table: where the probability entering a
/// destination cell comes from.
#[derive(Debug, Clone, Copy)]
pub struct MotionRule {
    /// Grid offset from the destination to the cell behind it
    pub behind: (i64, i64),

    /// Heading held by the source cell
    pub source: Heading,

    /// Heading held by the source when the destination sits on the boundary
    /// and the behind-cell does not exist
    pub source_at_boundary: Heading,
}

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The motion rule table, indexed `[turn][heading-after-turn]`.
///
/// All sixteen (turn × heading) cases are written out so each can be tested
/// on its own against the boundary semantics.
pub const MOTION_RULES: [[MotionRule; 4]; 4] = [
    // Straight: pre-turn heading equals the post-turn heading
    [
        MotionRule {
            behind: (0, 1),
            source: Heading::Up,
            source_at_boundary: Heading::Down,
        },
        MotionRule {
            behind: (-1, 0),
            source: Heading::Right,
            source_at_boundary: Heading::Left,
        },
        MotionRule {
            behind: (0, -1),
            source: Heading::Down,
            source_at_boundary: Heading::Up,
        },
        MotionRule {
            behind: (1, 0),
            source: Heading::Left,
            source_at_boundary: Heading::Right,
        },
    ],
    // Right turn: the source faced one quarter turn anticlockwise
    [
        MotionRule {
            behind: (0, 1),
            source: Heading::Left,
            source_at_boundary: Heading::Right,
        },
        MotionRule {
            behind: (-1, 0),
            source: Heading::Up,
            source_at_boundary: Heading::Down,
        },
        MotionRule {
            behind: (0, -1),
            source: Heading::Right,
            source_at_boundary: Heading::Left,
        },
        MotionRule {
            behind: (1, 0),
            source: Heading::Down,
            source_at_boundary: Heading::Up,
        },
    ],
    // Left turn: the source faced one quarter turn clockwise
    [
        MotionRule {
            behind: (0, 1),
            source: Heading::Right,
            source_at_boundary: Heading::Left,
        },
        MotionRule {
            behind: (-1, 0),
            source: Heading::Down,
            source_at_boundary: Heading::Up,
        },
        MotionRule {
            behind: (0, -1),
            source: Heading::Left,
            source_at_boundary: Heading::Right,
        },
        MotionRule {
            behind: (1, 0),
            source: Heading::Up,
            source_at_boundary: Heading::Down,
        },
    ],
    // Reverse: the source faced the opposite way
    [
        MotionRule {
            behind: (0, 1),
            source: Heading::Down,
            source_at_boundary: Heading::Up,
        },
        MotionRule {
            behind: (-1, 0),
            source: Heading::Left,
            source_at_boundary: Heading::Right,
        },
        MotionRule {
            behind: (0, -1),
            source: Heading::Up,
            source_at_boundary: Heading::Down,
        },
        MotionRule {
            behind: (1, 0),
            source: Heading::Right,
            source_at_boundary: Heading::Left,
        },
    ],
];

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The source cell whose probability flows into the given destination under
/// the given turn.
pub fn source_for(
    dest_x: usize,
    dest_y: usize,
    heading_after: Heading,
    turn: Turn,
    sx: usize,
    sy: usize,
) -> (usize, usize, Heading) {
    let rule = &MOTION_RULES[turn.index()][heading_after.index()];

    let bx = dest_x as i64 + rule.behind.0;
    let by = dest_y as i64 + rule.behind.1;

    if bx >= 0 && by >= 0 && (bx as usize) < sx && (by as usize) < sy {
        (bx as usize, by as usize, rule.source)
    } else {
        (dest_x, dest_y, rule.source_at_boundary)
    }
}

/// Compute the predicted (prior) belief for the given turn.
///
/// Returns a fresh array; the caller swaps it in whole.
pub(super) fn predicted(belief: &Belief, turn: Turn) -> Array2<f64> {
    let sx = belief.sx();
    let sy = belief.sy();

    let mut out = Array2::zeros((sx * sy, 4));

    for y in 0..sy {
        for x in 0..sx {
            let dest = x + y * sx;

            for h in Heading::ALL.iter() {
                let (src_x, src_y, src_h) = source_for(x, y, *h, turn, sx, sy);
                out[[dest, h.index()]] = belief.get(src_x + src_y * sx, src_h);
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
