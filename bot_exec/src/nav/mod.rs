//! # Navigation module
//!
//! Once the estimator has committed to a pose, navigation reduces to a
//! greedy turn chooser: face the direction that closes the largest
//! coordinate gap to the destination, drive a block, dead-reckon the pose
//! forward, repeat. The chooser never demands a move off the map; a believed
//! pose from which every useful move would leave the grid is evidence the
//! commitment was wrong, and the caller drops back to exploration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;

// Internal
use crate::loc::{GridPose, Heading, Turn};
use crate::map::StreetMap;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The turn which takes `from` to face `to`.
pub fn turn_between(from: Heading, to: Heading) -> Turn {
    if to == from {
        Turn::Straight
    } else if to == from.clockwise() {
        Turn::Right
    } else if to == from.anticlockwise() {
        Turn::Left
    } else {
        Turn::Reverse
    }
}

/// Choose the turn that moves the believed pose towards the target
/// intersection, or `None` if the robot is already there.
///
/// The x gap is closed first, then the y gap.
pub fn turn_toward(pose: &GridPose, target: &Point2<usize>) -> Option<Turn> {
    let wanted = if pose.x < target.x {
        Heading::Right
    } else if pose.x > target.x {
        Heading::Left
    } else if pose.y < target.y {
        Heading::Down
    } else if pose.y > target.y {
        Heading::Up
    } else {
        return None;
    };

    Some(turn_between(pose.heading, wanted))
}

/// Dead-reckon the pose through a turn and a one-block drive.
///
/// Returns `None` when the move would leave the map.
pub fn advanced_pose(map: &StreetMap, pose: &GridPose, turn: Turn) -> Option<GridPose> {
    let (x, y, heading) = pose.moved(turn);

    if map.contains(x, y) {
        Some(GridPose::new(x as usize, y as usize, heading))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::colour::Colour;

    fn test_map() -> StreetMap {
        StreetMap::from_corners(3, 3, vec![[Colour::Green; 4]; 9]).unwrap()
    }

    #[test]
    fn test_turn_between() {
        assert_eq!(turn_between(Heading::Up, Heading::Up), Turn::Straight);
        assert_eq!(turn_between(Heading::Up, Heading::Right), Turn::Right);
        assert_eq!(turn_between(Heading::Up, Heading::Left), Turn::Left);
        assert_eq!(turn_between(Heading::Up, Heading::Down), Turn::Reverse);
        assert_eq!(turn_between(Heading::Left, Heading::Up), Turn::Right);
    }

    #[test]
    fn test_turn_toward_closes_x_gap_first() {
        let pose = GridPose::new(0, 0, Heading::Down);
        let target = Point2::new(2, 2);

        // Needs to go right; facing down that is a left turn
        assert_eq!(turn_toward(&pose, &target), Some(Turn::Left));
    }

    #[test]
    fn test_turn_toward_arrival() {
        let pose = GridPose::new(2, 2, Heading::Up);
        assert_eq!(turn_toward(&pose, &Point2::new(2, 2)), None);
    }

    #[test]
    fn test_turn_toward_y_gap() {
        let pose = GridPose::new(1, 2, Heading::Down);
        let target = Point2::new(1, 0);

        assert_eq!(turn_toward(&pose, &target), Some(Turn::Reverse));
    }

    #[test]
    fn test_advanced_pose() {
        let map = test_map();
        let pose = GridPose::new(1, 1, Heading::Up);

        assert_eq!(
            advanced_pose(&map, &pose, Turn::Straight),
            Some(GridPose::new(1, 0, Heading::Up))
        );
        assert_eq!(
            advanced_pose(&map, &pose, Turn::Right),
            Some(GridPose::new(2, 1, Heading::Right))
        );

        // Off the top edge
        let edge = GridPose::new(1, 0, Heading::Up);
        assert_eq!(advanced_pose(&map, &edge, Turn::Straight), None);
    }
}
