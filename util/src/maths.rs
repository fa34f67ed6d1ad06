//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the signed angular distance between two angles in degrees.
///
/// This function will return the shortest signed distance from `a` to `b`
/// accounting for wrapping between 0 and 360 degrees.
pub fn ang_dist_deg<T>(a: T, b: T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::Sub + std::ops::Rem
{
    let full_t: T = T::from(360.0).unwrap();

    let c = rem_euclid(a - b, full_t);
    let d = rem_euclid(b - a, full_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::Sub + std::ops::Rem
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ang_dist_deg() {
        assert_eq!(ang_dist_deg(10f64, 20f64), 10f64);
        assert_eq!(ang_dist_deg(20f64, 10f64), -10f64);
        assert_eq!(ang_dist_deg(0f64, 360f64), 0f64);
        assert_eq!(ang_dist_deg(350f64, 10f64), 20f64);
        assert_eq!(ang_dist_deg(10f64, 350f64), -20f64);
        assert_eq!(ang_dist_deg(90f64, 270f64), 180f64);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(-30f64, 360f64), 330f64);
        assert_eq!(rem_euclid(370f64, 360f64), 10f64);
    }
}
