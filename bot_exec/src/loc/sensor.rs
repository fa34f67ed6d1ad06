//! Sensor model
//!
//! Fuses a four-colour intersection observation into the belief. For each
//! hypothesis the stored map colours are rotated into the robot's frame and
//! compared element-wise with the observation; the four comparisons are
//! treated as conditionally independent, so the hypothesis likelihood is the
//! product of the per-element match probabilities. The posterior is the
//! likelihood-weighted prior, normalized over all hypotheses.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ndarray::Array2;

use super::{Belief, Heading, LocParams, Observation};
use crate::map::StreetMap;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the normalized posterior for the given observation.
///
/// Returns `None` if the total posterior mass is zero or non-finite, in
/// which case the caller must retain the prior. With a non-zero mismatch
/// probability this cannot happen for any observation, but the guard keeps a
/// mis-parameterised run from poisoning the belief.
pub(super) fn posterior(
    belief: &Belief,
    observation: &Observation,
    map: &StreetMap,
    params: &LocParams,
) -> Option<Array2<f64>> {
    let cells = belief.sx() * belief.sy();
    let mut out = Array2::zeros((cells, 4));
    let mut total = 0.0;

    for index in 0..cells {
        for heading in Heading::ALL.iter() {
            let expected = map.corners_facing(index, *heading);

            let mut likelihood = 1.0;
            for z in 0..4 {
                likelihood *= if observation.0[z] == expected[z] {
                    params.p_match
                } else {
                    params.p_mismatch
                };
            }

            let mass = likelihood * belief.get(index, *heading);
            out[[index, heading.index()]] = mass;
            total += mass;
        }
    }

    if total > 0.0 && total.is_finite() {
        out.mapv_inplace(|v| v / total);
        Some(out)
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
    use crate::loc::UpdateOutcome;

    fn test_params() -> LocParams {
        LocParams {
            p_match: 0.7,
            p_mismatch: 0.1,
        }
    }

    /// A 3x3 map where intersection 4's colours, seen facing up, mismatch
    /// every other (intersection, heading) hypothesis in at least one
    /// position.
    fn test_map() -> StreetMap {
        let mut corners = vec![[Colour::Green; 4]; 9];
        corners[4] = [Colour::Blue, Colour::White, Colour::Green, Colour::Green];
        StreetMap::from_corners(3, 3, corners).unwrap()
    }

    #[test]
    fn test_matching_observation_dominates() {
        let map = test_map();
        let mut belief = Belief::uniform(3, 3);

        let obs = Observation([Colour::Blue, Colour::White, Colour::Green, Colour::Green]);
        let outcome = belief.update(&obs, &map, &test_params());

        assert_eq!(outcome, UpdateOutcome::Informative);
        assert!((belief.sum() - 1.0).abs() < 1e-6);

        // Intersection 4 facing up is the strict maximum
        let est = belief.most_likely();
        assert_eq!(est.index, 4);
        assert_eq!(est.heading, Heading::Up);

        let best = belief.get(4, Heading::Up);
        for index in 0..9 {
            for heading in Heading::ALL.iter() {
                if index == 4 && *heading == Heading::Up {
                    continue;
                }
                assert!(
                    belief.get(index, *heading) < best,
                    "hypothesis ({}, {:?}) not dominated",
                    index,
                    heading
                );
            }
        }
    }

    #[test]
    fn test_repeated_observation_reinforces() {
        let map = test_map();
        let mut belief = Belief::uniform(3, 3);

        let obs = Observation([Colour::Blue, Colour::White, Colour::Green, Colour::Green]);

        belief.update(&obs, &map, &test_params());
        let p_first = belief.get(4, Heading::Up);

        belief.update(&obs, &map, &test_params());
        let p_second = belief.get(4, Heading::Up);

        assert!(
            p_second > p_first,
            "posterior did not grow: {} vs {}",
            p_second,
            p_first
        );
        assert!((belief.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sum_invariant_through_update() {
        let map = test_map();
        let mut belief = Belief::uniform(3, 3);

        // An observation matching nothing exactly still renormalizes
        let obs = Observation([Colour::White, Colour::Blue, Colour::Blue, Colour::White]);
        belief.update(&obs, &map, &test_params());

        assert!((belief.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_update_retains_prior() {
        let map = test_map();
        let mut belief = Belief::uniform(3, 3);

        // A zero mismatch probability lets an impossible observation wipe
        // out every hypothesis; the update must refuse and keep the prior
        let params = LocParams {
            p_match: 0.0,
            p_mismatch: 0.0,
        };

        let obs = Observation([Colour::Blue, Colour::White, Colour::Green, Colour::Green]);
        let outcome = belief.update(&obs, &map, &params);

        assert_eq!(outcome, UpdateOutcome::Degenerate);
        assert!((belief.sum() - 1.0).abs() < 1e-9);
        assert!((belief.get(0, Heading::Up) - 1.0 / 36.0).abs() < 1e-12);
    }
}
