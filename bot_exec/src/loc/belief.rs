//! Belief state over (intersection × heading) hypotheses

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ndarray::Array2;
use ordered_float::OrderedFloat;
use serde::Serialize;

// Internal
use super::{motion, sensor, GridPose, Heading, LocParams, Observation, Turn};
use crate::map::StreetMap;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The belief: a probability for every (intersection, heading) pair.
///
/// Invariant: entries are non-negative, never NaN, and sum to one within
/// floating-point tolerance. Only one buffer is kept between cycles; the
/// posterior of one cycle is the input of the next. Updates build a fresh
/// array and swap it in whole, so no partially-updated distribution is ever
/// observable.
#[derive(Debug, Clone, Serialize)]
pub struct Belief {
    sx: usize,
    sy: usize,

    /// Probabilities, shape `(sx*sy, 4)`, heading-major within a row
    data: Array2<f64>,
}

/// The most likely pose hypothesis and its posterior probability.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoseEstimate {
    pub index: usize,
    pub heading: Heading,
    pub probability: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The result of a sensor update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOutcome {
    /// The observation was fused into the belief
    Informative,

    /// The total likelihood mass was zero; the prior was retained and the
    /// cycle carries no observation information
    Degenerate,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Belief {
    /// Create a uniform belief over a `sx` by `sy` grid: every
    /// (intersection, heading) cell holds `1/(sx*sy*4)`.
    pub fn uniform(sx: usize, sy: usize) -> Self {
        let cells = sx * sy;
        Self {
            sx,
            sy,
            data: Array2::from_elem((cells, 4), 1.0 / (cells * 4) as f64),
        }
    }

    pub fn sx(&self) -> usize {
        self.sx
    }

    pub fn sy(&self) -> usize {
        self.sy
    }

    /// The probability of the given (intersection, heading) hypothesis.
    pub fn get(&self, index: usize, heading: Heading) -> f64 {
        self.data[[index, heading.index()]]
    }

    /// The sum over all hypotheses.
    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// Rescale the belief so it sums to one.
    ///
    /// Normalizing an already-normalized belief leaves every entry unchanged
    /// beyond floating-point epsilon.
    pub fn normalize(&mut self) {
        let total = self.sum();
        if total > 0.0 && total.is_finite() {
            self.data.mapv_inplace(|v| v / total);
        }
    }

    /// Apply the motion model for the given turn, replacing the belief with
    /// the predicted (prior) distribution.
    ///
    /// The motion model is a permutation of the belief array, so the sum is
    /// unchanged.
    pub fn predict(&mut self, turn: Turn) {
        self.data = motion::predicted(self, turn);
    }

    /// Fuse an observation into the belief, replacing it with the
    /// normalized posterior.
    ///
    /// If every hypothesis is assigned zero likelihood the prior is retained
    /// unmodified and [`UpdateOutcome::Degenerate`] is returned.
    pub fn update(
        &mut self,
        observation: &Observation,
        map: &StreetMap,
        params: &LocParams,
    ) -> UpdateOutcome {
        match sensor::posterior(self, observation, map, params) {
            Some(posterior) => {
                self.data = posterior;
                UpdateOutcome::Informative
            }
            None => UpdateOutcome::Degenerate,
        }
    }

    /// The hypothesis with the highest probability.
    pub fn most_likely(&self) -> PoseEstimate {
        let mut best = PoseEstimate {
            index: 0,
            heading: Heading::Up,
            probability: self.get(0, Heading::Up),
        };

        for index in 0..self.sx * self.sy {
            for heading in Heading::ALL.iter() {
                let p = self.get(index, *heading);
                if OrderedFloat(p) > OrderedFloat(best.probability) {
                    best = PoseEstimate {
                        index,
                        heading: *heading,
                        probability: p,
                    };
                }
            }
        }

        best
    }

    /// Overwrite a single cell. Test and simulation support only; callers
    /// are responsible for re-normalizing.
    pub fn set_cell(&mut self, index: usize, heading: Heading, value: f64) {
        self.data[[index, heading.index()]] = value;
    }

    /// Scale a single cell. Test and simulation support only; callers are
    /// responsible for re-normalizing.
    pub fn scale_cell(&mut self, index: usize, heading: Heading, factor: f64) {
        self.data[[index, heading.index()]] *= factor;
    }

    /// Collapse the belief to certainty at a single hypothesis.
    pub fn set_point_mass(&mut self, index: usize, heading: Heading) {
        self.data.fill(0.0);
        self.data[[index, heading.index()]] = 1.0;
    }
}

impl PoseEstimate {
    /// The grid pose of this estimate on the given map.
    pub fn grid_pose(&self, map: &StreetMap) -> GridPose {
        let (x, y) = map.coords(self.index);
        GridPose::new(x, y, self.heading)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uniform_sums_to_one() {
        let belief = Belief::uniform(3, 3);

        assert!((belief.sum() - 1.0).abs() < 1e-9);
        assert!((belief.get(4, Heading::Left) - 1.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut belief = Belief::uniform(4, 5);
        belief.scale_cell(7, Heading::Right, 3.0);
        belief.normalize();

        let before = belief.clone();
        belief.normalize();

        for i in 0..20 {
            for h in Heading::ALL.iter() {
                assert!(
                    (belief.get(i, *h) - before.get(i, *h)).abs() < f64::EPSILON,
                    "cell ({}, {:?})",
                    i,
                    h
                );
            }
        }
    }

    #[test]
    fn test_sum_invariant_through_predict() {
        let mut belief = Belief::uniform(3, 3);

        for turn in Turn::ALL.iter() {
            belief.predict(*turn);
            assert!((belief.sum() - 1.0).abs() < 1e-6, "after {:?}", turn);
        }
    }

    #[test]
    fn test_most_likely_finds_maximum() {
        let mut belief = Belief::uniform(3, 3);
        belief.scale_cell(5, Heading::Down, 7.0);
        belief.normalize();

        let est = belief.most_likely();
        assert_eq!(est.index, 5);
        assert_eq!(est.heading, Heading::Down);
        assert!(est.probability > 1.0 / 36.0);
    }
}
