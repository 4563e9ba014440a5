//! One-dimensional quadrature rules for tensor-product element kernels.
//!
//! Rules are defined on the reference interval `[-1, 1]`. Kernels in `tmop` work on the unit
//! interval `[0, 1]`, and [`to_unit_interval`] performs the affine map between the two.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Maps a rule on `[-1, 1]` to the unit interval `[0, 1]`.
///
/// Points are transformed by `x -> (x + 1) / 2` and weights are halved, so that the
/// rule integrates over the unit interval with the same polynomial accuracy.
pub fn to_unit_interval(rule: Rule<1>) -> Rule<1> {
    let (weights, points) = rule;
    let weights = weights.into_iter().map(|w| 0.5 * w).collect();
    let points = points.into_iter().map(|[x]| [0.5 * (x + 1.0)]).collect();
    (weights, points)
}

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, x)| w * f(x)).sum()
}
