//! Gauss-type quadrature rules on the reference interval `[-1, 1]`.
//!
//! The main purpose of this crate is to support the `spectral-hp` library, which builds all of its
//! point distributions from the rules available here. The rules integrate against the Jacobi
//! weight $(1 - x)^\alpha (1 + x)^\beta$, which is what collapsed-coordinate expansions need in
//! their degenerate directions.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod jacobi;
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
                write!(
                    f,
                    "There is no quadrature rule satisfying the requirements available"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    assert_eq!(weights.len(), points.len(), "Weights and points must have the same length");
    weights.iter().zip(points).map(|(w, x)| w * f(x)).sum()
}
