//! Quadrature rules for the one-dimensional domain `[-1, 1]`.
//!
//! All rules integrate against the Jacobi weight $(1 - x)^\alpha (1 + x)^\beta$. Given `n` points,
//! Gauss rules are exact for polynomials of degree up to `2n - 1`, Gauss-Radau rules up to
//! `2n - 2` and Gauss-Lobatto rules up to `2n - 3`.

use crate::jacobi::{jacobi, jacobi_zeros, JacobiRecurrence};
use crate::{Error, Rule};
use statrs::function::gamma::gamma;

/// The integral of the Jacobi weight over `[-1, 1]`.
fn jacobi_weight_integral(alpha: f64, beta: f64) -> f64 {
    2f64.powf(alpha + beta + 1.0) * gamma(alpha + 1.0) * gamma(beta + 1.0) / gamma(alpha + beta + 2.0)
}

fn into_rule(weights: Vec<f64>, points: Vec<f64>) -> Rule<1> {
    assert_eq!(weights.len(), points.len());
    (weights, points.into_iter().map(|x| [x]).collect())
}

/// Gauss-Legendre quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points. Given `n` points,
/// the rule integrates polynomials of order up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    gauss_jacobi(num_points, 0.0, 0.0)
}

/// Gauss-Jacobi quadrature with the given number of points.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss_jacobi(num_points: usize, alpha: f64, beta: f64) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let points = jacobi_zeros(n, alpha, beta);
    let apb = alpha + beta;
    let nf = n as f64;
    let fac = 2f64.powf(apb + 1.0) * gamma(alpha + nf + 1.0) * gamma(beta + nf + 1.0)
        / (gamma(nf + 1.0) * gamma(apb + nf + 1.0));

    let weights = points
        .iter()
        .map(|&z| {
            let dp = JacobiRecurrence::evaluate(n, alpha, beta, z).derivative();
            fac / ((1.0 - z * z) * dp * dp)
        })
        .collect();

    into_rule(weights, points)
}

/// Gauss-Radau-Jacobi quadrature including the left end point `x = -1`.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss_radau_m(num_points: usize, alpha: f64, beta: f64) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");
    if n == 1 {
        return into_rule(vec![jacobi_weight_integral(alpha, beta)], vec![-1.0]);
    }

    let mut points = Vec::with_capacity(n);
    points.push(-1.0);
    points.extend(jacobi_zeros(n - 1, alpha, beta + 1.0));

    let apb = alpha + beta;
    let nf = n as f64;
    let fac = 2f64.powf(apb) * gamma(alpha + nf) * gamma(beta + nf)
        / (gamma(nf) * (beta + nf) * gamma(apb + nf + 1.0));

    let mut weights: Vec<f64> = points
        .iter()
        .map(|&z| {
            let p = jacobi(n - 1, alpha, beta, z);
            fac * (1.0 - z) / (p * p)
        })
        .collect();
    weights[0] *= beta + 1.0;

    into_rule(weights, points)
}

/// Gauss-Radau-Jacobi quadrature including the right end point `x = 1`.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss_radau_p(num_points: usize, alpha: f64, beta: f64) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");
    if n == 1 {
        return into_rule(vec![jacobi_weight_integral(alpha, beta)], vec![1.0]);
    }

    let mut points = jacobi_zeros(n - 1, alpha + 1.0, beta);
    points.push(1.0);

    let apb = alpha + beta;
    let nf = n as f64;
    let fac = 2f64.powf(apb) * gamma(alpha + nf) * gamma(beta + nf)
        / (gamma(nf) * (alpha + nf) * gamma(apb + nf + 1.0));

    let mut weights: Vec<f64> = points
        .iter()
        .map(|&z| {
            let p = jacobi(n - 1, alpha, beta, z);
            fac * (1.0 + z) / (p * p)
        })
        .collect();
    weights[n - 1] *= alpha + 1.0;

    into_rule(weights, points)
}

/// Gauss-Lobatto-Jacobi quadrature including both end points.
///
/// Returns an error if fewer than two points are requested, since the rule must contain
/// both end points.
pub fn gauss_lobatto(num_points: usize, alpha: f64, beta: f64) -> Result<Rule<1>, Error> {
    let n = num_points;
    if n < 2 {
        return Err(Error::NoRuleAvailable);
    }

    let mut points = Vec::with_capacity(n);
    points.push(-1.0);
    points.extend(jacobi_zeros(n - 2, alpha + 1.0, beta + 1.0));
    points.push(1.0);

    let apb = alpha + beta;
    let nf = n as f64;
    let fac = 2f64.powf(apb + 1.0) * gamma(alpha + nf) * gamma(beta + nf)
        / ((nf - 1.0) * gamma(nf) * gamma(apb + nf + 1.0));

    let mut weights: Vec<f64> = points
        .iter()
        .map(|&z| {
            let p = jacobi(n - 1, alpha, beta, z);
            fac / (p * p)
        })
        .collect();
    weights[0] *= beta + 1.0;
    weights[n - 1] *= alpha + 1.0;

    Ok(into_rule(weights, points))
}
