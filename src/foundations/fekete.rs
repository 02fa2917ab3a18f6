//! Fekete points on the reference triangle.
//!
//! Fekete points maximize the magnitude of the determinant of the Vandermonde matrix of an
//! orthogonal polynomial basis. The points on the boundary are fixed at the vertices and the
//! Gauss-Lobatto-Legendre points of each edge, while the interior points are found by gradient
//! ascent on $\ln |\det V|$.
use crate::COLLAPSE_TOLERANCE;
use log::debug;
use nalgebra::{DMatrix, DVector};
use spectral_hp_quadrature::jacobi::JacobiRecurrence;
use spectral_hp_quadrature::univariate::gauss_lobatto;
use std::cmp::Ordering;

const MAX_ASCENT_ITERATIONS: usize = 5000;
const GRADIENT_TOLERANCE: f64 = 1e-11;
const BOUNDARY_MARGIN: f64 = 1e-8;

/// Number of polynomials of total degree at most `order` in two variables.
pub(crate) fn num_polynomials(order: usize) -> usize {
    (order + 1) * (order + 2) / 2
}

/// Evaluates the orthonormal Dubiner basis of total degree `order` and its gradient at a point of
/// the reference triangle.
///
/// Returns `(values, d/dxi1, d/dxi2)`, with basis functions ordered by `p` (outer) and `q` (inner),
/// `p + q <= order`. The gradient is evaluated in a form that remains finite at the collapsed
/// vertex `(-1, 1)`.
pub(crate) fn dubiner_basis(order: usize, xi: [f64; 2]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let den = 1.0 - xi[1];
    let a = if den.abs() < COLLAPSE_TOLERANCE {
        -1.0
    } else {
        2.0 * (1.0 + xi[0]) / den - 1.0
    };
    let b = xi[1];
    let h = 0.5 * (1.0 - b);

    let n = num_polynomials(order);
    let mut values = Vec::with_capacity(n);
    let mut d1 = Vec::with_capacity(n);
    let mut d2 = Vec::with_capacity(n);
    for p in 0..=order {
        let (pa, dpa) = JacobiRecurrence::evaluate(p, 0.0, 0.0, a).value_and_derivative();
        let alpha = 2.0 * p as f64 + 1.0;
        for q in 0..=(order - p) {
            let (pb, dpb) = JacobiRecurrence::evaluate(q, alpha, 0.0, b).value_and_derivative();
            let c = ((p as f64 + 0.5) * (p as f64 + q as f64 + 1.0)).sqrt();
            values.push(c * pa * h.powi(p as i32) * pb);
            if p == 0 {
                d1.push(0.0);
                d2.push(c * dpb);
            } else {
                let h_pm1 = h.powi(p as i32 - 1);
                d1.push(c * dpa * h_pm1 * pb);
                let from_a = dpa * 0.5 * (1.0 + a) * h_pm1 * pb;
                let from_b = pa * (-0.5 * p as f64 * h_pm1 * pb + h_pm1 * h * dpb);
                d2.push(c * (from_a + from_b));
            }
        }
    }
    (values, d1, d2)
}

/// The integral of the first Dubiner polynomial over the reference triangle.
fn dubiner_constant_integral() -> f64 {
    2.0 * 0.5f64.sqrt()
}

/// Assembles the Vandermonde matrix and its derivatives, with one row per point.
pub(crate) fn vandermonde(order: usize, points: &[[f64; 2]]) -> [DMatrix<f64>; 3] {
    let n = num_polynomials(order);
    let mut v = DMatrix::zeros(points.len(), n);
    let mut vx = DMatrix::zeros(points.len(), n);
    let mut vy = DMatrix::zeros(points.len(), n);
    for (i, &point) in points.iter().enumerate() {
        let (values, d1, d2) = dubiner_basis(order, point);
        for m in 0..n {
            v[(i, m)] = values[m];
            vx[(i, m)] = d1[m];
            vy[(i, m)] = d2[m];
        }
    }
    [v, vx, vy]
}

fn is_strictly_inside(p: &[f64; 2]) -> bool {
    p[0] > -1.0 + BOUNDARY_MARGIN && p[1] > -1.0 + BOUNDARY_MARGIN && p[0] + p[1] < -BOUNDARY_MARGIN
}

/// Returns `ln |det V|` and its gradient with respect to the interior points, if `V` is invertible.
fn objective_and_gradient(order: usize, points: &[[f64; 2]], first_interior: usize) -> Option<(f64, Vec<[f64; 2]>)> {
    let [v, vx, vy] = vandermonde(order, points);
    let det = v.clone().lu().determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let v_inv = v.try_inverse()?;
    let gradient = (first_interior..points.len())
        .map(|i| {
            let mut g = [0.0; 2];
            for m in 0..v_inv.nrows() {
                g[0] += v_inv[(m, i)] * vx[(i, m)];
                g[1] += v_inv[(m, i)] * vy[(i, m)];
            }
            g
        })
        .collect();
    Some((det.abs().ln(), gradient))
}

fn maximize_interior_determinant(order: usize, points: &mut [[f64; 2]], first_interior: usize) {
    if first_interior == points.len() {
        return;
    }

    let Some((mut objective, mut gradient)) = objective_and_gradient(order, points, first_interior) else {
        panic!("Initial interior points for the Fekete ascent are degenerate");
    };
    let mut step = 0.05;
    let mut iterations = 0;
    while iterations < MAX_ASCENT_ITERATIONS {
        iterations += 1;
        let grad_norm_squared: f64 = gradient.iter().map(|g| g[0] * g[0] + g[1] * g[1]).sum();
        if grad_norm_squared.sqrt() < GRADIENT_TOLERANCE {
            break;
        }

        // Backtracking line search with the Armijo condition
        let mut t = step;
        let mut accepted = false;
        while t * grad_norm_squared.sqrt() > 1e-16 {
            let mut candidate = points.to_vec();
            for (p, g) in candidate[first_interior..].iter_mut().zip(&gradient) {
                p[0] += t * g[0];
                p[1] += t * g[1];
            }
            if candidate[first_interior..].iter().all(is_strictly_inside) {
                if let Some((new_objective, new_gradient)) = objective_and_gradient(order, &candidate, first_interior) {
                    if new_objective >= objective + 1e-4 * t * grad_norm_squared {
                        points.copy_from_slice(&candidate);
                        objective = new_objective;
                        gradient = new_gradient;
                        accepted = true;
                        break;
                    }
                }
            }
            t *= 0.5;
        }

        if !accepted {
            break;
        }
        step = 2.0 * t;
    }
    debug!("Fekete ascent for order {order} finished after {iterations} iterations, ln|det V| = {objective}");
}

/// Sorts the points of each edge along the direction the edge is traversed.
///
/// The first three points are the vertices. They are followed by the interior points of edge 0
/// (ascending first coordinate), edge 1 (descending first coordinate) and edge 2 (descending second
/// coordinate). The sort is stable.
pub(crate) fn reorder_edge_points(points: &mut [[f64; 2]], num_points_per_edge: usize) {
    let m = num_points_per_edge.saturating_sub(2);
    let cmp = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    points[3..3 + m].sort_by(|a, b| cmp(a[0], b[0]));
    points[3 + m..3 + 2 * m].sort_by(|a, b| cmp(b[0], a[0]));
    points[3 + 2 * m..3 + 3 * m].sort_by(|a, b| cmp(b[1], a[1]));
}

/// Computes the Fekete points with `num_points_per_edge` points along each edge.
///
/// Returns the first and second coordinates of all `n (n + 1) / 2` points. Vertices come first,
/// followed by the edge interior points and finally the interior points.
pub(crate) fn fekete_points(num_points_per_edge: usize) -> [Vec<f64>; 2] {
    let n = num_points_per_edge;
    assert!(n >= 2, "Fekete points require at least two points per edge");
    let order = n - 1;

    let mut points = vec![[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
    let (_, gll) = gauss_lobatto(n, 0.0, 0.0).unwrap_or_else(|err| panic!("{err}"));
    let edge_interior: Vec<f64> = gll[1..n - 1].iter().map(|[t]| *t).collect();
    points.extend(edge_interior.iter().map(|&t| [t, -1.0]));
    points.extend(edge_interior.iter().map(|&t| [-t, t]));
    points.extend(edge_interior.iter().map(|&t| [-1.0, -t]));

    let first_interior = points.len();
    for i in 1..order {
        for j in 1..(order - i) {
            points.push([-1.0 + 2.0 * i as f64 / order as f64, -1.0 + 2.0 * j as f64 / order as f64]);
        }
    }
    assert_eq!(
        points.len(),
        n * (n + 1) / 2,
        "Internal error: unexpected number of Fekete points"
    );

    maximize_interior_determinant(order, &mut points, first_interior);
    reorder_edge_points(&mut points, n);

    let x = points.iter().map(|p| p[0]).collect();
    let y = points.iter().map(|p| p[1]).collect();
    [x, y]
}

/// Computes quadrature weights and differentiation matrices for a nodal set on the triangle.
///
/// The weights integrate every polynomial of total degree `n - 1` exactly. The differentiation
/// matrices map nodal values to nodal values of the partial derivatives of the interpolant.
pub(crate) fn fekete_weights_and_derivatives(
    num_points_per_edge: usize,
    x: &[f64],
    y: &[f64],
) -> (Vec<f64>, [DMatrix<f64>; 2]) {
    let order = num_points_per_edge - 1;
    let points: Vec<[f64; 2]> = x.iter().zip(y).map(|(&x, &y)| [x, y]).collect();
    let [v, vx, vy] = vandermonde(order, &points);
    let v_inv = v
        .try_inverse()
        .unwrap_or_else(|| panic!("Vandermonde matrix of the nodal triangle points is singular"));

    let mut rhs = DVector::zeros(points.len());
    rhs[0] = dubiner_constant_integral();
    let weights = v_inv.transpose() * rhs;
    let dx = vx * &v_inv;
    let dy = vy * &v_inv;
    (weights.as_slice().to_vec(), [dx, dy])
}
