//! Functionality for error estimation.
use crate::list::ExpansionList;
use crate::local_regions::LocalExpansion;
use itertools::izip;

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ on the given element, where $u_h$ is
/// given by its expansion coefficients.
///
/// The exact solution is evaluated at the physical coordinates of the quadrature points.
///
/// # Panics
///
/// Panics if the coefficient array does not match the expansion.
#[allow(non_snake_case)]
pub fn estimate_element_L2_error_squared(
    expansion: &LocalExpansion,
    u: impl Fn(&[f64]) -> f64,
    u_h_coeffs: &[f64],
) -> f64 {
    let u_h = expansion.bwd_trans(u_h_coeffs);
    let coords = expansion.coords();
    let metric = expansion.quadrature_metric();
    let mut x = vec![0.0; expansion.coord_dim()];

    let mut result = 0.0;
    for (q, u_h, w) in izip!(0.., &u_h, metric.iter()) {
        for (x_k, coord) in x.iter_mut().zip(coords.iter()) {
            *x_k = coord[q];
        }
        let error = u_h - u(&x);
        result += w * error * error;
    }
    result
}

/// Estimate the squared $H^1$ *seminorm* error $\seminorm{u_h - u}^2_{H^1}$ on the given element.
///
/// `u_grad` returns the gradient of the exact solution with respect to the physical coordinates.
#[allow(non_snake_case)]
pub fn estimate_element_H1_seminorm_error_squared(
    expansion: &LocalExpansion,
    u_grad: impl Fn(&[f64]) -> Vec<f64>,
    u_h_coeffs: &[f64],
) -> f64 {
    let u_h = expansion.bwd_trans(u_h_coeffs);
    let u_h_grad = expansion.phys_deriv(&u_h);
    let coords = expansion.coords();
    let metric = expansion.quadrature_metric();
    let mut x = vec![0.0; expansion.coord_dim()];

    let mut result = 0.0;
    for (q, w) in metric.iter().enumerate() {
        for (x_k, coord) in x.iter_mut().zip(coords.iter()) {
            *x_k = coord[q];
        }
        let grad = u_grad(&x);
        assert_eq!(grad.len(), u_h_grad.len(), "Gradient has the wrong dimension");
        let error_squared: f64 = grad
            .iter()
            .zip(&u_h_grad)
            .map(|(g, g_h)| (g_h[q] - g).powi(2))
            .sum();
        result += w * error_squared;
    }
    result
}

/// Estimate the maximum pointwise error $\max_q |u_h(x_q) - u(x_q)|$ over the quadrature points
/// of the given element.
#[allow(non_snake_case)]
pub fn estimate_element_Linf_error(expansion: &LocalExpansion, u: impl Fn(&[f64]) -> f64, u_h_coeffs: &[f64]) -> f64 {
    let u_h = expansion.bwd_trans(u_h_coeffs);
    let coords = expansion.coords();
    let mut x = vec![0.0; expansion.coord_dim()];

    let mut max_error: f64 = 0.0;
    for (q, u_h) in u_h.iter().enumerate() {
        for (x_k, coord) in x.iter_mut().zip(coords.iter()) {
            *x_k = coord[q];
        }
        max_error = max_error.max((u_h - u(&x)).abs());
    }
    max_error
}

/// Estimate the $L^2$ error over all elements of the list, using the list's coefficients.
#[allow(non_snake_case)]
pub fn estimate_L2_error(list: &ExpansionList, u: impl Fn(&[f64]) -> f64) -> f64 {
    list.iter()
        .enumerate()
        .map(|(i, expansion)| estimate_element_L2_error_squared(expansion, &u, list.element_coeffs(i)))
        .sum::<f64>()
        .sqrt()
}

/// Estimate the maximum pointwise error over all elements of the list, using the list's
/// coefficients.
#[allow(non_snake_case)]
pub fn estimate_Linf_error(list: &ExpansionList, u: impl Fn(&[f64]) -> f64) -> f64 {
    list.iter()
        .enumerate()
        .map(|(i, expansion)| estimate_element_Linf_error(expansion, &u, list.element_coeffs(i)))
        .fold(0.0, f64::max)
}
