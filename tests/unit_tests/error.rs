use crate::unit_tests::list::unit_square_list;
use crate::{local_expansion, unit_vertices};
use spectral_hp::error::{
    estimate_L2_error, estimate_Linf_error, estimate_element_H1_seminorm_error_squared,
    estimate_element_L2_error_squared, estimate_element_Linf_error,
};
use spectral_hp::foundations::BasisRegistry;
use spectral_hp::shape::ShapeType;
use spectral_hp::std_regions::BasisFamily;

use matrixcompare::assert_scalar_eq;

fn u_exact(x: &[f64]) -> f64 {
    x[0] * x[0] + x[0] * x[1] - 0.5 * x[1]
}

fn u_exact_grad(x: &[f64]) -> Vec<f64> {
    vec![2.0 * x[0] + x[1], x[0] - 0.5]
}

#[test]
fn projected_polynomial_has_no_error() {
    let registry = BasisRegistry::new();
    let mut list = unit_square_list(&registry, 4);
    let coords = list.coords();
    let u: Vec<f64> = (0..list.num_points())
        .map(|q| u_exact(&[coords[0][q], coords[1][q]]))
        .collect();
    let coeffs = list.fwd_trans(&u);
    list.set_coeffs(&coeffs);

    assert_scalar_eq!(estimate_L2_error(&list, u_exact), 0.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(estimate_Linf_error(&list, u_exact), 0.0, comp = abs, tol = 1e-12);
    for (i, expansion) in list.iter().enumerate() {
        let h1 = estimate_element_H1_seminorm_error_squared(expansion, u_exact_grad, list.element_coeffs(i));
        assert_scalar_eq!(h1, 0.0, comp = abs, tol = 1e-18);
    }
}

#[test]
fn zero_approximation_of_unit_function() {
    let registry = BasisRegistry::new();
    let list = unit_square_list(&registry, 3);
    // The coefficients of a fresh list are zero
    assert_scalar_eq!(estimate_L2_error(&list, |_| 1.0), 1.0, comp = abs, tol = 1e-13);
    assert_scalar_eq!(estimate_Linf_error(&list, |_| 1.0), 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn element_errors_of_linear_function() {
    let registry = BasisRegistry::new();
    let square = local_expansion(
        &registry,
        ShapeType::Quadrilateral,
        &unit_vertices(ShapeType::Quadrilateral),
        3,
        BasisFamily::Modified,
    );
    let zero = vec![0.0; square.num_coeffs()];
    let u = |x: &[f64]| x[0];

    // Integral of x^2 over the unit square
    let l2_squared = estimate_element_L2_error_squared(&square, u, &zero);
    assert_scalar_eq!(l2_squared, 1.0 / 3.0, comp = abs, tol = 1e-13);

    let h1_squared = estimate_element_H1_seminorm_error_squared(&square, |_| vec![1.0, 0.0], &zero);
    assert_scalar_eq!(h1_squared, 1.0, comp = abs, tol = 1e-13);

    // GLL points include the corner x = 1
    let linf = estimate_element_Linf_error(&square, u, &zero);
    assert_scalar_eq!(linf, 1.0, comp = abs, tol = 1e-14);
}
