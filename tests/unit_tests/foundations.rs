use spectral_hp::foundations::{triangular_index, BasisKey, BasisRegistry, BasisType, Points, PointsKey, PointsType};
use spectral_hp::shape::ShapeType;
use spectral_hp::std_regions::{BasisFamily, ExpansionSettings};
use std::sync::Arc;
use util::assert_panics;

use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

#[test]
fn univariate_weights_integrate_their_jacobi_weight() {
    let cases = [
        (PointsType::GaussGaussLegendre, 2.0),
        (PointsType::GaussRadauMLegendre, 2.0),
        (PointsType::GaussRadauPLegendre, 2.0),
        (PointsType::GaussLobattoLegendre, 2.0),
        (PointsType::PolyEvenlySpaced, 2.0),
        // Integrals of (1 - x) and (1 - x)^2 over [-1, 1]
        (PointsType::GaussRadauMAlpha1Beta0, 2.0),
        (PointsType::GaussRadauMAlpha2Beta0, 8.0 / 3.0),
    ];
    for (points_type, expected) in cases {
        for n in 2..8 {
            let points = Points::new(PointsKey::new(n, points_type));
            assert_eq!(points.num_points(), n);
            let sum: f64 = points.weights().iter().sum();
            assert_scalar_eq!(sum, expected, comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn endpoints_are_included_where_expected() {
    let gll = Points::new(PointsKey::new(5, PointsType::GaussLobattoLegendre));
    assert!(gll.contains_left_endpoint() && gll.contains_right_endpoint());

    let grm = Points::new(PointsKey::new(5, PointsType::GaussRadauMAlpha1Beta0));
    assert!(grm.contains_left_endpoint());
    assert!(!grm.contains_right_endpoint());

    let grp = Points::new(PointsKey::new(5, PointsType::GaussRadauPLegendre));
    assert!(!grp.contains_left_endpoint());
    assert!(grp.contains_right_endpoint());

    let gauss = Points::new(PointsKey::new(5, PointsType::GaussGaussLegendre));
    assert!(!gauss.contains_left_endpoint() && !gauss.contains_right_endpoint());
}

#[test]
fn too_few_points_is_rejected() {
    assert_panics!(PointsKey::new(1, PointsType::GaussLobattoLegendre));
    assert_panics!(PointsKey::new(0, PointsType::GaussGaussLegendre));
    let key = PointsKey::new(3, PointsType::GaussLobattoLegendre);
    assert_panics!(BasisKey::new(BasisType::ModifiedA, 4, key));
    assert_panics!(BasisKey::new(BasisType::ModifiedA, 0, key));
}

#[test]
fn fekete_points_of_order_three() {
    // Four points per edge gives the ten nodes of a cubic triangle
    let key = PointsKey::new(4, PointsType::NodalTriFekete);
    assert_eq!(key.total_points(), 10);
    let points = Points::new(key);
    assert_eq!(points.num_points(), 10);
    assert_eq!(points.dim(), 2);

    let area: f64 = points.weights().iter().sum();
    assert_scalar_eq!(area, 2.0, comp = abs, tol = 1e-12);

    for i in 0..points.num_points() {
        let (x, y) = (points.coords(0)[i], points.coords(1)[i]);
        assert!(ShapeType::Triangle.contains_reference_point(&[x, y], 1e-12));
    }

    // The nodes double as an interpolatory quadrature rule, exact for cubics
    let integral: f64 = (0..10)
        .map(|i| points.weights()[i] * points.coords(0)[i].powi(2))
        .sum();
    assert_scalar_eq!(integral, 2.0 / 3.0, comp = abs, tol = 1e-12);

    let registry = BasisRegistry::new();
    let settings = ExpansionSettings::new(4, BasisFamily::NodalFekete);
    let expansion = registry.std_expansion(&settings.expansion_key(ShapeType::Triangle));
    assert!(expansion.is_nodal());
    assert_eq!(expansion.num_coeffs(), 10);
    assert_eq!(expansion.nodal_points().map(|p| p.num_points()), Some(10));
}

#[test]
fn fekete_points_of_order_four_follow_their_edges() {
    let key = PointsKey::new(5, PointsType::NodalTriFekete);
    let points = Points::new(key);
    assert_eq!(points.num_points(), 15);
    assert_eq!(key.total_points(), 15);
    let (x, y) = (points.coords(0), points.coords(1));

    // Vertices first, then three interior points per edge
    let vertices = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)];
    for (i, (vx, vy)) in vertices.into_iter().enumerate() {
        assert_scalar_eq!(x[i], vx, comp = abs, tol = 1e-14);
        assert_scalar_eq!(y[i], vy, comp = abs, tol = 1e-14);
    }
    let edge = |e: usize| 3 + 3 * e..6 + 3 * e;

    for i in edge(0) {
        assert_scalar_eq!(y[i], -1.0, comp = abs, tol = 1e-14);
    }
    assert!(edge(0).skip(1).all(|i| x[i] > x[i - 1]));

    for i in edge(1) {
        assert_scalar_eq!(x[i] + y[i], 0.0, comp = abs, tol = 1e-14);
    }
    assert!(edge(1).skip(1).all(|i| x[i] < x[i - 1]));

    for i in edge(2) {
        assert_scalar_eq!(x[i], -1.0, comp = abs, tol = 1e-14);
    }
    assert!(edge(2).skip(1).all(|i| y[i] < y[i - 1]));

    for i in 12..15 {
        assert!(ShapeType::Triangle.contains_reference_point(&[x[i], y[i]], -1e-8));
    }

    let registry = BasisRegistry::new();
    let settings = ExpansionSettings::new(5, BasisFamily::NodalFekete);
    let expansion = registry.std_expansion(&settings.expansion_key(ShapeType::Triangle));
    assert_eq!(expansion.num_coeffs(), points.num_points());
}

#[test]
fn modified_a_basis_has_vertex_and_bubble_modes() {
    let registry = BasisRegistry::new();
    let key = BasisKey::new(BasisType::ModifiedA, 4, PointsKey::new(5, PointsType::GaussLobattoLegendre));
    let basis = registry.basis(key);
    let values = basis.values();
    assert_eq!(values.nrows(), 5);
    assert_eq!(values.ncols(), 4);

    // First point is -1, last point is +1
    assert_scalar_eq!(values[(0, 0)], 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(values[(0, 1)], 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(values[(4, 0)], 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(values[(4, 1)], 1.0, comp = abs, tol = 1e-14);
    for p in 2..4 {
        assert_scalar_eq!(values[(0, p)], 0.0, comp = abs, tol = 1e-14);
        assert_scalar_eq!(values[(4, p)], 0.0, comp = abs, tol = 1e-14);
    }

    // The vertex modes are linear with slopes -1/2 and 1/2
    let derivatives = basis.derivatives();
    for i in 0..5 {
        assert_scalar_eq!(derivatives[(i, 0)], -0.5, comp = abs, tol = 1e-12);
        assert_scalar_eq!(derivatives[(i, 1)], 0.5, comp = abs, tol = 1e-12);
    }
}

#[test]
fn collapsed_bases_are_tabulated_over_triangular_index_set() {
    let points = PointsKey::new(4, PointsType::GaussRadauMAlpha1Beta0);
    for basis_type in [BasisType::ModifiedB, BasisType::OrthoB, BasisType::OrthoC] {
        let key = BasisKey::new(basis_type, 4, points);
        assert!(basis_type.is_triangular());
        assert_eq!(key.table_size(), 10);
        let registry = BasisRegistry::new();
        assert_eq!(registry.basis(key).values().ncols(), 10);
    }
}

#[test]
fn triangular_index_enumerates_pairs_in_order() {
    let n = 5;
    let mut expected = 0;
    for p in 0..n {
        for q in 0..(n - p) {
            assert_eq!(triangular_index(n, p, q), expected);
            expected += 1;
        }
    }
    assert_eq!(expected, n * (n + 1) / 2);
}

#[test]
fn registry_shares_points_and_bases() {
    let registry = BasisRegistry::new();
    let key = BasisKey::new(BasisType::OrthoA, 3, PointsKey::new(4, PointsType::GaussGaussLegendre));
    let a = registry.basis(key);
    let b = registry.basis(key);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.num_bases(), 1);
    assert!(Arc::ptr_eq(a.points(), &registry.points(key.points_key())));

    let expansion_key = ExpansionSettings::new(3, BasisFamily::Modified).expansion_key(ShapeType::Tetrahedron);
    let e1 = registry.std_expansion(&expansion_key);
    let e2 = registry.std_expansion(&expansion_key);
    assert!(Arc::ptr_eq(&e1, &e2));
    assert_eq!(registry.num_std_expansions(), 1);
}

#[test]
fn interpolation_between_point_sets_is_exact_for_polynomials() {
    let registry = BasisRegistry::new();
    let from = PointsKey::new(6, PointsType::GaussLobattoLegendre);
    let to = PointsKey::new(4, PointsType::GaussGaussLegendre);
    let matrix = registry.points_registry().interpolation_matrix(from, to);
    assert_eq!((matrix.nrows(), matrix.ncols()), (4, 6));

    let f = |x: f64| 3.0 * x.powi(5) - x.powi(2) + 1.0;
    let source: Vec<f64> = registry.points(from).z().iter().map(|&x| f(x)).collect();
    let target = matrix.as_ref() * nalgebra::DVector::from_vec(source);
    for (value, &x) in target.iter().zip(registry.points(to).z()) {
        assert_scalar_eq!(*value, f(x), comp = abs, tol = 1e-12);
    }
}

proptest! {
    #[test]
    fn differentiation_matrix_is_exact_for_polynomials(
        n in 2usize..12,
        points_type in prop::sample::select(vec![
            PointsType::GaussGaussLegendre,
            PointsType::GaussLobattoLegendre,
            PointsType::GaussRadauMAlpha1Beta0,
            PointsType::GaussRadauMAlpha2Beta0,
        ])
    ) {
        prop_assume!(n >= points_type.min_points());
        let points = Points::new(PointsKey::new(n, points_type));
        let degree = (n - 1) as i32;
        let values: Vec<f64> = points.z().iter().map(|x| x.powi(degree)).collect();
        let derivative = points.derivative_matrix() * nalgebra::DVector::from_vec(values);
        for (d, &x) in derivative.iter().zip(points.z()) {
            let expected = if degree == 0 { 0.0 } else { degree as f64 * x.powi(degree - 1) };
            prop_assert!((d - expected).abs() <= 1e-8 * (1.0 + expected.abs()));
        }
    }
}
