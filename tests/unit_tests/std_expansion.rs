use spectral_hp::foundations::BasisRegistry;
use spectral_hp::matrix::condensation::uncondense;
use spectral_hp::matrix::MatrixType;
use spectral_hp::proptest::{coefficients, expansion_settings, shape_type};
use spectral_hp::shape::ShapeType;
use spectral_hp::std_regions::{BasisFamily, ExpansionSettings, StdExpansion};
use std::sync::Arc;
use util::{assert_panics, matrix_from_operator, pseudo_random_values};

use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DMatrix;
use proptest::prelude::*;

fn std_expansion(registry: &BasisRegistry, shape: ShapeType, num_modes: usize, family: BasisFamily) -> Arc<StdExpansion> {
    registry.std_expansion(&ExpansionSettings::new(num_modes, family).expansion_key(shape))
}

fn modified_shapes() -> impl Iterator<Item = ShapeType> {
    ShapeType::ALL
        .into_iter()
        .filter(|&shape| shape != ShapeType::Pyramid)
}

#[test]
fn cubic_modified_triangle_integrates_to_its_area() {
    let registry = BasisRegistry::new();
    let triangle = std_expansion(&registry, ShapeType::Triangle, 4, BasisFamily::Modified);
    assert_eq!(triangle.num_coeffs(), 10);
    assert_eq!(triangle.points_per_direction(), [5, 4, 1]);
    let ones = vec![1.0; triangle.num_points()];
    assert_scalar_eq!(triangle.integral(&ones), 2.0, comp = abs, tol = 1e-13);
}

#[test]
fn number_of_coefficients_per_shape() {
    let registry = BasisRegistry::new();
    let n = 4;
    let expected = [
        (ShapeType::Segment, n),
        (ShapeType::Triangle, n * (n + 1) / 2),
        (ShapeType::Quadrilateral, n * n),
        (ShapeType::Tetrahedron, n * (n + 1) * (n + 2) / 6),
        (ShapeType::Prism, n * n * (n + 1) / 2),
        (ShapeType::Hexahedron, n * n * n),
    ];
    for (shape, num_coeffs) in expected {
        let expansion = std_expansion(&registry, shape, n, BasisFamily::Modified);
        assert_eq!(expansion.num_coeffs(), num_coeffs, "{shape}");
    }
    // Pyramids span the polynomials of total degree below n
    let pyramid = std_expansion(&registry, ShapeType::Pyramid, n, BasisFamily::Orthogonal);
    assert_eq!(pyramid.num_coeffs(), n * (n + 1) * (n + 2) / 6);
}

#[test]
fn orthogonal_mass_matrix_is_identity() {
    let registry = BasisRegistry::new();
    for shape in ShapeType::ALL {
        let expansion = std_expansion(&registry, shape, 4, BasisFamily::Orthogonal);
        let mass = expansion.std_matrix(&expansion.matrix_key(MatrixType::Mass));
        let identity = DMatrix::<f64>::identity(expansion.num_coeffs(), expansion.num_coeffs());
        assert_matrix_eq!(mass.as_ref().clone(), identity, comp = abs, tol = 1e-11);
    }
}

#[test]
fn vertex_modes_form_partition_of_unity() {
    let registry = BasisRegistry::new();
    for shape in modified_shapes() {
        let expansion = std_expansion(&registry, shape, 4, BasisFamily::Modified);
        let mut coeffs = vec![0.0; expansion.num_coeffs()];
        for v in 0..shape.num_vertices() {
            coeffs[expansion.vertex_map(v)] = 1.0;
        }
        for value in expansion.bwd_trans(&coeffs) {
            assert_scalar_eq!(value, 1.0, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn vertex_modes_are_nodal_at_vertices() {
    let registry = BasisRegistry::new();
    for shape in modified_shapes() {
        let expansion = std_expansion(&registry, shape, 3, BasisFamily::Modified);
        for v in 0..shape.num_vertices() {
            let mode = expansion.fill_mode(expansion.vertex_map(v));
            for (w, vertex) in shape.reference_vertices().iter().enumerate() {
                let value = expansion.phys_evaluate(&vertex[..shape.dim()], &mode);
                let expected = if v == w { 1.0 } else { 0.0 };
                assert_scalar_eq!(value, expected, comp = abs, tol = 1e-10);
            }
        }
    }
}

#[test]
fn boundary_and_interior_maps_partition_coefficients() {
    let registry = BasisRegistry::new();
    let n = 5;
    for shape in modified_shapes() {
        let expansion = std_expansion(&registry, shape, n, BasisFamily::Modified);
        let boundary = expansion.boundary_map();
        let interior = expansion.interior_map();
        assert_eq!(boundary.len() + interior.len(), expansion.num_coeffs());
        let mut all: Vec<usize> = boundary.iter().chain(&interior).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..expansion.num_coeffs()).collect::<Vec<_>>());
        for v in 0..shape.num_vertices() {
            assert!(boundary.contains(&expansion.vertex_map(v)));
        }
    }

    let quad = std_expansion(&registry, ShapeType::Quadrilateral, n, BasisFamily::Modified);
    assert_eq!(quad.num_boundary_coeffs(), 4 * (n - 1));
    assert_eq!(quad.num_interior_coeffs(), (n - 2) * (n - 2));
    let triangle = std_expansion(&registry, ShapeType::Triangle, n, BasisFamily::Modified);
    assert_eq!(triangle.num_boundary_coeffs(), 3 * (n - 1));
    assert_eq!(triangle.num_interior_coeffs(), (n - 2) * (n - 3) / 2);
    let hex = std_expansion(&registry, ShapeType::Hexahedron, n, BasisFamily::Modified);
    assert_eq!(hex.num_interior_coeffs(), (n - 2) * (n - 2) * (n - 2));
}

#[test]
fn interior_modes_vanish_on_the_boundary() {
    let registry = BasisRegistry::new();
    let quad = std_expansion(&registry, ShapeType::Quadrilateral, 5, BasisFamily::Modified);
    let [n0, n1, _] = quad.points_per_direction();
    for m in quad.interior_map() {
        let mode = quad.fill_mode(m);
        for j in 0..n1 {
            for i in 0..n0 {
                if i == 0 || j == 0 || i == n0 - 1 || j == n1 - 1 {
                    assert_scalar_eq!(mode[i + n0 * j], 0.0, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn boundary_maps_are_not_available_for_orthogonal_expansions() {
    let registry = BasisRegistry::new();
    let triangle = std_expansion(&registry, ShapeType::Triangle, 3, BasisFamily::Orthogonal);
    assert_panics!(triangle.boundary_map());
    assert_panics!(triangle.vertex_map(0));
}

#[test]
fn mass_matrix_matches_quadrature_of_basis_products() {
    let registry = BasisRegistry::new();
    for shape in modified_shapes() {
        let expansion = std_expansion(&registry, shape, 3, BasisFamily::Modified);
        let n = expansion.num_coeffs();
        let expected = matrix_from_operator(n, |c| expansion.iproduct_wrt_base(&expansion.bwd_trans(c)));
        let mass = expansion.std_matrix(&expansion.matrix_key(MatrixType::Mass));
        assert_matrix_eq!(mass.as_ref().clone(), expected, comp = abs, tol = 1e-12);
    }
}

#[test]
fn laplacian_annihilates_constants() {
    let registry = BasisRegistry::new();
    for shape in ShapeType::ALL {
        let family = if shape == ShapeType::Pyramid {
            BasisFamily::Orthogonal
        } else {
            BasisFamily::Modified
        };
        let expansion = std_expansion(&registry, shape, 4, family);
        let constant = expansion.fwd_trans(&vec![1.0; expansion.num_points()]);
        let laplacian = expansion.matrix_op(&expansion.matrix_key(MatrixType::Laplacian), &constant);
        for value in laplacian {
            assert_scalar_eq!(value, 0.0, comp = abs, tol = 1e-10);
        }
    }
}

#[test]
fn laplacian_matches_sum_of_weak_derivatives() {
    // (grad phi_i, grad phi_j) = sum_d (d_d phi_i, d_d phi_j)
    let registry = BasisRegistry::new();
    let tet = std_expansion(&registry, ShapeType::Tetrahedron, 3, BasisFamily::Modified);
    let n = tet.num_coeffs();
    let expected = matrix_from_operator(n, |c| {
        let u = tet.bwd_trans(c);
        let mut result = vec![0.0; n];
        for d in 0..3 {
            let du = tet.phys_deriv_dir(d, &u);
            for (r, v) in result.iter_mut().zip(tet.iproduct_wrt_deriv_base(d, &du)) {
                *r += v;
            }
        }
        result
    });
    let laplacian = tet.std_matrix(&tet.matrix_key(MatrixType::Laplacian));
    assert_matrix_eq!(laplacian.as_ref().clone(), expected, comp = abs, tol = 1e-11);
}

#[test]
fn reference_derivatives_are_exact_for_polynomials() {
    let registry = BasisRegistry::new();
    let triangle = std_expansion(&registry, ShapeType::Triangle, 4, BasisFamily::Modified);
    let xi = triangle.coords();
    let u: Vec<f64> = xi[0].iter().zip(&xi[1]).map(|(x, y)| x * x + x * y).collect();
    let du = triangle.phys_deriv(&u);
    for q in 0..triangle.num_points() {
        let (x, y) = (xi[0][q], xi[1][q]);
        assert_scalar_eq!(du[0][q], 2.0 * x + y, comp = abs, tol = 1e-11);
        assert_scalar_eq!(du[1][q], x, comp = abs, tol = 1e-11);
    }

    let prism = std_expansion(&registry, ShapeType::Prism, 4, BasisFamily::Modified);
    let xi = prism.coords();
    let u: Vec<f64> = (0..prism.num_points())
        .map(|q| xi[0][q] * xi[2][q] + xi[1][q].powi(2))
        .collect();
    let du_dz = prism.phys_deriv_dir(2, &u);
    for q in 0..prism.num_points() {
        assert_scalar_eq!(du_dz[q], xi[0][q], comp = abs, tol = 1e-11);
    }
}

#[test]
fn phys_evaluate_interpolates_polynomials() {
    let registry = BasisRegistry::new();
    let tet = std_expansion(&registry, ShapeType::Tetrahedron, 4, BasisFamily::Modified);
    let f = |x: &[f64]| x[0] * x[1] - 2.0 * x[2] + 0.5;
    let xi = tet.coords();
    let u: Vec<f64> = (0..tet.num_points())
        .map(|q| f(&[xi[0][q], xi[1][q], xi[2][q]]))
        .collect();
    let point = [-0.5, -0.25, -0.6];
    assert_scalar_eq!(tet.phys_evaluate(&point, &u), f(&point), comp = abs, tol = 1e-11);
    // The collapsed vertex
    let apex = [-1.0, -1.0, 1.0];
    assert_scalar_eq!(tet.phys_evaluate(&apex, &u), f(&apex), comp = abs, tol = 1e-10);

    assert_panics!(tet.phys_evaluate(&[0.5, 0.5, 0.5], &u));
}

#[test]
fn nodal_triangle_coefficients_are_nodal_values() {
    let registry = BasisRegistry::new();
    let triangle = std_expansion(&registry, ShapeType::Triangle, 4, BasisFamily::NodalFekete);
    let f = |x: f64, y: f64| x.powi(3) - y * y + x * y + 1.0;
    let nodes = triangle.nodal_points().expect("Expansion is nodal");
    let coeffs: Vec<f64> = nodes.coords(0).iter().zip(nodes.coords(1)).map(|(&x, &y)| f(x, y)).collect();

    let u = triangle.bwd_trans(&coeffs);
    let xi = triangle.coords();
    for q in 0..triangle.num_points() {
        assert_scalar_eq!(u[q], f(xi[0][q], xi[1][q]), comp = abs, tol = 1e-10);
    }
    let projected = triangle.fwd_trans(&u);
    for (c, expected) in projected.iter().zip(&coeffs) {
        assert_scalar_eq!(*c, *expected, comp = abs, tol = 1e-10);
    }

    // Vertices come first in the nodal boundary map
    assert_eq!(triangle.boundary_map(), (0..9).collect::<Vec<_>>());
    assert_eq!(triangle.interior_map(), vec![9]);
    assert_eq!(triangle.vertex_map(2), 2);
}

#[test]
fn gll_lagrange_expansions_are_collocated() {
    let registry = BasisRegistry::new();
    let quad = std_expansion(&registry, ShapeType::Quadrilateral, 4, BasisFamily::GllLagrange);
    assert!(quad.is_collocated());
    let coeffs = pseudo_random_values(quad.num_coeffs(), 7);
    let u = quad.bwd_trans(&coeffs);
    for (value, c) in u.iter().zip(&coeffs) {
        assert_scalar_eq!(*value, *c, comp = abs, tol = 1e-14);
    }
    assert_eq!(quad.fwd_trans(&u), u);
}

#[test]
fn matrices_are_cached_per_key() {
    let registry = BasisRegistry::new();
    let hex = std_expansion(&registry, ShapeType::Hexahedron, 3, BasisFamily::Modified);
    let key = hex.matrix_key(MatrixType::Mass);
    let before = hex.matrix_construction_count();
    let first = hex.std_matrix(&key);
    let second = hex.std_matrix(&key);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(hex.matrix_construction_count(), before + 1);

    // A key of another expansion is rejected
    let other = std_expansion(&registry, ShapeType::Hexahedron, 4, BasisFamily::Modified);
    assert_panics!(hex.std_matrix(&other.matrix_key(MatrixType::Mass)));
}

#[test]
fn static_condensation_reassembles_mass_matrix() {
    let registry = BasisRegistry::new();
    for shape in modified_shapes() {
        let expansion = std_expansion(&registry, shape, 4, BasisFamily::Modified);
        let key = expansion.matrix_key(MatrixType::Mass);
        let mass = expansion.std_matrix(&key);
        let condensed = expansion.std_static_cond_matrix(&key);

        let order: Vec<usize> = expansion
            .boundary_map()
            .into_iter()
            .chain(expansion.interior_map())
            .collect();
        let permuted = DMatrix::from_fn(order.len(), order.len(), |i, j| mass[(order[i], order[j])]);
        assert_matrix_eq!(uncondense(&condensed), permuted, comp = abs, tol = 1e-10);
    }
}

#[test]
fn hybrid_dg_matrices_are_not_implemented() {
    let registry = BasisRegistry::new();
    let quad = std_expansion(&registry, ShapeType::Quadrilateral, 3, BasisFamily::Modified);
    assert_panics!(quad.gen_matrix(&quad.matrix_key(MatrixType::HybridDgHelmholtz)));
    // Helmholtz requires lambda
    assert_panics!(quad.gen_matrix(&quad.matrix_key(MatrixType::Helmholtz)));
}

proptest! {
    #[test]
    fn reference_volume_is_integrated_exactly(shape in shape_type(), settings in expansion_settings()) {
        let registry = BasisRegistry::new();
        let expansion = registry.std_expansion(&settings.expansion_key(shape));
        let ones = vec![1.0; expansion.num_points()];
        let volume = expansion.integral(&ones);
        prop_assert!((volume - shape.reference_volume()).abs() <= 1e-12);
    }

    #[test]
    fn forward_transform_inverts_backward_transform(
        (shape, settings, coeffs) in (shape_type(), expansion_settings())
            .prop_flat_map(|(shape, settings)| {
                let registry = BasisRegistry::new();
                let n = registry.std_expansion(&settings.expansion_key(shape)).num_coeffs();
                (Just(shape), Just(settings), coefficients(n))
            })
    ) {
        let registry = BasisRegistry::new();
        let expansion = registry.std_expansion(&settings.expansion_key(shape));
        let u = expansion.bwd_trans(&coeffs);
        let projected = expansion.fwd_trans(&u);
        for (c, expected) in projected.iter().zip(&coeffs) {
            prop_assert!((c - expected).abs() <= 1e-9);
        }
    }

    #[test]
    fn integral_of_basis_times_data_is_inner_product(shape in shape_type(), settings in expansion_settings(), seed in 0u64..1000) {
        let registry = BasisRegistry::new();
        let expansion = registry.std_expansion(&settings.expansion_key(shape));
        let u = pseudo_random_values(expansion.num_points(), seed);
        let iproduct = expansion.iproduct_wrt_base(&u);
        for m in 0..expansion.num_coeffs() {
            let mode = expansion.fill_mode(m);
            let product: Vec<f64> = mode.iter().zip(&u).map(|(a, b)| a * b).collect();
            prop_assert!((expansion.integral(&product) - iproduct[m]).abs() <= 1e-11);
        }
    }
}
