use crate::{local_expansion, unit_vertices};
use spectral_hp::foundations::BasisRegistry;
use spectral_hp::geometry::{GeomType, Geometry};
use spectral_hp::local_regions::LocalExpansion;
use spectral_hp::matrix::condensation::{condense, uncondense};
use spectral_hp::matrix::{BlockMatrix, ConstFactorType, MatrixType, ScaledMatrix, VarCoeffType};
use spectral_hp::shape::ShapeType;
use spectral_hp::std_regions::{BasisFamily, ExpansionSettings};
use std::sync::{Arc, Barrier};
use std::thread;
use util::{assert_panics, pseudo_random_values};

use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector};

fn skewed_quadrilateral(registry: &BasisRegistry, geom_type: GeomType) -> LocalExpansion {
    let vertices = [[0.0, 0.0], [2.0, 0.5], [2.5, 1.5], [0.5, 1.0]];
    let geometry = Geometry::from_vertices(registry, ShapeType::Quadrilateral, &vertices).with_geom_type(geom_type);
    let settings = ExpansionSettings::new(4, BasisFamily::Modified);
    LocalExpansion::from_settings(registry, Arc::new(geometry), &settings).unwrap()
}

fn boundary_interior_permutation(expansion: &LocalExpansion, matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let order: Vec<usize> = expansion
        .boundary_map()
        .into_iter()
        .chain(expansion.interior_map())
        .collect();
    DMatrix::from_fn(order.len(), order.len(), |i, j| matrix[(order[i], order[j])])
}

#[test]
fn local_matrices_are_cached_until_dropped() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Regular);
    let key = quad.matrix_key(MatrixType::Laplacian);

    let first = quad.loc_matrix(&key);
    let second = quad.loc_matrix(&key);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(quad.loc_matrix_construction_count(), 1);

    assert!(quad.drop_loc_matrix(&key));
    assert!(!quad.drop_loc_matrix(&key));
    let third = quad.loc_matrix(&key);
    assert_eq!(quad.loc_matrix_construction_count(), 2);
    // Dropped handles stay valid and hold the same values
    assert_matrix_eq!(first.to_dense(), third.to_dense(), comp = abs, tol = 0.0);

    let condensed = quad.loc_static_cond_matrix(&key);
    assert!(Arc::ptr_eq(&condensed, &quad.loc_static_cond_matrix(&key)));
    assert_eq!(quad.static_cond_construction_count(), 1);
    assert!(quad.drop_loc_static_cond_matrix(&key));
    assert!(!quad.drop_loc_static_cond_matrix(&key));
}

#[test]
fn concurrent_requests_construct_local_matrix_once() {
    let registry = BasisRegistry::new();
    let geometry = Geometry::from_vertices(&registry, ShapeType::Hexahedron, &unit_vertices(ShapeType::Hexahedron))
        .with_geom_type(GeomType::Deformed);
    let settings = ExpansionSettings::new(5, BasisFamily::Modified);
    let hex = LocalExpansion::from_settings(&registry, Arc::new(geometry), &settings).unwrap();
    let key = hex.matrix_key(MatrixType::Mass);

    let barrier = Barrier::new(2);
    let matrices: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    hex.loc_matrix(&key)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(hex.loc_matrix_construction_count(), 1);
    assert!(Arc::ptr_eq(&matrices[0], &matrices[1]));

    let condensed: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    hex.loc_static_cond_matrix(&key)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(hex.static_cond_construction_count(), 1);
    assert!(Arc::ptr_eq(&condensed[0], &condensed[1]));
}

#[test]
fn keys_from_other_expansions_are_rejected() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Regular);
    let triangle = local_expansion(
        &registry,
        ShapeType::Triangle,
        &unit_vertices(ShapeType::Triangle),
        4,
        BasisFamily::Modified,
    );
    assert_panics!(quad.loc_matrix(&triangle.matrix_key(MatrixType::Mass)));
    assert_panics!(quad.loc_static_cond_matrix(&triangle.matrix_key(MatrixType::Mass)));
}

#[test]
fn static_condensation_reassembles_local_matrices() {
    let registry = BasisRegistry::new();
    for geom_type in [GeomType::Regular, GeomType::Deformed] {
        let quad = skewed_quadrilateral(&registry, geom_type);
        let helmholtz = quad
            .matrix_key(MatrixType::Helmholtz)
            .with_const_factor(ConstFactorType::Lambda, 1.5);
        for key in [quad.matrix_key(MatrixType::Mass), helmholtz] {
            let dense = quad.loc_matrix(&key).to_dense();
            let condensed = quad.loc_static_cond_matrix(&key);
            assert_eq!(condensed.num_block_rows(), 2);
            assert_eq!(condensed.block(0, 0).map(ScaledMatrix::nrows), Some(quad.num_boundary_coeffs()));
            let expected = boundary_interior_permutation(&quad, &dense);
            assert_matrix_eq!(uncondense(&condensed), expected, comp = abs, tol = 1e-10);
        }
    }
}

#[test]
fn schur_complement_solves_for_boundary_unknowns() {
    let registry = BasisRegistry::new();
    let tri = local_expansion(
        &registry,
        ShapeType::Triangle,
        &[[0.0, 0.0], [1.0, 0.2], [0.4, 1.1]],
        4,
        BasisFamily::Modified,
    );
    let key = tri.matrix_key(MatrixType::Mass);
    let mass = boundary_interior_permutation(&tri, &tri.loc_matrix(&key).to_dense());
    let condensed = tri.loc_static_cond_matrix(&key);
    let nb = tri.num_boundary_coeffs();
    let n = tri.num_coeffs();

    // Solve M x = f through the Schur complement and check the residual of the full system
    let f = DVector::from_vec(pseudo_random_values(n, 41));
    let block = |i, j| condensed.block(i, j).unwrap().to_dense();
    let (f_b, f_i) = (f.rows(0, nb).into_owned(), f.rows(nb, n - nb).into_owned());
    let rhs = &f_b - block(0, 1) * &f_i;
    let x_b = block(0, 0).lu().solve(&rhs).unwrap();
    let x_i = block(1, 1) * (&f_i - block(1, 0) * &x_b);

    let x = DVector::from_iterator(n, x_b.iter().chain(x_i.iter()).copied());
    assert_matrix_eq!(mass * x, f, comp = abs, tol = 1e-9);
}

#[test]
fn condensation_of_explicit_matrix() {
    let matrix = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
    let blocks = condense(&matrix, &[0, 2], &[1], 2.0);
    // Scales are (factor, 1, factor, 1 / factor)
    assert_scalar_eq!(blocks.block(0, 0).unwrap().scale(), 2.0);
    assert_scalar_eq!(blocks.block(0, 1).unwrap().scale(), 1.0);
    assert_scalar_eq!(blocks.block(1, 1).unwrap().scale(), 0.5);

    let schur = blocks.block(0, 0).unwrap().to_dense();
    let expected = DMatrix::from_row_slice(2, 2, &[4.0 - 1.0 / 3.0, 0.5 - 0.2 / 3.0, 0.5 - 0.2 / 3.0, 2.0 - 0.04 / 3.0]);
    assert_matrix_eq!(schur, expected * 2.0, comp = abs, tol = 1e-14);

    let reassembled = uncondense(&blocks);
    let permuted = DMatrix::from_row_slice(3, 3, &[4.0, 0.5, 1.0, 0.5, 2.0, 0.2, 1.0, 0.2, 3.0]);
    assert_matrix_eq!(reassembled, permuted * 2.0, comp = abs, tol = 1e-13);
}

#[test]
fn block_matrix_product_matches_dense_product() {
    let mut blocks = BlockMatrix::new(vec![2, 1], vec![1, 2]);
    blocks.set_block(0, 0, ScaledMatrix::from_matrix(DMatrix::from_row_slice(2, 1, &[1.0, 2.0])));
    blocks.set_block(1, 1, ScaledMatrix::new(3.0, Arc::new(DMatrix::from_row_slice(1, 2, &[1.0, -1.0]))));
    assert_eq!((blocks.nrows(), blocks.ncols()), (3, 3));
    let x = [1.0, 2.0, 5.0];
    let dense = blocks.to_dense() * DVector::from_column_slice(&x);
    assert_eq!(blocks.multiply(&x), dense.as_slice().to_vec());
    assert_eq!(blocks.multiply(&x), vec![1.0, 2.0, -9.0]);
    assert!(blocks.block(0, 1).is_none());
    assert_panics!(blocks.set_block(0, 1, ScaledMatrix::from_matrix(DMatrix::zeros(1, 1))));
}

#[test]
fn inverse_mass_inverts_mass() {
    let registry = BasisRegistry::new();
    for geom_type in [GeomType::Regular, GeomType::Deformed] {
        let quad = skewed_quadrilateral(&registry, geom_type);
        let mass = quad.loc_matrix(&quad.matrix_key(MatrixType::Mass)).to_dense();
        let inv_mass = quad.loc_matrix(&quad.matrix_key(MatrixType::InvMass)).to_dense();
        let n = quad.num_coeffs();
        assert_matrix_eq!(inv_mass * mass, DMatrix::<f64>::identity(n, n), comp = abs, tol = 1e-9);
    }
}

#[test]
fn variable_coefficients_weight_the_operators() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Regular);
    let nq = quad.num_points();
    let coeffs = pseudo_random_values(quad.num_coeffs(), 13);

    let mass = quad.loc_matrix(&quad.matrix_key(MatrixType::Mass)).to_dense();
    let weighted_key = quad
        .matrix_key(MatrixType::Mass)
        .with_var_coeff(VarCoeffType::Mass, vec![2.0; nq]);
    assert!(weighted_key.has_var_coeffs());
    let weighted = quad.loc_matrix(&weighted_key).to_dense();
    assert_matrix_eq!(weighted, &mass * 2.0, comp = abs, tol = 1e-12);
    let applied = quad.mass_matrix_op(&coeffs, &weighted_key);
    let expected = &mass * DVector::from_vec(coeffs.clone()) * 2.0;
    for (a, b) in applied.iter().zip(expected.iter()) {
        assert_scalar_eq!(*a, *b, comp = abs, tol = 1e-11);
    }

    // Isotropic diffusion D = 3 I
    let laplacian = quad.loc_matrix(&quad.matrix_key(MatrixType::Laplacian)).to_dense();
    let diffusion_key = quad
        .matrix_key(MatrixType::Laplacian)
        .with_var_coeff(VarCoeffType::diffusion(0, 0), vec![3.0; nq])
        .with_var_coeff(VarCoeffType::diffusion(1, 1), vec![3.0; nq]);
    let diffusion = quad.loc_matrix(&diffusion_key).to_dense();
    assert_matrix_eq!(diffusion, laplacian * 3.0, comp = abs, tol = 1e-10);
}

#[test]
fn keys_with_equal_coefficients_share_cache_entries() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Deformed);
    let nq = quad.num_points();
    let values: Vec<f64> = (0..nq).map(|q| 1.0 + q as f64 / nq as f64).collect();
    let a = quad.matrix_key(MatrixType::Mass).with_var_coeff(VarCoeffType::Mass, values.clone());
    let b = quad.matrix_key(MatrixType::Mass).with_var_coeff(VarCoeffType::Mass, values);
    let c = quad.matrix_key(MatrixType::Mass).with_var_coeff(VarCoeffType::Mass, vec![1.0; nq]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, quad.matrix_key(MatrixType::Mass));

    let m_a = quad.loc_matrix(&a);
    let m_b = quad.loc_matrix(&b);
    assert!(Arc::ptr_eq(&m_a, &m_b));
    assert_eq!(quad.loc_matrix_construction_count(), 1);
    quad.loc_matrix(&c);
    assert_eq!(quad.loc_matrix_construction_count(), 2);
}

#[test]
fn preconditioner_matrices() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Regular);
    let key = quad
        .matrix_key(MatrixType::PreconDiagonal)
        .with_const_factor(ConstFactorType::Lambda, 1.0);
    let diagonal = quad.loc_matrix(&key).to_dense();
    let helmholtz = quad
        .loc_matrix(&key.with_matrix_type(MatrixType::Helmholtz))
        .to_dense();
    for i in 0..quad.num_coeffs() {
        assert_scalar_eq!(diagonal[(i, i)], helmholtz[(i, i)], comp = abs, tol = 1e-12);
    }
    assert_scalar_eq!(diagonal[(0, 1)], 0.0);

    let linear = quad
        .loc_matrix(&key.with_matrix_type(MatrixType::PreconLinearSpace))
        .to_dense();
    assert_eq!((linear.nrows(), linear.ncols()), (4, 4));
    assert_matrix_eq!(linear.transpose(), linear, comp = abs, tol = 1e-10);
}

#[test]
fn inverse_laplacian_with_unity_mean() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Deformed);
    let n = quad.num_coeffs();
    let inverse = quad
        .loc_matrix(&quad.matrix_key(MatrixType::InvLaplacianWithUnityMean))
        .to_dense();
    let laplacian = quad.loc_matrix(&quad.matrix_key(MatrixType::Laplacian)).to_dense();
    let v = DVector::from_vec(quad.iproduct_wrt_base(&vec![1.0; quad.num_points()]));
    let regularized = laplacian + &v * v.transpose();
    assert_matrix_eq!(inverse * regularized, DMatrix::<f64>::identity(n, n), comp = abs, tol = 1e-8);
}

#[test]
fn general_operator_dispatches_on_matrix_type() {
    let registry = BasisRegistry::new();
    let quad = skewed_quadrilateral(&registry, GeomType::Deformed);
    let coeffs = pseudo_random_values(quad.num_coeffs(), 99);
    for matrix_type in [MatrixType::Mass, MatrixType::Laplacian, MatrixType::WeakDeriv(0), MatrixType::InvMass] {
        let key = quad.matrix_key(matrix_type);
        let expected = quad.loc_matrix(&key).multiply(&coeffs);
        for (a, b) in quad.general_matrix_op(&coeffs, &key).iter().zip(&expected) {
            assert_scalar_eq!(*a, *b, comp = abs, tol = 1e-10);
        }
    }
    assert_panics!(quad.general_matrix_op(&coeffs, &quad.matrix_key(MatrixType::InvHybridDgHelmholtz)));
}

#[test]
fn static_condensation_requires_boundary_decomposition() {
    let registry = BasisRegistry::new();
    let pyramid = local_expansion(
        &registry,
        ShapeType::Pyramid,
        &unit_vertices(ShapeType::Pyramid),
        3,
        BasisFamily::Modified,
    );
    let orthogonal_quad = local_expansion(
        &registry,
        ShapeType::Quadrilateral,
        &unit_vertices(ShapeType::Quadrilateral),
        3,
        BasisFamily::Orthogonal,
    );
    for expansion in [&pyramid, &orthogonal_quad] {
        assert!(!expansion.std().has_boundary_decomposition());
        let key = expansion.matrix_key(MatrixType::Mass);
        let error = expansion.try_loc_static_cond_matrix(&key).unwrap_err();
        assert!(error.to_string().contains("Static condensation is unavailable"), "{error:?}");
        assert!(expansion.std().try_std_static_cond_matrix(&key).is_err());
        assert!(expansion.std().try_boundary_map().is_err());
        assert!(expansion.std().try_interior_map().is_err());
        assert!(expansion.std().try_vertex_map(0).is_err());
        assert_eq!(expansion.static_cond_construction_count(), 0);
    }

    let triangle = local_expansion(
        &registry,
        ShapeType::Triangle,
        &unit_vertices(ShapeType::Triangle),
        4,
        BasisFamily::NodalFekete,
    );
    assert!(triangle.std().has_boundary_decomposition());
    assert_eq!(triangle.std().try_vertex_map(2).unwrap(), 2);
    let key = triangle.matrix_key(MatrixType::Mass);
    let condensed = triangle.try_loc_static_cond_matrix(&key).unwrap();
    assert!(Arc::ptr_eq(&condensed, &triangle.loc_static_cond_matrix(&key)));
}
