//! Quadrature-based assembly of elemental matrices from elemental operators.
//!
//! Every matrix is assembled column by column: the operator is applied to a unit vector and the
//! result is stored as the corresponding column. Reference and local expansions share this code
//! through the [`ElementOperators`] trait.
use crate::matrix::block::BlockMatrix;
use crate::matrix::key::{MatrixKey, MatrixType, VarCoeffType};
use crate::util::{axpy, clone_upper_to_lower, vmul};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// The elemental operators needed to assemble matrices by quadrature.
pub trait ElementOperators {
    fn num_coeffs(&self) -> usize;

    fn num_points(&self) -> usize;

    /// The number of directions derivatives can be taken in.
    fn num_deriv_dirs(&self) -> usize;

    fn num_vertices(&self) -> usize;

    fn bwd_trans(&self, coeffs: &[f64]) -> Vec<f64>;

    fn iproduct_wrt_base(&self, phys: &[f64]) -> Vec<f64>;

    fn iproduct_wrt_deriv_base(&self, dir: usize, phys: &[f64]) -> Vec<f64>;

    fn phys_deriv_dir(&self, dir: usize, phys: &[f64]) -> Vec<f64>;

    fn boundary_map(&self) -> Vec<usize>;

    fn interior_map(&self) -> Vec<usize>;

    fn vertex_map(&self, vertex: usize) -> usize;

    /// The fully scaled matrix for the given key, possibly from a cache.
    fn dense_matrix(&self, key: &MatrixKey) -> DMatrix<f64>;

    /// The statically condensed matrix for the given key, possibly from a cache.
    fn condensed_matrix(&self, key: &MatrixKey) -> Arc<BlockMatrix>;
}

fn unit_vector(n: usize, i: usize) -> Vec<f64> {
    let mut e = vec![0.0; n];
    e[i] = 1.0;
    e
}

fn from_columns(nrows: usize, ncols: usize, column: impl Fn(usize) -> Vec<f64>) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(nrows, ncols);
    for j in 0..ncols {
        let values = column(j);
        assert_eq!(values.len(), nrows);
        matrix.column_mut(j).copy_from_slice(&values);
    }
    matrix
}

fn invert(matrix: DMatrix<f64>, what: MatrixType) -> DMatrix<f64> {
    matrix
        .try_inverse()
        .unwrap_or_else(|| panic!("Cannot construct {what:?}: the matrix is singular"))
}

/// Applies the (possibly variable-coefficient) Laplacian to a single coefficient vector.
fn laplacian_column<E: ElementOperators + ?Sized>(element: &E, key: &MatrixKey, coeffs: &[f64]) -> Vec<f64> {
    let u = element.bwd_trans(coeffs);
    let dirs = element.num_deriv_dirs();
    let du: Vec<Vec<f64>> = (0..dirs).map(|l| element.phys_deriv_dir(l, &u)).collect();
    let mut result = vec![0.0; element.num_coeffs()];
    for k in 0..dirs {
        let flux = if key.has_var_coeffs() {
            let mut flux = vec![0.0; element.num_points()];
            for (l, du_l) in du.iter().enumerate() {
                match key.var_coeff(VarCoeffType::diffusion(k, l)) {
                    Some(d) => flux.iter_mut().zip(d).zip(du_l).for_each(|((f, d), g)| *f += d * g),
                    None if k == l => axpy(1.0, du_l, &mut flux),
                    None => {}
                }
            }
            flux
        } else {
            du[k].clone()
        };
        axpy(1.0, &element.iproduct_wrt_deriv_base(k, &flux), &mut result);
    }
    result
}

/// Assembles the elemental matrix described by `key` by quadrature.
///
/// # Panics
///
/// Panics for the hybridizable DG matrix types, which are not supported, and if a required
/// constant factor is missing.
pub fn gen_matrix<E: ElementOperators + ?Sized>(element: &E, key: &MatrixKey) -> DMatrix<f64> {
    let n = element.num_coeffs();
    let nq = element.num_points();
    let matrix_type = key.matrix_type();

    let mut matrix = match matrix_type {
        MatrixType::Mass => from_columns(n, n, |j| {
            let mut u = element.bwd_trans(&unit_vector(n, j));
            if let Some(c) = key.var_coeff(VarCoeffType::Mass) {
                u = vmul(&u, c);
            }
            element.iproduct_wrt_base(&u)
        }),
        MatrixType::InvMass => invert(
            element.dense_matrix(&key.with_matrix_type(MatrixType::Mass)),
            matrix_type,
        ),
        MatrixType::WeakDeriv(i) => from_columns(n, n, |j| {
            let u = element.bwd_trans(&unit_vector(n, j));
            element.iproduct_wrt_base(&element.phys_deriv_dir(i, &u))
        }),
        MatrixType::LaplacianComponent(k, l) => from_columns(n, n, |j| {
            let u = element.bwd_trans(&unit_vector(n, j));
            element.iproduct_wrt_deriv_base(k, &element.phys_deriv_dir(l, &u))
        }),
        MatrixType::Laplacian => from_columns(n, n, |j| laplacian_column(element, key, &unit_vector(n, j))),
        MatrixType::Helmholtz => {
            let lambda = key.lambda();
            let laplacian = element.dense_matrix(&key.with_matrix_type(MatrixType::Laplacian));
            let mass = element.dense_matrix(&key.with_matrix_type(MatrixType::Mass));
            laplacian + mass * lambda
        }
        MatrixType::IProductWrtBase => from_columns(n, nq, |i| element.iproduct_wrt_base(&unit_vector(nq, i))),
        MatrixType::IProductWrtDerivBase(d) => {
            from_columns(n, nq, |i| element.iproduct_wrt_deriv_base(d, &unit_vector(nq, i)))
        }
        MatrixType::BwdTrans => from_columns(nq, n, |j| element.bwd_trans(&unit_vector(n, j))),
        MatrixType::InvLaplacianWithUnityMean => {
            let laplacian = element.dense_matrix(&key.with_matrix_type(MatrixType::Laplacian));
            let v = DVector::from_vec(element.iproduct_wrt_base(&vec![1.0; nq]));
            invert(laplacian + &v * v.transpose(), matrix_type)
        }
        MatrixType::PreconDiagonal => {
            let helmholtz = element.dense_matrix(&key.with_matrix_type(MatrixType::Helmholtz));
            DMatrix::from_diagonal(&helmholtz.diagonal())
        }
        MatrixType::PreconLinearSpace => {
            let condensed = element.condensed_matrix(&key.with_matrix_type(MatrixType::Helmholtz));
            let schur = condensed
                .block(0, 0)
                .map(|block| block.to_dense())
                .unwrap_or_else(|| panic!("Condensed Helmholtz matrix has no boundary block"));
            let bmap = element.boundary_map();
            let positions: Vec<usize> = (0..element.num_vertices())
                .map(|v| {
                    let mode = element.vertex_map(v);
                    bmap.iter()
                        .position(|&b| b == mode)
                        .unwrap_or_else(|| panic!("Vertex mode {mode} is not a boundary mode"))
                })
                .collect();
            DMatrix::from_fn(positions.len(), positions.len(), |i, j| schur[(positions[i], positions[j])])
        }
        MatrixType::HybridDgHelmholtz | MatrixType::InvHybridDgHelmholtz => {
            panic!("{matrix_type:?} matrices are not implemented")
        }
    };

    if matrix_type.is_symmetric() && matrix.is_square() {
        clone_upper_to_lower(&mut matrix);
    }
    matrix
}
