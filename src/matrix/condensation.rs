//! Static condensation of elemental matrices.
//!
//! Given a matrix partitioned into boundary (b) and interior (i) degrees of freedom,
//!
//! ```text
//! M = [ A  B ]   A = M_bb, B = M_bi,
//!     [ C  D ]   C = M_ib, D = M_ii,
//! ```
//!
//! the condensed representation consists of the Schur complement $A - B D^{-1} C$, the coupling
//! $B D^{-1}$, the block $C$ and the inverse interior block $D^{-1}$.
use crate::matrix::block::{BlockMatrix, ScaledMatrix};
use nalgebra::DMatrix;
use std::sync::Arc;

fn submatrix(matrix: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| matrix[(rows[i], cols[j])])
}

/// Computes the statically condensed blocks of `factor * matrix`.
///
/// The blocks are stored with the scales `(factor, 1, factor, 1 / factor)` applied to the
/// condensed blocks of the unscaled matrix.
///
/// # Panics
///
/// Panics if the interior block is singular.
pub fn condense(matrix: &DMatrix<f64>, boundary: &[usize], interior: &[usize], factor: f64) -> BlockMatrix {
    assert_eq!(matrix.nrows(), matrix.ncols(), "Static condensation requires a square matrix");
    assert_eq!(
        boundary.len() + interior.len(),
        matrix.nrows(),
        "Boundary and interior maps must cover the matrix"
    );

    let a = submatrix(matrix, boundary, boundary);
    let b = submatrix(matrix, boundary, interior);
    let c = submatrix(matrix, interior, boundary);
    let d = submatrix(matrix, interior, interior);

    let d_inv = if interior.is_empty() {
        d
    } else {
        d.try_inverse()
            .unwrap_or_else(|| panic!("Interior block of the elemental matrix is singular"))
    };
    let b_d_inv = &b * &d_inv;
    let schur = &a - &b_d_inv * &c;

    let sizes = vec![boundary.len(), interior.len()];
    let mut blocks = BlockMatrix::new(sizes.clone(), sizes);
    blocks.set_block(0, 0, ScaledMatrix::new(factor, Arc::new(schur)));
    blocks.set_block(0, 1, ScaledMatrix::new(1.0, Arc::new(b_d_inv)));
    blocks.set_block(1, 0, ScaledMatrix::new(factor, Arc::new(c)));
    blocks.set_block(1, 1, ScaledMatrix::new(1.0 / factor, Arc::new(d_inv)));
    blocks
}

/// Reassembles the full matrix (in boundary-then-interior ordering) from its condensed blocks.
pub fn uncondense(blocks: &BlockMatrix) -> DMatrix<f64> {
    assert_eq!(blocks.num_block_rows(), 2);
    assert_eq!(blocks.num_block_cols(), 2);
    let block = |i, j| {
        blocks
            .block(i, j)
            .map(ScaledMatrix::to_dense)
            .unwrap_or_else(|| panic!("Condensed matrix is missing block ({i}, {j})"))
    };
    let (schur, b_d_inv, c, d_inv) = (block(0, 0), block(0, 1), block(1, 0), block(1, 1));
    let nb = schur.nrows();
    let ni = d_inv.nrows();

    let d = if ni == 0 {
        d_inv
    } else {
        d_inv
            .try_inverse()
            .unwrap_or_else(|| panic!("Inverse interior block is singular"))
    };
    let a = &schur + &b_d_inv * &c;
    let b = &b_d_inv * &d;

    let mut full = DMatrix::zeros(nb + ni, nb + ni);
    full.view_mut((0, 0), (nb, nb)).copy_from(&a);
    full.view_mut((0, nb), (nb, ni)).copy_from(&b);
    full.view_mut((nb, 0), (ni, nb)).copy_from(&c);
    full.view_mut((nb, nb), (ni, ni)).copy_from(&d);
    full
}
