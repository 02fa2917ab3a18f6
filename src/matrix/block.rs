use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// A dense matrix multiplied by a scalar.
///
/// Local matrices of elements with constant geometric factors are stored as a shared reference
/// matrix together with the scale, so that the reference matrix never needs to be copied.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledMatrix {
    scale: f64,
    matrix: Arc<DMatrix<f64>>,
}

impl ScaledMatrix {
    pub fn new(scale: f64, matrix: Arc<DMatrix<f64>>) -> Self {
        Self { scale, matrix }
    }

    pub fn from_matrix(matrix: DMatrix<f64>) -> Self {
        Self::new(1.0, Arc::new(matrix))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The unscaled matrix.
    pub fn matrix(&self) -> &Arc<DMatrix<f64>> {
        &self.matrix
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// The scaled matrix as a new dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        self.matrix.as_ref() * self.scale
    }

    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.ncols(), "Dimension mismatch in matrix-vector product");
        let y = self.matrix.as_ref() * DVector::from_column_slice(x) * self.scale;
        y.as_slice().to_vec()
    }
}

/// A matrix partitioned into blocks, each of which is an optional [`ScaledMatrix`].
///
/// Missing blocks are treated as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatrix {
    row_sizes: Vec<usize>,
    col_sizes: Vec<usize>,
    blocks: Vec<Option<ScaledMatrix>>,
}

fn offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut total = 0;
    offsets.push(0);
    for s in sizes {
        total += s;
        offsets.push(total);
    }
    offsets
}

impl BlockMatrix {
    pub fn new(row_sizes: Vec<usize>, col_sizes: Vec<usize>) -> Self {
        let blocks = vec![None; row_sizes.len() * col_sizes.len()];
        Self {
            row_sizes,
            col_sizes,
            blocks,
        }
    }

    pub fn num_block_rows(&self) -> usize {
        self.row_sizes.len()
    }

    pub fn num_block_cols(&self) -> usize {
        self.col_sizes.len()
    }

    pub fn nrows(&self) -> usize {
        self.row_sizes.iter().sum()
    }

    pub fn ncols(&self) -> usize {
        self.col_sizes.iter().sum()
    }

    pub fn set_block(&mut self, i: usize, j: usize, block: ScaledMatrix) {
        assert_eq!(block.nrows(), self.row_sizes[i], "Block row size mismatch");
        assert_eq!(block.ncols(), self.col_sizes[j], "Block column size mismatch");
        let idx = i * self.col_sizes.len() + j;
        self.blocks[idx] = Some(block);
    }

    pub fn block(&self, i: usize, j: usize) -> Option<&ScaledMatrix> {
        assert!(i < self.num_block_rows() && j < self.num_block_cols(), "Block index out of bounds");
        self.blocks[i * self.col_sizes.len() + j].as_ref()
    }

    /// Assembles all blocks into a single dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let row_offsets = offsets(&self.row_sizes);
        let col_offsets = offsets(&self.col_sizes);
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for i in 0..self.num_block_rows() {
            for j in 0..self.num_block_cols() {
                if let Some(block) = self.block(i, j) {
                    dense
                        .view_mut((row_offsets[i], col_offsets[j]), (block.nrows(), block.ncols()))
                        .copy_from(&block.to_dense());
                }
            }
        }
        dense
    }

    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.ncols(), "Dimension mismatch in matrix-vector product");
        let row_offsets = offsets(&self.row_sizes);
        let col_offsets = offsets(&self.col_sizes);
        let mut y = vec![0.0; self.nrows()];
        for i in 0..self.num_block_rows() {
            for j in 0..self.num_block_cols() {
                if let Some(block) = self.block(i, j) {
                    let yj = block.multiply(&x[col_offsets[j]..col_offsets[j + 1]]);
                    for (target, value) in y[row_offsets[i]..row_offsets[i + 1]].iter_mut().zip(yj) {
                        *target += value;
                    }
                }
            }
        }
        y
    }
}
