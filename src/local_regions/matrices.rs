use crate::foundations::BasisKey;
use crate::local_regions::LocalExpansion;
use crate::matrix::assembly::{gen_matrix, ElementOperators};
use crate::matrix::condensation::condense;
use crate::matrix::{BlockMatrix, MatrixFactory, MatrixKey, MatrixType, ScaledMatrix};
use eyre::eyre;
use nalgebra::DMatrix;
use std::sync::Arc;

impl LocalExpansion {
    /// A matrix key of the given type for this expansion.
    pub fn matrix_key(&self, matrix_type: MatrixType) -> MatrixKey {
        self.std.matrix_key(matrix_type)
    }

    /// The local matrix for the given key, constructed on first use.
    pub fn loc_matrix(&self, key: &MatrixKey) -> Arc<ScaledMatrix> {
        assert_eq!(
            key.expansion_key(),
            self.std.key(),
            "Matrix key belongs to a different expansion"
        );
        self.matrices.get(self, key)
    }

    /// The statically condensed local matrix for the given key, constructed on first use.
    pub fn loc_static_cond_matrix(&self, key: &MatrixKey) -> Arc<BlockMatrix> {
        assert_eq!(
            key.expansion_key(),
            self.std.key(),
            "Matrix key belongs to a different expansion"
        );
        self.static_cond.get(self, key)
    }

    /// The statically condensed local matrix for the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion has no boundary/interior decomposition, which is the case
    /// for orthogonal expansions and pyramids.
    pub fn try_loc_static_cond_matrix(&self, key: &MatrixKey) -> eyre::Result<Arc<BlockMatrix>> {
        if !self.std.has_boundary_decomposition() {
            return Err(eyre!(
                "Static condensation is unavailable for {} expansion with {:?} bases",
                self.shape(),
                key.expansion_key().basis_keys().iter().map(BasisKey::basis_type).collect::<Vec<_>>()
            ));
        }
        Ok(self.loc_static_cond_matrix(key))
    }

    /// Removes a local matrix from the cache, returning whether it was present.
    pub fn drop_loc_matrix(&self, key: &MatrixKey) -> bool {
        self.matrices.remove(key)
    }

    /// Removes a statically condensed matrix from the cache, returning whether it was present.
    pub fn drop_loc_static_cond_matrix(&self, key: &MatrixKey) -> bool {
        self.static_cond.remove(key)
    }

    /// Number of local matrices constructed so far.
    pub fn loc_matrix_construction_count(&self) -> usize {
        self.matrices.construction_count()
    }

    /// Number of statically condensed matrices constructed so far.
    pub fn static_cond_construction_count(&self) -> usize {
        self.static_cond.construction_count()
    }

    /// Assembles the local matrix for the given key by quadrature, bypassing the cache.
    pub fn gen_matrix(&self, key: &MatrixKey) -> DMatrix<f64> {
        gen_matrix(self, key)
    }

    fn std_matrix(&self, matrix_type: MatrixType) -> Arc<DMatrix<f64>> {
        self.std.std_matrix(&self.std.matrix_key(matrix_type))
    }

    /// The constant derivative factor $\partial \xi_j / \partial x_i$ of a regular element.
    fn regular_deriv_factor(&self, i: usize, j: usize) -> f64 {
        self.factors.deriv_factor(i, j)[0]
    }

    /// $\sum_j (\partial \xi_j / \partial x_i) M_j$ for the reference matrices $M_j$ of a regular
    /// element.
    fn regular_directional_sum(&self, i: usize, matrix_type: impl Fn(usize) -> MatrixType) -> DMatrix<f64> {
        let mut sum: Option<DMatrix<f64>> = None;
        for j in 0..self.dim() {
            let term = self.std_matrix(matrix_type(j)).as_ref() * self.regular_deriv_factor(i, j);
            sum = Some(match sum {
                Some(s) => s + term,
                None => term,
            });
        }
        sum.unwrap_or_else(|| panic!("Expansion has no reference directions"))
    }

    /// The unscaled Laplacian $\sum_{k, l} g_{kl} L_{kl}$ of a regular element.
    fn regular_laplacian(&self) -> DMatrix<f64> {
        let dim = self.dim();
        let n = self.num_coeffs();
        let mut laplacian = DMatrix::zeros(n, n);
        for k in 0..dim {
            for l in 0..dim {
                let g: f64 = (0..self.coord_dim())
                    .map(|i| self.regular_deriv_factor(i, k) * self.regular_deriv_factor(i, l))
                    .sum();
                if g != 0.0 {
                    laplacian += self.std_matrix(MatrixType::LaplacianComponent(k, l)).as_ref() * g;
                }
            }
        }
        laplacian
    }

    /// Builds local matrices of regular elements from scaled reference matrices.
    ///
    /// Returns `None` for matrix types without such a representation.
    fn regular_matrix(&self, key: &MatrixKey) -> Option<ScaledMatrix> {
        let jac = self.factors.jacobian()[0];
        let matrix = match key.matrix_type() {
            MatrixType::Mass => ScaledMatrix::new(jac, self.std_matrix(MatrixType::Mass)),
            MatrixType::InvMass => ScaledMatrix::new(1.0 / jac, self.std_matrix(MatrixType::InvMass)),
            MatrixType::WeakDeriv(i) => {
                ScaledMatrix::new(jac, Arc::new(self.regular_directional_sum(i, MatrixType::WeakDeriv)))
            }
            MatrixType::Laplacian => ScaledMatrix::new(jac, Arc::new(self.regular_laplacian())),
            MatrixType::LaplacianComponent(k1, k2) => {
                let dim = self.dim();
                let n = self.num_coeffs();
                let mut matrix = DMatrix::zeros(n, n);
                for j1 in 0..dim {
                    for j2 in 0..dim {
                        let f = self.regular_deriv_factor(k1, j1) * self.regular_deriv_factor(k2, j2);
                        if f != 0.0 {
                            matrix += self.std_matrix(MatrixType::LaplacianComponent(j1, j2)).as_ref() * f;
                        }
                    }
                }
                ScaledMatrix::new(jac, Arc::new(matrix))
            }
            MatrixType::Helmholtz => {
                let lambda = key.lambda();
                let matrix = self.regular_laplacian() + self.std_matrix(MatrixType::Mass).as_ref() * lambda;
                ScaledMatrix::new(jac, Arc::new(matrix))
            }
            MatrixType::IProductWrtBase => ScaledMatrix::new(jac, self.std_matrix(MatrixType::IProductWrtBase)),
            MatrixType::IProductWrtDerivBase(i) => ScaledMatrix::new(
                jac,
                Arc::new(self.regular_directional_sum(i, MatrixType::IProductWrtDerivBase)),
            ),
            MatrixType::BwdTrans => ScaledMatrix::new(1.0, self.std_matrix(MatrixType::BwdTrans)),
            _ => return None,
        };
        Some(matrix)
    }
}

impl MatrixFactory<MatrixKey, ScaledMatrix> for LocalExpansion {
    fn create_matrix(&self, key: &MatrixKey) -> ScaledMatrix {
        if self.factors.is_regular() && !key.has_var_coeffs() {
            if let Some(matrix) = self.regular_matrix(key) {
                return matrix;
            }
        }
        ScaledMatrix::from_matrix(gen_matrix(self, key))
    }
}

impl MatrixFactory<MatrixKey, BlockMatrix> for LocalExpansion {
    fn create_matrix(&self, key: &MatrixKey) -> BlockMatrix {
        if self.factors.is_regular() && !key.has_var_coeffs() && key.matrix_type() == MatrixType::Mass {
            let jac = self.factors.jacobian()[0];
            let std_blocks = self.std.std_static_cond_matrix(&self.std.matrix_key(MatrixType::Mass));
            let sizes = vec![self.std.num_boundary_coeffs(), self.std.num_interior_coeffs()];
            let mut blocks = BlockMatrix::new(sizes.clone(), sizes);
            let scales = [[jac, 1.0], [jac, 1.0 / jac]];
            for (i, row) in scales.iter().enumerate() {
                for (j, scale) in row.iter().enumerate() {
                    if let Some(block) = std_blocks.block(i, j) {
                        let matrix = Arc::clone(block.matrix());
                        blocks.set_block(i, j, ScaledMatrix::new(scale * block.scale(), matrix));
                    }
                }
            }
            return blocks;
        }
        let matrix = self.loc_matrix(key).to_dense();
        condense(&matrix, &self.boundary_map(), &self.interior_map(), 1.0)
    }
}

impl ElementOperators for LocalExpansion {
    fn num_coeffs(&self) -> usize {
        self.num_coeffs()
    }

    fn num_points(&self) -> usize {
        self.num_points()
    }

    fn num_deriv_dirs(&self) -> usize {
        self.coord_dim()
    }

    fn num_vertices(&self) -> usize {
        self.shape().num_vertices()
    }

    fn bwd_trans(&self, coeffs: &[f64]) -> Vec<f64> {
        self.bwd_trans(coeffs)
    }

    fn iproduct_wrt_base(&self, phys: &[f64]) -> Vec<f64> {
        self.iproduct_wrt_base(phys)
    }

    fn iproduct_wrt_deriv_base(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        self.iproduct_wrt_deriv_base(dir, phys)
    }

    fn phys_deriv_dir(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        self.phys_deriv_dir(dir, phys)
    }

    fn boundary_map(&self) -> Vec<usize> {
        self.boundary_map()
    }

    fn interior_map(&self) -> Vec<usize> {
        self.interior_map()
    }

    fn vertex_map(&self, vertex: usize) -> usize {
        self.vertex_map(vertex)
    }

    fn dense_matrix(&self, key: &MatrixKey) -> DMatrix<f64> {
        self.loc_matrix(key).to_dense()
    }

    fn condensed_matrix(&self, key: &MatrixKey) -> Arc<BlockMatrix> {
        self.loc_static_cond_matrix(key)
    }
}
