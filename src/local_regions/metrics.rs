//! Matrix-free operators.
//!
//! The Laplacian is applied as
//!
//! $$ (L u)_m = \sum_{a, b} \left( \frac{\partial \phi_m}{\partial \eta_a}, g^{ab} \frac{\partial u}{\partial \eta_b} \right), $$
//!
//! where $g^{ab} = \sum_k \frac{\partial \eta_a}{\partial x_k} \frac{\partial \eta_b}{\partial x_k}$
//! is premultiplied by the quadrature weights and the Jacobian. Only the upper triangle of the
//! symmetric metric is stored.
use crate::geometry::GeomFactors;
use crate::local_regions::LocalExpansion;
use crate::matrix::{MatrixKey, MatrixType};
use crate::util::axpy;

fn symmetric_index(dim: usize, a: usize, b: usize) -> usize {
    let (a, b) = (a.min(b), a.max(b));
    a * dim - a * a.saturating_sub(1) / 2 - a + b
}

impl LocalExpansion {
    /// The metric terms $g^{ab} w J$ of the matrix-free Laplacian, computed once.
    fn laplacian_metric(&self) -> std::sync::Arc<Vec<Vec<f64>>> {
        self.laplacian_metric.get_or_init(|| {
            let dim = self.dim();
            let coord_dim = self.coord_dim();
            let metric = self.quadrature_metric();
            let collapse = self.std.collapse_factors();
            let mut terms = vec![vec![0.0; self.num_points()]; dim * (dim + 1) / 2];
            let mut g = vec![[0.0; 3]; dim];
            for (q, m) in collapse.iter().enumerate() {
                // g[a][k] = d eta_a / d x_k
                for (a, g_a) in g.iter_mut().enumerate() {
                    for (k, g_ak) in g_a.iter_mut().enumerate().take(coord_dim) {
                        *g_ak = (0..dim)
                            .map(|j| m[a][j] * GeomFactors::at(self.factors.deriv_factor(k, j), q))
                            .sum();
                    }
                }
                for a in 0..dim {
                    for b in a..dim {
                        let gab: f64 = (0..coord_dim).map(|k| g[a][k] * g[b][k]).sum();
                        terms[symmetric_index(dim, a, b)][q] = gab * metric[q];
                    }
                }
            }
            terms
        })
    }

    /// Applies the Laplacian without forming a matrix.
    pub fn laplacian_matrix_op_mat_free(&self, coeffs: &[f64]) -> Vec<f64> {
        assert_eq!(coeffs.len(), self.num_coeffs(), "Coefficient array has wrong length");
        let dim = self.dim();
        let u = self.std.bwd_trans(coeffs);
        let du = self.std.phys_tensor_deriv(&u);
        let metric = self.laplacian_metric();

        let mut out = vec![0.0; self.num_coeffs()];
        for a in 0..dim {
            let mut flux = vec![0.0; u.len()];
            for (b, du_b) in du.iter().enumerate() {
                let g = &metric[symmetric_index(dim, a, b)];
                flux.iter_mut()
                    .zip(g)
                    .zip(du_b)
                    .for_each(|((f, g), d)| *f += g * d);
            }
            axpy(1.0, &self.std.iproduct_kernel(Some(a), &flux), &mut out);
        }
        out
    }

    /// Applies the mass matrix as a backward transform followed by an inner product.
    pub fn mass_matrix_op_mat_free(&self, coeffs: &[f64]) -> Vec<f64> {
        self.iproduct_wrt_base(&self.bwd_trans(coeffs))
    }

    /// Applies the Laplacian, without forming a matrix unless the key has variable coefficients.
    pub fn laplacian_matrix_op(&self, coeffs: &[f64], key: &MatrixKey) -> Vec<f64> {
        if key.has_var_coeffs() {
            self.loc_matrix(&key.with_matrix_type(MatrixType::Laplacian))
                .multiply(coeffs)
        } else {
            self.laplacian_matrix_op_mat_free(coeffs)
        }
    }

    /// Applies the mass matrix, without forming a matrix unless the key has variable coefficients.
    pub fn mass_matrix_op(&self, coeffs: &[f64], key: &MatrixKey) -> Vec<f64> {
        if key.has_var_coeffs() {
            self.loc_matrix(&key.with_matrix_type(MatrixType::Mass))
                .multiply(coeffs)
        } else {
            self.mass_matrix_op_mat_free(coeffs)
        }
    }

    /// Applies the Helmholtz operator $L + \lambda M$ with $\lambda$ taken from the key.
    pub fn helmholtz_matrix_op(&self, coeffs: &[f64], key: &MatrixKey) -> Vec<f64> {
        if key.has_var_coeffs() {
            return self
                .loc_matrix(&key.with_matrix_type(MatrixType::Helmholtz))
                .multiply(coeffs);
        }
        let lambda = key.lambda();
        let mut out = self.laplacian_matrix_op_mat_free(coeffs);
        axpy(lambda, &self.mass_matrix_op_mat_free(coeffs), &mut out);
        out
    }

    /// Applies the weak derivative $(\phi, \partial u / \partial x_{dir})$.
    pub fn weak_deriv_matrix_op(&self, dir: usize, coeffs: &[f64], key: &MatrixKey) -> Vec<f64> {
        if key.has_var_coeffs() {
            return self
                .loc_matrix(&key.with_matrix_type(MatrixType::WeakDeriv(dir)))
                .multiply(coeffs);
        }
        let u = self.bwd_trans(coeffs);
        self.iproduct_wrt_base(&self.phys_deriv_dir(dir, &u))
    }

    /// Applies the operator described by the key, matrix-free where possible.
    pub fn general_matrix_op(&self, coeffs: &[f64], key: &MatrixKey) -> Vec<f64> {
        match key.matrix_type() {
            MatrixType::Mass => self.mass_matrix_op(coeffs, key),
            MatrixType::Laplacian => self.laplacian_matrix_op(coeffs, key),
            MatrixType::Helmholtz => self.helmholtz_matrix_op(coeffs, key),
            MatrixType::WeakDeriv(dir) => self.weak_deriv_matrix_op(dir, coeffs, key),
            _ => self.loc_matrix(key).multiply(coeffs),
        }
    }
}
