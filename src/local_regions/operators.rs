use crate::geometry::GeomFactors;
use crate::local_regions::LocalExpansion;
use crate::matrix::MatrixType;
use crate::util::{axpy, vmul};
use eyre::eyre;

/// Tolerance used when checking that a mapped point lies inside the reference shape.
const LOCATE_TOLERANCE: f64 = 1e-8;

impl LocalExpansion {
    fn assert_phys_len(&self, phys: &[f64]) {
        assert_eq!(
            phys.len(),
            self.num_points(),
            "Input has {} values, but the expansion has {} quadrature points",
            phys.len(),
            self.num_points()
        );
    }

    /// Integrates the given quadrature values over the element.
    pub fn integral(&self, phys: &[f64]) -> f64 {
        self.assert_phys_len(phys);
        let metric = self.quadrature_metric();
        phys.iter().zip(metric.iter()).map(|(u, w)| u * w).sum()
    }

    pub fn bwd_trans(&self, coeffs: &[f64]) -> Vec<f64> {
        self.std.bwd_trans(coeffs)
    }

    /// Projects quadrature values onto the expansion in the $L^2$ sense on the physical element.
    pub fn fwd_trans(&self, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        if self.std.is_collocated() {
            return phys.to_vec();
        }
        let inv_mass = self.loc_matrix(&self.matrix_key(MatrixType::InvMass));
        inv_mass.multiply(&self.iproduct_wrt_base(phys))
    }

    /// Computes the inner products $(\phi_m, u)$ over the element by sum factorization.
    pub fn iproduct_wrt_base(&self, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        self.std.iproduct_kernel(None, &vmul(phys, &self.quadrature_metric()))
    }

    /// Computes the inner products $(\phi_m, u)$ with the cached `IProductWrtBase` matrix.
    pub fn iproduct_wrt_base_mat_op(&self, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        self.loc_matrix(&self.matrix_key(MatrixType::IProductWrtBase))
            .multiply(phys)
    }

    /// Computes the inner products $(\partial \phi_m / \partial x_{dir}, u)$ over the element.
    pub fn iproduct_wrt_deriv_base(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        assert!(dir < self.coord_dim(), "Direction {dir} out of bounds");
        let dim = self.dim();
        let metric = self.quadrature_metric();
        let collapse = self.std.collapse_factors();
        let df: Vec<&[f64]> = (0..dim).map(|j| self.factors.deriv_factor(dir, j)).collect();

        let mut out = vec![0.0; self.num_coeffs()];
        for a in 0..dim {
            let weighted: Vec<f64> = (0..phys.len())
                .map(|q| {
                    let chain: f64 = (0..dim)
                        .map(|j| collapse[q][a][j] * GeomFactors::at(df[j], q))
                        .sum();
                    phys[q] * metric[q] * chain
                })
                .collect();
            if weighted.iter().all(|w| *w == 0.0) {
                continue;
            }
            axpy(1.0, &self.std.iproduct_kernel(Some(a), &weighted), &mut out);
        }
        out
    }

    /// Derivatives with respect to all physical coordinates.
    pub fn phys_deriv(&self, phys: &[f64]) -> Vec<Vec<f64>> {
        let dxi = self.std.phys_deriv(phys);
        (0..self.coord_dim())
            .map(|i| self.chain_reference_derivatives(&dxi, i))
            .collect()
    }

    /// The derivative with respect to the physical coordinate $x_{dir}$.
    pub fn phys_deriv_dir(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        assert!(dir < self.coord_dim(), "Direction {dir} out of bounds");
        let dxi = self.std.phys_deriv(phys);
        self.chain_reference_derivatives(&dxi, dir)
    }

    /// The derivative in the given physical direction, which need not be normalized.
    pub fn phys_directional_deriv(&self, direction: &[f64], phys: &[f64]) -> Vec<f64> {
        assert_eq!(direction.len(), self.coord_dim(), "Direction has the wrong dimension");
        let derivs = self.phys_deriv(phys);
        let mut out = vec![0.0; phys.len()];
        for (d, du) in direction.iter().zip(&derivs) {
            axpy(*d, du, &mut out);
        }
        out
    }

    fn chain_reference_derivatives(&self, dxi: &[Vec<f64>], i: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.num_points()];
        for (j, du) in dxi.iter().enumerate() {
            let df = self.factors.deriv_factor(i, j);
            out.iter_mut()
                .zip(du)
                .enumerate()
                .for_each(|(q, (o, u))| *o += GeomFactors::at(df, q) * u);
        }
        out
    }

    /// Evaluates the function given by its quadrature values at a physical point.
    ///
    /// # Errors
    ///
    /// Returns an error if the point cannot be mapped to reference coordinates or lies outside
    /// the element.
    pub fn phys_evaluate(&self, x: &[f64], phys: &[f64]) -> eyre::Result<f64> {
        self.assert_phys_len(phys);
        let xi = self.geometry.loc_coords(x)?;
        if !self.shape().contains_reference_point(&xi, LOCATE_TOLERANCE) {
            return Err(eyre!("Point {x:?} lies outside the element (reference coordinates {xi:?})"));
        }
        Ok(self.std.interpolate_collapsed(&self.shape().collapse(&xi), phys))
    }
}
