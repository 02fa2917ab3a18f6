//! Element-owned coefficient and quadrature arrays.
use crate::local_regions::{LocalExpansion, TransState};

impl LocalExpansion {
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn phys(&self) -> &[f64] {
        &self.phys
    }

    /// Whether the quadrature values hold valid data.
    pub fn phys_valid(&self) -> bool {
        self.phys_valid
    }

    pub fn trans_state(&self) -> TransState {
        self.trans_state
    }

    pub fn set_coeffs(&mut self, coeffs: &[f64]) {
        assert_eq!(coeffs.len(), self.num_coeffs(), "Coefficient array has wrong length");
        self.coeffs.copy_from_slice(coeffs);
        self.trans_state = TransState::Local;
    }

    pub fn set_phys(&mut self, phys: &[f64]) {
        assert_eq!(phys.len(), self.num_points(), "Quadrature array has wrong length");
        self.phys.copy_from_slice(phys);
        self.phys_valid = true;
    }

    /// Evaluates the element's own coefficients into its own quadrature values.
    pub fn bwd_trans_own(&mut self) {
        self.phys = self.std.bwd_trans(&self.coeffs);
        self.phys_valid = true;
    }

    /// Projects the element's own quadrature values onto its own coefficients.
    ///
    /// # Panics
    ///
    /// Panics if the quadrature values have not been set.
    pub fn fwd_trans_own(&mut self) {
        assert!(self.phys_valid, "Forward transform of invalid quadrature values");
        self.coeffs = self.fwd_trans(&self.phys);
        self.trans_state = TransState::Transformed;
    }

    /// Replaces coefficients in `data` by the corresponding quadrature values.
    ///
    /// Input and output share the buffer; the transform reads a copy of the input.
    pub fn bwd_trans_in_place(&self, data: &mut Vec<f64>) {
        let input = std::mem::take(data);
        *data = self.bwd_trans(&input);
    }

    /// Replaces quadrature values in `data` by the projected coefficients.
    ///
    /// Input and output share the buffer; the transform reads a copy of the input.
    pub fn fwd_trans_in_place(&self, data: &mut Vec<f64>) {
        let input = std::mem::take(data);
        *data = self.fwd_trans(&input);
    }

    /// Replaces quadrature values in `data` by their derivative in physical direction `dir`.
    pub fn phys_deriv_dir_in_place(&self, dir: usize, data: &mut [f64]) {
        let derivative = self.phys_deriv_dir(dir, data);
        data.copy_from_slice(&derivative);
    }

    /// Replaces quadrature values in `data` by their inner products with the basis.
    pub fn iproduct_wrt_base_in_place(&self, data: &mut Vec<f64>) {
        let input = std::mem::take(data);
        *data = self.iproduct_wrt_base(&input);
    }
}
