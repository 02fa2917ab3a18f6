//! Collections of local expansions.
//!
//! An [`ExpansionList`] concatenates the coefficient and quadrature arrays of its elements into
//! global arrays and applies elemental operators element by element. No continuity is enforced
//! between elements.
use crate::foundations::BasisRegistry;
use crate::geometry::GeometryTable;
use crate::local_regions::{LocalExpansion, TransState};
use crate::matrix::{ConstFactorType, MatrixType};
use crate::std_regions::ExpansionSettings;
use eyre::WrapErr;
use log::info;
use std::ops::Range;

fn offsets(sizes: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0];
    let mut total = 0;
    for size in sizes {
        total += size;
        offsets.push(total);
    }
    offsets
}

#[derive(Debug)]
pub struct ExpansionList {
    expansions: Vec<LocalExpansion>,
    coeff_offsets: Vec<usize>,
    phys_offsets: Vec<usize>,
    coeffs: Vec<f64>,
    phys: Vec<f64>,
    phys_valid: bool,
    trans_state: TransState,
}

impl ExpansionList {
    pub fn new(expansions: Vec<LocalExpansion>) -> Self {
        if let Some(first) = expansions.first() {
            assert!(
                expansions.iter().all(|e| e.coord_dim() == first.coord_dim()),
                "All elements of an expansion list must have the same coordinate dimension"
            );
        }
        let coeff_offsets = offsets(expansions.iter().map(LocalExpansion::num_coeffs));
        let phys_offsets = offsets(expansions.iter().map(LocalExpansion::num_points));
        let num_coeffs = *coeff_offsets.last().unwrap_or(&0);
        let num_points = *phys_offsets.last().unwrap_or(&0);
        Self {
            expansions,
            coeff_offsets,
            phys_offsets,
            coeffs: vec![0.0; num_coeffs],
            phys: vec![0.0; num_points],
            phys_valid: false,
            trans_state: TransState::NotSet,
        }
    }

    /// Creates one expansion per geometry in the table, with the discretization given by the
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending element if any expansion cannot be constructed.
    pub fn from_table(
        registry: &BasisRegistry,
        table: &GeometryTable,
        settings: &ExpansionSettings,
    ) -> eyre::Result<Self> {
        let expansions = table
            .iter()
            .map(|(id, geometry)| {
                LocalExpansion::from_settings(registry, geometry.clone(), settings)
                    .wrap_err_with(|| format!("Failed to create expansion for element {}", id.index()))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        info!(
            "Created expansion list with {} elements ({} reference expansions)",
            expansions.len(),
            registry.num_std_expansions()
        );
        Ok(Self::new(expansions))
    }

    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }

    pub fn expansion(&self, i: usize) -> &LocalExpansion {
        &self.expansions[i]
    }

    pub fn expansions(&self) -> &[LocalExpansion] {
        &self.expansions
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalExpansion> {
        self.expansions.iter()
    }

    /// The total number of coefficients.
    pub fn num_coeffs(&self) -> usize {
        self.coeffs.len()
    }

    /// The total number of quadrature points.
    pub fn num_points(&self) -> usize {
        self.phys.len()
    }

    pub fn coeff_range(&self, i: usize) -> Range<usize> {
        self.coeff_offsets[i]..self.coeff_offsets[i + 1]
    }

    pub fn phys_range(&self, i: usize) -> Range<usize> {
        self.phys_offsets[i]..self.phys_offsets[i + 1]
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn phys(&self) -> &[f64] {
        &self.phys
    }

    pub fn element_coeffs(&self, i: usize) -> &[f64] {
        &self.coeffs[self.coeff_range(i)]
    }

    pub fn element_phys(&self, i: usize) -> &[f64] {
        &self.phys[self.phys_range(i)]
    }

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

    /// Applies an elemental operator to each element's part of `input`, concatenating the results.
    fn elementwise<F>(&self, input: &[f64], input_offsets: &[usize], output_len: usize, f: F) -> Vec<f64>
    where
        F: Fn(&LocalExpansion, &[f64]) -> Vec<f64>,
    {
        assert_eq!(
            input.len(),
            *input_offsets.last().unwrap_or(&0),
            "Input array does not match the expansion list"
        );
        let mut output = Vec::with_capacity(output_len);
        for (i, expansion) in self.expansions.iter().enumerate() {
            output.extend(f(expansion, &input[input_offsets[i]..input_offsets[i + 1]]));
        }
        assert_eq!(output.len(), output_len);
        output
    }

    pub fn bwd_trans(&self, coeffs: &[f64]) -> Vec<f64> {
        self.elementwise(coeffs, &self.coeff_offsets, self.num_points(), |e, c| e.bwd_trans(c))
    }

    /// Elementwise $L^2$ projection.
    pub fn fwd_trans(&self, phys: &[f64]) -> Vec<f64> {
        self.elementwise(phys, &self.phys_offsets, self.num_coeffs(), |e, u| e.fwd_trans(u))
    }

    pub fn iproduct_wrt_base(&self, phys: &[f64]) -> Vec<f64> {
        self.elementwise(phys, &self.phys_offsets, self.num_coeffs(), |e, u| e.iproduct_wrt_base(u))
    }

    pub fn iproduct_wrt_deriv_base(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        self.elementwise(phys, &self.phys_offsets, self.num_coeffs(), |e, u| {
            e.iproduct_wrt_deriv_base(dir, u)
        })
    }

    /// Integrates the given quadrature values over all elements.
    pub fn phys_integral(&self, phys: &[f64]) -> f64 {
        assert_eq!(phys.len(), self.num_points(), "Quadrature array has wrong length");
        self.expansions
            .iter()
            .enumerate()
            .map(|(i, e)| e.integral(&phys[self.phys_range(i)]))
            .sum()
    }

    /// Derivatives with respect to every physical coordinate.
    pub fn phys_deriv(&self, phys: &[f64]) -> Vec<Vec<f64>> {
        let coord_dim = self.expansions.first().map_or(0, LocalExpansion::coord_dim);
        (0..coord_dim)
            .map(|dir| {
                self.elementwise(phys, &self.phys_offsets, self.num_points(), |e, u| {
                    e.phys_deriv_dir(dir, u)
                })
            })
            .collect()
    }

    /// The physical coordinates of all quadrature points, one array per coordinate.
    pub fn coords(&self) -> Vec<Vec<f64>> {
        let coord_dim = self.expansions.first().map_or(0, LocalExpansion::coord_dim);
        let mut coords = vec![Vec::with_capacity(self.num_points()); coord_dim];
        for expansion in &self.expansions {
            for (global, local) in coords.iter_mut().zip(expansion.coords().iter()) {
                global.extend_from_slice(local);
            }
        }
        coords
    }

    /// Multiplies each element's coefficients by the inverse of its mass matrix.
    pub fn multiply_by_elmt_inv_mass(&self, coeffs: &[f64]) -> Vec<f64> {
        self.elementwise(coeffs, &self.coeff_offsets, self.num_coeffs(), |e, c| {
            e.loc_matrix(&e.matrix_key(MatrixType::InvMass)).multiply(c)
        })
    }

    /// Applies the block-diagonal operator of the given type, with the given constant factors, to
    /// all elements.
    pub fn general_matrix_op(
        &self,
        matrix_type: MatrixType,
        const_factors: &[(ConstFactorType, f64)],
        coeffs: &[f64],
    ) -> Vec<f64> {
        self.elementwise(coeffs, &self.coeff_offsets, self.num_coeffs(), |e, c| {
            let key = const_factors
                .iter()
                .fold(e.matrix_key(matrix_type), |key, (factor, value)| {
                    key.with_const_factor(*factor, *value)
                });
            e.general_matrix_op(c, &key)
        })
    }

    pub fn helmholtz_matrix_op(&self, coeffs: &[f64], lambda: f64) -> Vec<f64> {
        self.general_matrix_op(MatrixType::Helmholtz, &[(ConstFactorType::Lambda, lambda)], coeffs)
    }

    pub fn laplacian_matrix_op(&self, coeffs: &[f64]) -> Vec<f64> {
        self.general_matrix_op(MatrixType::Laplacian, &[], coeffs)
    }

    /// Evaluates the list's own coefficients into its own quadrature values.
    pub fn bwd_trans_own(&mut self) {
        self.phys = self.bwd_trans(&self.coeffs);
        self.phys_valid = true;
    }

    /// Projects the list's own quadrature values onto its own coefficients.
    ///
    /// # Panics
    ///
    /// Panics if the quadrature values have not been set.
    pub fn fwd_trans_own(&mut self) {
        assert!(self.phys_valid, "Forward transform of invalid quadrature values");
        self.coeffs = self.fwd_trans(&self.phys);
        self.trans_state = TransState::Transformed;
    }

    /// Copies the list's coefficients into the elements.
    pub fn put_coeffs_in_to_elmt_exp(&mut self) {
        for (i, expansion) in self.expansions.iter_mut().enumerate() {
            let range = self.coeff_offsets[i]..self.coeff_offsets[i + 1];
            expansion.set_coeffs(&self.coeffs[range]);
        }
    }

    /// Copies the elements' coefficients into the list.
    pub fn put_elmt_exp_in_to_coeffs(&mut self) {
        for (i, expansion) in self.expansions.iter().enumerate() {
            let range = self.coeff_offsets[i]..self.coeff_offsets[i + 1];
            self.coeffs[range].copy_from_slice(expansion.coeffs());
        }
        self.trans_state = TransState::Local;
    }

    /// Copies the list's quadrature values into the elements.
    pub fn put_phys_in_to_elmt_exp(&mut self) {
        for (i, expansion) in self.expansions.iter_mut().enumerate() {
            let range = self.phys_offsets[i]..self.phys_offsets[i + 1];
            expansion.set_phys(&self.phys[range]);
        }
    }

    /// Copies the elements' quadrature values into the list.
    pub fn put_elmt_exp_in_to_phys(&mut self) {
        for (i, expansion) in self.expansions.iter().enumerate() {
            let range = self.phys_offsets[i]..self.phys_offsets[i + 1];
            self.phys[range].copy_from_slice(expansion.phys());
        }
        self.phys_valid = self.expansions.iter().all(LocalExpansion::phys_valid);
    }
}
