use crate::foundations::{Basis, BasisKey, BasisRegistry, Points};
use crate::matrix::assembly::{gen_matrix, ElementOperators};
use crate::matrix::condensation::condense;
use crate::matrix::{BlockMatrix, MatrixFactory, MatrixKey, MatrixManager, MatrixType};
use crate::shape::ShapeType;
use crate::std_regions::kernels::{tensor_apply, Contraction};
use crate::std_regions::layout::ModeLayout;
use crate::std_regions::ExpansionKey;
use crate::util::{axpy, dense_mul, vmul};
use eyre::eyre;
use nalgebra::DMatrix;
use std::borrow::Cow;
use std::sync::Arc;

/// Tolerance used when checking that a reference point lies inside the reference shape.
const REFERENCE_DOMAIN_TOLERANCE: f64 = 1e-8;

/// Change of basis between the modal basis and the nodal (Lagrange) basis through a point set.
#[derive(Debug, Clone)]
struct NodalTransform {
    points: Arc<Points>,
    /// `V[(i, m)]` is modal function `m` evaluated at node `i`.
    vandermonde: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

/// A reference (standard) expansion on one of the reference shapes.
///
/// The expansion is defined by one [`Basis`] per reference direction. Values ("physical" data in
/// the terminology of spectral/hp methods) live on the tensor product of the one-dimensional
/// quadrature points in collapsed coordinates, stored with the first direction running fastest.
///
/// Reference expansions are immutable once constructed and shared between all local expansions
/// with the same discretization. They are normally obtained from
/// [`BasisRegistry::std_expansion`].
#[derive(Debug)]
pub struct StdExpansion {
    key: ExpansionKey,
    bases: Vec<Arc<Basis>>,
    layout: ModeLayout,
    contraction: Contraction,
    nodal: Option<NodalTransform>,
    points_per_dir: [usize; 3],
    quadrature_weights: Vec<f64>,
    collapsed_coords: Vec<[f64; 3]>,
    collapse_factors: Vec<[[f64; 3]; 3]>,
    matrices: MatrixManager<MatrixKey, DMatrix<f64>>,
    static_cond: MatrixManager<MatrixKey, BlockMatrix>,
}

/// Quadrature weights in one direction, including the collapse factor of that direction.
///
/// Points whose weight includes the Jacobi factor $(1 - z)^\alpha$ already account for part of
/// the collapse factor $((1 - z) / 2)^k$.
fn directional_weights(shape: ShapeType, dir: usize, basis: &Basis) -> Vec<f64> {
    let k = shape.collapse_exponent(dir);
    let alpha = basis.points().points_type().jacobi_alpha();
    assert!(
        k >= alpha,
        "{:?} points cannot be used in direction {dir} of the {shape} expansion",
        basis.points().points_type()
    );
    basis
        .z()
        .iter()
        .zip(basis.w())
        .map(|(z, w)| w * 2f64.powi(-alpha) * (0.5 * (1.0 - z)).powi(k - alpha))
        .collect()
}

impl StdExpansion {
    /// Constructs a modal expansion with the given basis keys.
    ///
    /// Prefer [`BasisRegistry::std_expansion`], which shares expansions between callers.
    pub fn new(registry: &BasisRegistry, shape: ShapeType, basis_keys: &[BasisKey]) -> Self {
        Self::from_key(registry, &ExpansionKey::new(shape, basis_keys.to_vec()))
    }

    pub(crate) fn from_key(registry: &BasisRegistry, key: &ExpansionKey) -> Self {
        let shape = key.shape();
        let dim = shape.dim();
        let bases: Vec<Arc<Basis>> = key.basis_keys().iter().map(|k| registry.basis(*k)).collect();
        let layout = ModeLayout::new(shape, key.basis_keys());
        let contraction = Contraction::from_terms(dim, &layout.terms);

        let mut points_per_dir = [1; 3];
        let mut weights_per_dir = vec![vec![1.0]; 3];
        let mut z_per_dir = vec![vec![0.0]; 3];
        for (d, basis) in bases.iter().enumerate() {
            points_per_dir[d] = basis.num_points();
            weights_per_dir[d] = directional_weights(shape, d, basis);
            z_per_dir[d] = basis.z().to_vec();
        }

        let num_points: usize = points_per_dir.iter().product();
        let mut quadrature_weights = Vec::with_capacity(num_points);
        let mut collapsed_coords = Vec::with_capacity(num_points);
        for k in 0..points_per_dir[2] {
            for j in 0..points_per_dir[1] {
                for i in 0..points_per_dir[0] {
                    quadrature_weights.push(weights_per_dir[0][i] * weights_per_dir[1][j] * weights_per_dir[2][k]);
                    collapsed_coords.push([z_per_dir[0][i], z_per_dir[1][j], z_per_dir[2][k]]);
                }
            }
        }
        let collapse_factors = collapsed_coords
            .iter()
            .map(|eta| shape.collapse_jacobian(eta))
            .collect();

        let mut expansion = Self {
            key: key.clone(),
            bases,
            layout,
            contraction,
            nodal: None,
            points_per_dir,
            quadrature_weights,
            collapsed_coords,
            collapse_factors,
            matrices: MatrixManager::new("std matrices"),
            static_cond: MatrixManager::new("std static condensation"),
        };

        if let Some(points_key) = key.nodal_points() {
            let points = registry.points(points_key);
            expansion.nodal = Some(expansion.nodal_transform(points));
        }
        expansion
    }

    fn nodal_transform(&self, points: Arc<Points>) -> NodalTransform {
        assert_eq!(
            points.num_points(),
            self.num_coeffs(),
            "Nodal point count {} does not match the number of expansion coefficients {}",
            points.num_points(),
            self.num_coeffs()
        );
        let n = self.num_coeffs();
        let mut vandermonde = DMatrix::zeros(n, n);
        for m in 0..n {
            let mode = self.fill_mode(m);
            for i in 0..n {
                let xi = [points.coords(0)[i], points.coords(1)[i]];
                vandermonde[(i, m)] = self.interpolate_collapsed(&self.key.shape().collapse(&xi), &mode);
            }
        }
        let inverse = vandermonde
            .clone()
            .try_inverse()
            .unwrap_or_else(|| panic!("Vandermonde matrix of the nodal expansion is singular"));
        NodalTransform {
            points,
            vandermonde,
            inverse,
        }
    }

    pub fn key(&self) -> &ExpansionKey {
        &self.key
    }

    pub fn shape(&self) -> ShapeType {
        self.key.shape()
    }

    pub fn dim(&self) -> usize {
        self.key.shape().dim()
    }

    pub fn basis(&self, dir: usize) -> &Arc<Basis> {
        &self.bases[dir]
    }

    pub fn bases(&self) -> &[Arc<Basis>] {
        &self.bases
    }

    /// The quadrature points in each direction.
    pub fn points(&self) -> Vec<&Points> {
        self.bases.iter().map(|b| b.points().as_ref()).collect()
    }

    pub fn num_coeffs(&self) -> usize {
        self.layout.modes.len()
    }

    pub fn num_points(&self) -> usize {
        self.quadrature_weights.len()
    }

    /// The number of quadrature points in each direction, padded with ones to three directions.
    pub fn points_per_direction(&self) -> [usize; 3] {
        self.points_per_dir
    }

    pub fn is_nodal(&self) -> bool {
        self.nodal.is_some()
    }

    /// The nodal points of a nodal expansion.
    pub fn nodal_points(&self) -> Option<&Arc<Points>> {
        self.nodal.as_ref().map(|n| &n.points)
    }

    /// The Vandermonde matrix of a nodal expansion, mapping modal to nodal coefficients.
    pub fn vandermonde(&self) -> Option<&DMatrix<f64>> {
        self.nodal.as_ref().map(|n| &n.vandermonde)
    }

    /// Whether the coefficients coincide with the values at the quadrature points.
    pub fn is_collocated(&self) -> bool {
        self.nodal.is_none() && self.bases.iter().all(|b| b.collocation())
    }

    /// The mode index `(p, q, r)` of each coefficient.
    pub fn mode_indices(&self) -> &[[usize; 3]] {
        &self.layout.modes
    }

    /// Quadrature weights on the reference element, including the collapse factors.
    pub fn quadrature_weights(&self) -> &[f64] {
        &self.quadrature_weights
    }

    /// The collapsed coordinates of every quadrature point.
    pub fn collapsed_coords(&self) -> &[[f64; 3]] {
        &self.collapsed_coords
    }

    /// The derivatives $\partial \eta_a / \partial \xi_j$ at every quadrature point.
    pub(crate) fn collapse_factors(&self) -> &[[[f64; 3]; 3]] {
        &self.collapse_factors
    }

    fn tables(&self, deriv_dir: Option<usize>) -> Vec<&DMatrix<f64>> {
        self.bases
            .iter()
            .enumerate()
            .map(|(d, b)| {
                if deriv_dir == Some(d) {
                    b.derivatives()
                } else {
                    b.values()
                }
            })
            .collect()
    }

    fn to_modal<'a>(&self, coeffs: &'a [f64]) -> Cow<'a, [f64]> {
        match &self.nodal {
            Some(nodal) => Cow::Owned(dense_mul(&nodal.inverse, coeffs)),
            None => Cow::Borrowed(coeffs),
        }
    }

    fn assert_phys_len(&self, phys: &[f64]) {
        assert_eq!(
            phys.len(),
            self.num_points(),
            "Input has {} values, but the expansion has {} quadrature points",
            phys.len(),
            self.num_points()
        );
    }

    /// Integrates the given quadrature values over the reference element.
    pub fn integral(&self, phys: &[f64]) -> f64 {
        self.assert_phys_len(phys);
        phys.iter().zip(&self.quadrature_weights).map(|(u, w)| u * w).sum()
    }

    /// Evaluates the expansion with the given coefficients at the quadrature points.
    pub fn bwd_trans(&self, coeffs: &[f64]) -> Vec<f64> {
        assert_eq!(coeffs.len(), self.num_coeffs(), "Coefficient array has wrong length");
        let modal = self.to_modal(coeffs);
        let mut out = vec![0.0; self.num_points()];
        self.contraction.bwd(&self.tables(None), &modal, &mut out);
        out
    }

    /// Inner products of pre-weighted quadrature values with every basis function, or with its
    /// derivative in collapsed direction `deriv_dir`.
    pub(crate) fn iproduct_kernel(&self, deriv_dir: Option<usize>, weighted: &[f64]) -> Vec<f64> {
        self.assert_phys_len(weighted);
        let mut out = vec![0.0; self.num_coeffs()];
        self.contraction.iproduct(&self.tables(deriv_dir), weighted, &mut out);
        match &self.nodal {
            Some(nodal) => dense_mul(&nodal.inverse.transpose(), &out),
            None => out,
        }
    }

    /// Computes the inner products $(\phi_m, u)$ over the reference element.
    pub fn iproduct_wrt_base(&self, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        self.iproduct_kernel(None, &vmul(phys, &self.quadrature_weights))
    }

    /// Computes the inner products $(\partial \phi_m / \partial \xi_{dir}, u)$ over the reference element.
    pub fn iproduct_wrt_deriv_base(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        assert!(dir < self.dim(), "Direction {dir} out of bounds");
        let mut out = vec![0.0; self.num_coeffs()];
        for a in 0..self.dim() {
            if self.collapse_factors.iter().all(|m| m[a][dir] == 0.0) {
                continue;
            }
            let weighted: Vec<f64> = phys
                .iter()
                .zip(&self.quadrature_weights)
                .zip(&self.collapse_factors)
                .map(|((u, w), m)| u * w * m[a][dir])
                .collect();
            axpy(1.0, &self.iproduct_kernel(Some(a), &weighted), &mut out);
        }
        out
    }

    /// Derivatives with respect to the collapsed coordinates $\eta$.
    pub fn phys_tensor_deriv(&self, phys: &[f64]) -> Vec<Vec<f64>> {
        self.assert_phys_len(phys);
        (0..self.dim())
            .map(|d| {
                tensor_apply(phys, self.points_per_dir, d, self.bases[d].points().derivative_matrix()).0
            })
            .collect()
    }

    /// Derivatives with respect to the reference coordinates $\xi$.
    pub fn phys_deriv(&self, phys: &[f64]) -> Vec<Vec<f64>> {
        let du = self.phys_tensor_deriv(phys);
        (0..self.dim())
            .map(|j| self.chain_collapsed_derivatives(&du, j))
            .collect()
    }

    /// The derivative with respect to the reference coordinate $\xi_{dir}$.
    pub fn phys_deriv_dir(&self, dir: usize, phys: &[f64]) -> Vec<f64> {
        assert!(dir < self.dim(), "Direction {dir} out of bounds");
        let du = self.phys_tensor_deriv(phys);
        self.chain_collapsed_derivatives(&du, dir)
    }

    fn chain_collapsed_derivatives(&self, du: &[Vec<f64>], j: usize) -> Vec<f64> {
        self.collapse_factors
            .iter()
            .enumerate()
            .map(|(i, m)| (0..du.len()).map(|a| du[a][i] * m[a][j]).sum())
            .collect()
    }

    /// Projects quadrature values onto the expansion.
    ///
    /// Collocated expansions copy the values. Otherwise the inner products with the basis are
    /// multiplied by the inverse mass matrix.
    pub fn fwd_trans(&self, phys: &[f64]) -> Vec<f64> {
        self.assert_phys_len(phys);
        if self.is_collocated() {
            return phys.to_vec();
        }
        let inv_mass = self.std_matrix(&self.matrix_key(MatrixType::InvMass));
        dense_mul(&inv_mass, &self.iproduct_wrt_base(phys))
    }

    /// Interpolates quadrature values to an arbitrary point given in collapsed coordinates.
    pub(crate) fn interpolate_collapsed(&self, eta: &[f64; 3], phys: &[f64]) -> f64 {
        let mut lagrange = vec![vec![1.0]; 3];
        for (d, basis) in self.bases.iter().enumerate() {
            lagrange[d] = basis.points().lagrange_weights_at(eta[d]);
        }
        let (l0, l1, l2) = (&lagrange[0], &lagrange[1], &lagrange[2]);
        let [n0, n1, _] = self.points_per_dir;

        let mut value = 0.0;
        for (k, c) in l2.iter().enumerate() {
            for (j, b) in l1.iter().enumerate() {
                let bc = b * c;
                if bc == 0.0 {
                    continue;
                }
                let offset = n0 * (j + n1 * k);
                let row: f64 = l0.iter().zip(&phys[offset..offset + n0]).map(|(a, u)| a * u).sum();
                value += bc * row;
            }
        }
        value
    }

    /// Evaluates the function given by its quadrature values at a reference point.
    ///
    /// # Panics
    ///
    /// Panics if the point lies outside the reference shape.
    pub fn phys_evaluate(&self, xi: &[f64], phys: &[f64]) -> f64 {
        self.assert_phys_len(phys);
        assert!(
            self.shape().contains_reference_point(xi, REFERENCE_DOMAIN_TOLERANCE),
            "Point {xi:?} lies outside the reference {}",
            self.shape()
        );
        self.interpolate_collapsed(&self.shape().collapse(xi), phys)
    }

    /// The reference coordinates $\xi$ of the quadrature points, one array per direction.
    pub fn coords(&self) -> Vec<Vec<f64>> {
        let shape = self.shape();
        let xi: Vec<[f64; 3]> = self
            .collapsed_coords
            .iter()
            .map(|eta| shape.uncollapse(eta))
            .collect();
        (0..self.dim())
            .map(|d| xi.iter().map(|x| x[d]).collect())
            .collect()
    }

    /// The quadrature values of basis function `m`.
    pub fn fill_mode(&self, m: usize) -> Vec<f64> {
        assert!(m < self.num_coeffs(), "Mode {m} out of bounds");
        let mut coeffs = vec![0.0; self.num_coeffs()];
        coeffs[m] = 1.0;
        self.bwd_trans(&coeffs)
    }

    /// Whether the modes split into boundary and interior modes.
    ///
    /// Orthogonal expansions and pyramids have no such decomposition. Their boundary, interior and
    /// vertex maps are unavailable, and so are their statically condensed matrices.
    pub fn has_boundary_decomposition(&self) -> bool {
        self.nodal.is_some() || self.layout.has_boundary_decomposition(self.shape())
    }

    fn ensure_boundary_decomposition(&self) -> eyre::Result<()> {
        if self.has_boundary_decomposition() {
            Ok(())
        } else {
            Err(eyre!(
                "{} expansion with {:?} bases has no boundary/interior decomposition",
                self.shape(),
                self.key.basis_keys().iter().map(BasisKey::basis_type).collect::<Vec<_>>()
            ))
        }
    }

    /// Like [`boundary_map`](Self::boundary_map), but returns an error for expansions without a
    /// boundary/interior decomposition.
    pub fn try_boundary_map(&self) -> eyre::Result<Vec<usize>> {
        self.ensure_boundary_decomposition()?;
        Ok(self.boundary_map())
    }

    /// Like [`interior_map`](Self::interior_map), but returns an error for expansions without a
    /// boundary/interior decomposition.
    pub fn try_interior_map(&self) -> eyre::Result<Vec<usize>> {
        self.ensure_boundary_decomposition()?;
        Ok(self.interior_map())
    }

    /// Like [`vertex_map`](Self::vertex_map), but returns an error for expansions without vertex
    /// modes.
    pub fn try_vertex_map(&self, vertex: usize) -> eyre::Result<usize> {
        self.ensure_boundary_decomposition()?;
        Ok(self.vertex_map(vertex))
    }

    /// Coefficient indices of the modes that are nonzero on the boundary, in ascending order.
    ///
    /// # Panics
    ///
    /// Panics for orthogonal expansions and pyramids, which have no boundary/interior decomposition.
    pub fn boundary_map(&self) -> Vec<usize> {
        if let Some(nodal) = &self.nodal {
            let n = nodal.points.key().num_points();
            return (0..3 * (n - 1)).collect();
        }
        (0..self.num_coeffs())
            .filter(|&m| self.layout.is_boundary_mode(self.shape(), m))
            .collect()
    }

    /// Coefficient indices of the modes that vanish on the boundary, in ascending order.
    pub fn interior_map(&self) -> Vec<usize> {
        let boundary = self.boundary_map();
        (0..self.num_coeffs())
            .filter(|m| boundary.binary_search(m).is_err())
            .collect()
    }

    pub fn num_boundary_coeffs(&self) -> usize {
        self.boundary_map().len()
    }

    pub fn num_interior_coeffs(&self) -> usize {
        self.num_coeffs() - self.num_boundary_coeffs()
    }

    /// The coefficient index of the mode associated with the given vertex.
    pub fn vertex_map(&self, vertex: usize) -> usize {
        if self.nodal.is_some() {
            assert!(vertex < 3, "Vertex {vertex} out of bounds for triangle");
            return vertex;
        }
        let mode = self.layout.vertex_mode(self.shape(), vertex);
        self.layout
            .coeff_of(mode)
            .unwrap_or_else(|| panic!("Expansion has no mode for vertex {vertex}"))
    }

    /// A matrix key of the given type for this expansion.
    pub fn matrix_key(&self, matrix_type: MatrixType) -> MatrixKey {
        MatrixKey::new(matrix_type, &self.key)
    }

    /// The reference matrix for the given key, constructed on first use.
    pub fn std_matrix(&self, key: &MatrixKey) -> Arc<DMatrix<f64>> {
        assert_eq!(key.expansion_key(), &self.key, "Matrix key belongs to a different expansion");
        self.matrices.get(self, key)
    }

    /// The statically condensed reference matrix for the given key, constructed on first use.
    pub fn std_static_cond_matrix(&self, key: &MatrixKey) -> Arc<BlockMatrix> {
        assert_eq!(key.expansion_key(), &self.key, "Matrix key belongs to a different expansion");
        self.static_cond.get(self, key)
    }

    /// The statically condensed reference matrix for the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion has no boundary/interior decomposition.
    pub fn try_std_static_cond_matrix(&self, key: &MatrixKey) -> eyre::Result<Arc<BlockMatrix>> {
        self.ensure_boundary_decomposition()?;
        Ok(self.std_static_cond_matrix(key))
    }

    /// Assembles the matrix for the given key by quadrature, bypassing the cache.
    pub fn gen_matrix(&self, key: &MatrixKey) -> DMatrix<f64> {
        gen_matrix(self, key)
    }

    /// Number of reference matrices constructed so far.
    pub fn matrix_construction_count(&self) -> usize {
        self.matrices.construction_count()
    }

    /// Applies a cached reference matrix to the given vector.
    pub fn matrix_op(&self, key: &MatrixKey, input: &[f64]) -> Vec<f64> {
        dense_mul(&self.std_matrix(key), input)
    }
}

impl MatrixFactory<MatrixKey, DMatrix<f64>> for StdExpansion {
    fn create_matrix(&self, key: &MatrixKey) -> DMatrix<f64> {
        gen_matrix(self, key)
    }
}

impl MatrixFactory<MatrixKey, BlockMatrix> for StdExpansion {
    fn create_matrix(&self, key: &MatrixKey) -> BlockMatrix {
        let matrix = self.std_matrix(key);
        condense(&matrix, &self.boundary_map(), &self.interior_map(), 1.0)
    }
}

impl ElementOperators for StdExpansion {
    fn num_coeffs(&self) -> usize {
        self.num_coeffs()
    }

    fn num_points(&self) -> usize {
        self.num_points()
    }

    fn num_deriv_dirs(&self) -> usize {
        self.dim()
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
        self.std_matrix(key).as_ref().clone()
    }

    fn condensed_matrix(&self, key: &MatrixKey) -> Arc<BlockMatrix> {
        self.std_static_cond_matrix(key)
    }
}
