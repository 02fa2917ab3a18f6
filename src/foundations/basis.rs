use crate::foundations::lagrange::{barycentric_weights, interpolation_matrix};
use crate::foundations::points::{Points, PointsKey, PointsType};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use spectral_hp_quadrature::jacobi::jacobi;
use spectral_hp_quadrature::univariate::gauss_lobatto;
use std::sync::Arc;

/// One-dimensional basis families.
///
/// The `A` variants are ordinary one-dimensional bases. The `B` and `C` variants are tabulated
/// over a triangular index set and are used in collapsed directions, where the polynomial in the
/// collapsed coordinate depends on the mode index of the preceding direction(s).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasisType {
    OrthoA,
    OrthoB,
    OrthoC,
    ModifiedA,
    ModifiedB,
    ModifiedC,
    GllLagrange,
}

impl BasisType {
    pub fn is_modified(&self) -> bool {
        matches!(self, BasisType::ModifiedA | BasisType::ModifiedB | BasisType::ModifiedC)
    }

    pub fn is_orthogonal(&self) -> bool {
        matches!(self, BasisType::OrthoA | BasisType::OrthoB | BasisType::OrthoC)
    }

    /// Whether the basis is tabulated over a triangular index set.
    pub fn is_triangular(&self) -> bool {
        matches!(
            self,
            BasisType::OrthoB | BasisType::OrthoC | BasisType::ModifiedB | BasisType::ModifiedC
        )
    }
}

/// Identifies a tabulated one-dimensional basis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasisKey {
    basis_type: BasisType,
    num_modes: usize,
    points_key: PointsKey,
}

impl BasisKey {
    /// Creates a new basis key.
    ///
    /// # Panics
    ///
    /// Panics if `num_modes` is zero, if the points are not one-dimensional or if there are fewer
    /// points than modes.
    pub fn new(basis_type: BasisType, num_modes: usize, points_key: PointsKey) -> Self {
        assert!(num_modes > 0, "A basis must have at least one mode");
        assert_eq!(points_key.dim(), 1, "Bases must be tabulated on one-dimensional points");
        assert!(
            num_modes <= points_key.num_points(),
            "Basis with {num_modes} modes cannot be resolved with {} points",
            points_key.num_points()
        );
        if basis_type == BasisType::GllLagrange {
            assert!(num_modes >= 2, "GLL Lagrange bases need at least two modes");
        }
        Self {
            basis_type,
            num_modes,
            points_key,
        }
    }

    pub fn basis_type(&self) -> BasisType {
        self.basis_type
    }

    pub fn num_modes(&self) -> usize {
        self.num_modes
    }

    pub fn num_points(&self) -> usize {
        self.points_key.num_points()
    }

    pub fn points_key(&self) -> PointsKey {
        self.points_key
    }

    pub fn points_type(&self) -> PointsType {
        self.points_key.points_type()
    }

    /// Whether the basis is the Lagrange basis through its own quadrature points.
    pub fn collocation(&self) -> bool {
        self.basis_type == BasisType::GllLagrange
            && self.points_type() == PointsType::GaussLobattoLegendre
            && self.num_points() == self.num_modes
    }

    /// The number of columns in the tabulated basis.
    pub fn table_size(&self) -> usize {
        let n = self.num_modes;
        match self.basis_type {
            BasisType::ModifiedB | BasisType::ModifiedC | BasisType::OrthoB | BasisType::OrthoC => n * (n + 1) / 2,
            _ => n,
        }
    }
}

/// Index of the entry `(p, q)`, with `q < num_modes - p`, in a triangular table.
pub fn triangular_index(num_modes: usize, p: usize, q: usize) -> usize {
    debug_assert!(p < num_modes && q < num_modes - p);
    p * num_modes - p * p.saturating_sub(1) / 2 + q
}

/// A one-dimensional basis tabulated at a set of quadrature points.
///
/// `values` and `derivatives` have one row per point and one column per table entry.
#[derive(Debug, Clone)]
pub struct Basis {
    key: BasisKey,
    points: Arc<Points>,
    values: DMatrix<f64>,
    derivatives: DMatrix<f64>,
}

fn set_column(table: &mut DMatrix<f64>, col: usize, z: &[f64], f: impl Fn(f64) -> f64) {
    for (i, &zi) in z.iter().enumerate() {
        table[(i, col)] = f(zi);
    }
}

fn modified_a(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let mut table = DMatrix::zeros(z.len(), num_modes);
    set_column(&mut table, 0, z, |z| 0.5 * (1.0 - z));
    if num_modes > 1 {
        set_column(&mut table, 1, z, |z| 0.5 * (1.0 + z));
    }
    for p in 2..num_modes {
        set_column(&mut table, p, z, |z| 0.25 * (1.0 - z) * (1.0 + z) * jacobi(p - 2, 1.0, 1.0, z));
    }
    table
}

/// Tabulates the modified `B` basis, which is also used for `C` directions.
fn modified_b(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let n = num_modes;
    let mut table = DMatrix::zeros(z.len(), n * (n + 1) / 2);
    let a_table = modified_a(n, z);
    for q in 0..n {
        table.set_column(triangular_index(n, 0, q), &a_table.column(q));
    }
    if n > 1 {
        set_column(&mut table, triangular_index(n, 1, 0), z, |z| 0.5 * (1.0 - z));
        for q in 1..(n - 1) {
            set_column(&mut table, triangular_index(n, 1, q), z, |z| {
                0.25 * (1.0 - z) * (1.0 + z) * jacobi(q - 1, 1.0, 1.0, z)
            });
        }
    }
    for p in 2..n {
        let pi = p as i32;
        set_column(&mut table, triangular_index(n, p, 0), z, |z| (0.5 * (1.0 - z)).powi(pi));
        for q in 1..(n - p) {
            set_column(&mut table, triangular_index(n, p, q), z, |z| {
                (0.5 * (1.0 - z)).powi(pi) * 0.5 * (1.0 + z) * jacobi(q - 1, 2.0 * p as f64 - 1.0, 1.0, z)
            });
        }
    }
    table
}

fn ortho_a(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let mut table = DMatrix::zeros(z.len(), num_modes);
    for p in 0..num_modes {
        set_column(&mut table, p, z, |z| (p as f64 + 0.5).sqrt() * jacobi(p, 0.0, 0.0, z));
    }
    table
}

fn ortho_b(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let n = num_modes;
    let mut table = DMatrix::zeros(z.len(), n * (n + 1) / 2);
    for p in 0..n {
        for q in 0..(n - p) {
            set_column(&mut table, triangular_index(n, p, q), z, |z| {
                (0.5 * (1.0 - z)).powi(p as i32)
                    * jacobi(q, 2.0 * p as f64 + 1.0, 0.0, z)
                    * ((p + q) as f64 + 1.0).sqrt()
            });
        }
    }
    table
}

/// Tabulates the orthogonal `C` basis.
///
/// The polynomial for mode `(p, q, r)` only depends on `s = p + q` and `r`, so the table holds one
/// column per `(s, r)` pair.
fn ortho_c(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let n = num_modes;
    let mut table = DMatrix::zeros(z.len(), n * (n + 1) / 2);
    for s in 0..n {
        for r in 0..(n - s) {
            set_column(&mut table, triangular_index(n, s, r), z, |z| {
                (0.5 * (1.0 - z)).powi(s as i32)
                    * jacobi(r, 2.0 * s as f64 + 2.0, 0.0, z)
                    * (0.5 * (2 * s + 2 * r + 3) as f64).sqrt()
            });
        }
    }
    table
}

fn gll_lagrange(num_modes: usize, z: &[f64]) -> DMatrix<f64> {
    let (_, nodes) = gauss_lobatto(num_modes, 0.0, 0.0).unwrap_or_else(|err| panic!("{err}"));
    let nodes: Vec<f64> = nodes.into_iter().map(|[x]| x).collect();
    let weights = barycentric_weights(&nodes);
    interpolation_matrix(&nodes, &weights, z)
}

impl Basis {
    pub fn new(key: BasisKey, points: Arc<Points>) -> Self {
        assert_eq!(points.key(), key.points_key(), "Points do not match the basis key");
        let z = points.z();
        let n = key.num_modes();
        let values = match key.basis_type() {
            BasisType::ModifiedA => modified_a(n, z),
            BasisType::ModifiedB | BasisType::ModifiedC => modified_b(n, z),
            BasisType::OrthoA => ortho_a(n, z),
            BasisType::OrthoB => ortho_b(n, z),
            BasisType::OrthoC => ortho_c(n, z),
            BasisType::GllLagrange => gll_lagrange(n, z),
        };
        let derivatives = points.derivative_matrix() * &values;
        Self {
            key,
            points,
            values,
            derivatives,
        }
    }

    pub fn key(&self) -> BasisKey {
        self.key
    }

    pub fn basis_type(&self) -> BasisType {
        self.key.basis_type()
    }

    pub fn points(&self) -> &Arc<Points> {
        &self.points
    }

    pub fn num_modes(&self) -> usize {
        self.key.num_modes()
    }

    pub fn num_points(&self) -> usize {
        self.points.num_points()
    }

    /// The coordinates of the quadrature points.
    pub fn z(&self) -> &[f64] {
        self.points.z()
    }

    /// Quadrature weights of the underlying points.
    pub fn w(&self) -> &[f64] {
        self.points.weights()
    }

    /// Basis values, one row per point and one column per table entry.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Basis derivatives, one row per point and one column per table entry.
    pub fn derivatives(&self) -> &DMatrix<f64> {
        &self.derivatives
    }

    pub fn collocation(&self) -> bool {
        self.key.collocation()
    }
}
