use crate::foundations::fekete;
use crate::foundations::lagrange::{barycentric_weights, differentiation_matrix, interpolation_matrix, lagrange_basis_at};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use spectral_hp_quadrature::univariate::{gauss_jacobi, gauss_lobatto, gauss_radau_m, gauss_radau_p};
use spectral_hp_quadrature::Rule;

/// The point distributions supported by [`Points`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointsType {
    GaussGaussLegendre,
    GaussRadauMLegendre,
    GaussRadauPLegendre,
    GaussLobattoLegendre,
    /// Gauss-Radau points including `-1` for the Jacobi weight $(1 - x)$.
    GaussRadauMAlpha1Beta0,
    /// Gauss-Radau points including `-1` for the Jacobi weight $(1 - x)^2$.
    GaussRadauMAlpha2Beta0,
    PolyEvenlySpaced,
    /// Electrostatic-like Fekete points on the reference triangle.
    NodalTriFekete,
}

impl PointsType {
    /// The dimension of the domain the points live in.
    pub fn dim(&self) -> usize {
        match self {
            PointsType::NodalTriFekete => 2,
            _ => 1,
        }
    }

    /// The exponent $\alpha$ of the Jacobi weight $(1 - x)^\alpha$ built into the quadrature weights.
    pub fn jacobi_alpha(&self) -> i32 {
        match self {
            PointsType::GaussRadauMAlpha1Beta0 => 1,
            PointsType::GaussRadauMAlpha2Beta0 => 2,
            _ => 0,
        }
    }

    /// The smallest number of points for which the distribution is defined.
    pub fn min_points(&self) -> usize {
        match self {
            PointsType::GaussLobattoLegendre | PointsType::NodalTriFekete => 2,
            _ => 1,
        }
    }
}

/// Identifies a point distribution.
///
/// For one-dimensional distributions, `num_points` is the total number of points. For
/// [`PointsType::NodalTriFekete`] it is the number of points along each triangle edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointsKey {
    num_points: usize,
    points_type: PointsType,
}

impl PointsKey {
    pub fn new(num_points: usize, points_type: PointsType) -> Self {
        assert!(
            num_points >= points_type.min_points(),
            "{points_type:?} requires at least {} points, got {num_points}",
            points_type.min_points()
        );
        Self {
            num_points,
            points_type,
        }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn points_type(&self) -> PointsType {
        self.points_type
    }

    /// The total number of points in the distribution.
    pub fn total_points(&self) -> usize {
        match self.points_type {
            PointsType::NodalTriFekete => self.num_points * (self.num_points + 1) / 2,
            _ => self.num_points,
        }
    }

    pub fn dim(&self) -> usize {
        self.points_type.dim()
    }
}

/// A point distribution together with its quadrature weights and differentiation matrices.
#[derive(Debug, Clone)]
pub struct Points {
    key: PointsKey,
    coords: Vec<Vec<f64>>,
    weights: Vec<f64>,
    derivatives: Vec<DMatrix<f64>>,
    /// Barycentric interpolation weights, only available for one-dimensional distributions.
    barycentric: Vec<f64>,
}

fn rule_to_arrays(rule: Rule<1>) -> (Vec<f64>, Vec<f64>) {
    let (weights, points) = rule;
    (points.into_iter().map(|[x]| x).collect(), weights)
}

impl Points {
    pub fn new(key: PointsKey) -> Self {
        match key.points_type() {
            PointsType::NodalTriFekete => Self::new_fekete(key),
            _ => Self::new_univariate(key),
        }
    }

    fn new_univariate(key: PointsKey) -> Self {
        let n = key.num_points();
        let (z, weights) = match key.points_type() {
            PointsType::GaussGaussLegendre => rule_to_arrays(gauss_jacobi(n, 0.0, 0.0)),
            PointsType::GaussRadauMLegendre => rule_to_arrays(gauss_radau_m(n, 0.0, 0.0)),
            PointsType::GaussRadauPLegendre => rule_to_arrays(gauss_radau_p(n, 0.0, 0.0)),
            PointsType::GaussRadauMAlpha1Beta0 => rule_to_arrays(gauss_radau_m(n, 1.0, 0.0)),
            PointsType::GaussRadauMAlpha2Beta0 => rule_to_arrays(gauss_radau_m(n, 2.0, 0.0)),
            PointsType::GaussLobattoLegendre => {
                let rule = gauss_lobatto(n, 0.0, 0.0).unwrap_or_else(|err| panic!("{err}"));
                rule_to_arrays(rule)
            }
            PointsType::PolyEvenlySpaced => {
                let z: Vec<f64> = if n == 1 {
                    vec![0.0]
                } else {
                    (0..n).map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64).collect()
                };
                // Integrate the Lagrange polynomials with a Gauss rule that is exact for them
                let (gz, gw) = rule_to_arrays(gauss_jacobi(n, 0.0, 0.0));
                let b = barycentric_weights(&z);
                let interp = interpolation_matrix(&z, &b, &gz);
                let weights = interp.transpose() * nalgebra::DVector::from_column_slice(&gw);
                (z, weights.as_slice().to_vec())
            }
            PointsType::NodalTriFekete => unreachable!(),
        };

        let barycentric = barycentric_weights(&z);
        let derivative = differentiation_matrix(&z, &barycentric);
        Self {
            key,
            coords: vec![z],
            weights,
            derivatives: vec![derivative],
            barycentric,
        }
    }

    fn new_fekete(key: PointsKey) -> Self {
        let [x, y] = fekete::fekete_points(key.num_points());
        let (weights, derivatives) = fekete::fekete_weights_and_derivatives(key.num_points(), &x, &y);
        Self {
            key,
            coords: vec![x, y],
            weights,
            derivatives: derivatives.into(),
            barycentric: Vec::new(),
        }
    }

    pub fn key(&self) -> PointsKey {
        self.key
    }

    pub fn points_type(&self) -> PointsType {
        self.key.points_type()
    }

    /// The total number of points.
    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// The coordinates of a one-dimensional distribution.
    ///
    /// # Panics
    ///
    /// Panics if the distribution is not one-dimensional.
    pub fn z(&self) -> &[f64] {
        assert_eq!(self.dim(), 1, "Points::z is only available for one-dimensional points");
        &self.coords[0]
    }

    /// The coordinate component `dir` of every point.
    pub fn coords(&self, dir: usize) -> &[f64] {
        &self.coords[dir]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The differentiation matrix of a one-dimensional distribution.
    pub fn derivative_matrix(&self) -> &DMatrix<f64> {
        assert_eq!(self.dim(), 1, "Use Points::derivative_matrices for multi-dimensional points");
        &self.derivatives[0]
    }

    /// One differentiation matrix per coordinate direction.
    pub fn derivative_matrices(&self) -> &[DMatrix<f64>] {
        &self.derivatives
    }

    pub fn contains_left_endpoint(&self) -> bool {
        self.dim() == 1 && (self.z()[0] + 1.0).abs() < 1e-14
    }

    pub fn contains_right_endpoint(&self) -> bool {
        self.dim() == 1 && self.z().last().map_or(false, |z| (z - 1.0).abs() < 1e-14)
    }

    /// The matrix interpolating values at these points to values at `targets`.
    ///
    /// The result has dimensions `targets.len() x self.num_points()`.
    pub fn interpolation_matrix_to(&self, targets: &[f64]) -> DMatrix<f64> {
        interpolation_matrix(self.z(), &self.barycentric, targets)
    }

    /// The Lagrange basis through these points, evaluated at `x`.
    pub fn lagrange_weights_at(&self, x: f64) -> Vec<f64> {
        lagrange_basis_at(self.z(), &self.barycentric, x)
    }
}
