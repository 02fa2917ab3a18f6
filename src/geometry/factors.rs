use crate::foundations::PointsKey;
use crate::geometry::GeomType;
use eyre::eyre;
use nalgebra::DMatrix;

/// Jacobian and derivative factors of the map from reference to physical coordinates, evaluated
/// at the quadrature points of an expansion.
///
/// For [`GeomType::Regular`] geometries every array holds a single value that applies to all
/// points. For [`GeomType::Deformed`] geometries the arrays hold one value per point.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomFactors {
    geom_type: GeomType,
    dim: usize,
    coord_dim: usize,
    num_points: usize,
    points_keys: Vec<PointsKey>,
    jacobian: Vec<f64>,
    /// Entry `i * dim + j` holds $\partial \xi_j / \partial x_i$.
    deriv_factors: Vec<Vec<f64>>,
}

/// Computes the (generalized) Jacobian determinant and the (pseudo-)inverse of the Jacobian
/// matrix `dx/dxi`, which has one row per physical coordinate and one column per reference
/// direction.
pub(crate) fn invert_jacobian(j: &DMatrix<f64>) -> eyre::Result<(f64, DMatrix<f64>)> {
    if j.is_square() {
        let det = j.determinant();
        if det.is_nan() || det <= 0.0 {
            return Err(eyre!("Singular element Jacobian encountered (determinant {det})"));
        }
        let inverse = j
            .clone()
            .try_inverse()
            .ok_or_else(|| eyre!("Singular element Jacobian encountered"))?;
        Ok((det, inverse))
    } else {
        let jtj = j.transpose() * j;
        let det = jtj.determinant();
        if det.is_nan() || det <= 0.0 {
            return Err(eyre!("Singular element Jacobian encountered (metric determinant {det})"));
        }
        let inverse = jtj
            .try_inverse()
            .ok_or_else(|| eyre!("Singular element Jacobian encountered"))?;
        Ok((det.sqrt(), inverse * j.transpose()))
    }
}

impl GeomFactors {
    /// Builds the factors from one Jacobian matrix per point (a single matrix for regular geometry).
    pub(crate) fn from_jacobian_matrices(
        geom_type: GeomType,
        num_points: usize,
        points_keys: Vec<PointsKey>,
        matrices: &[DMatrix<f64>],
    ) -> eyre::Result<Self> {
        let expected = match geom_type {
            GeomType::Regular => 1,
            GeomType::Deformed => num_points,
        };
        assert_eq!(matrices.len(), expected, "Wrong number of Jacobian matrices");
        let first = matrices
            .first()
            .unwrap_or_else(|| panic!("Geometric factors need at least one point"));
        let (coord_dim, dim) = first.shape();

        let mut jacobian = Vec::with_capacity(matrices.len());
        let mut deriv_factors = vec![Vec::with_capacity(matrices.len()); coord_dim * dim];
        for (q, j) in matrices.iter().enumerate() {
            let (det, inverse) =
                invert_jacobian(j).map_err(|err| err.wrap_err(format!("at quadrature point {q}")))?;
            jacobian.push(det);
            for i in 0..coord_dim {
                for d in 0..dim {
                    deriv_factors[i * dim + d].push(inverse[(d, i)]);
                }
            }
        }

        Ok(Self {
            geom_type,
            dim,
            coord_dim,
            num_points,
            points_keys,
            jacobian,
            deriv_factors,
        })
    }

    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    pub fn is_regular(&self) -> bool {
        self.geom_type == GeomType::Regular
    }

    /// The reference dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn coord_dim(&self) -> usize {
        self.coord_dim
    }

    /// The number of quadrature points the factors were computed for.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// The keys of the quadrature points in each reference direction.
    pub fn points_keys(&self) -> &[PointsKey] {
        &self.points_keys
    }

    /// The Jacobian, a single value for regular geometry.
    pub fn jacobian(&self) -> &[f64] {
        &self.jacobian
    }

    /// The derivative factor $\partial \xi_j / \partial x_i$, a single value for regular geometry.
    pub fn deriv_factor(&self, i: usize, j: usize) -> &[f64] {
        assert!(i < self.coord_dim && j < self.dim, "Derivative factor ({i}, {j}) out of bounds");
        &self.deriv_factors[i * self.dim + j]
    }

    /// The value of an array at point `q`, broadcasting regular (single-valued) arrays.
    pub(crate) fn at(values: &[f64], q: usize) -> f64 {
        if values.len() == 1 {
            values[0]
        } else {
            values[q]
        }
    }

    /// Multiplies the values by the Jacobian.
    pub fn multiply_by_jacobian(&self, values: &mut [f64]) {
        assert_eq!(values.len(), self.num_points, "Values do not match the quadrature points");
        match self.geom_type {
            GeomType::Regular => values.iter_mut().for_each(|v| *v *= self.jacobian[0]),
            GeomType::Deformed => values
                .iter_mut()
                .zip(&self.jacobian)
                .for_each(|(v, j)| *v *= j),
        }
    }

    /// Divides the values by the Jacobian.
    pub fn divide_by_jacobian(&self, values: &mut [f64]) {
        assert_eq!(values.len(), self.num_points, "Values do not match the quadrature points");
        match self.geom_type {
            GeomType::Regular => values.iter_mut().for_each(|v| *v /= self.jacobian[0]),
            GeomType::Deformed => values
                .iter_mut()
                .zip(&self.jacobian)
                .for_each(|(v, j)| *v /= j),
        }
    }
}
