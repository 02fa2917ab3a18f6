use crate::foundations::{BasisKey, BasisType, PointsKey, PointsType};
use crate::shape::ShapeType;
use crate::std_regions::ExpansionKey;
use serde::{Deserialize, Serialize};

/// The family of bases used when generating expansions from [`ExpansionSettings`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasisFamily {
    /// Hierarchical C0 modified bases.
    Modified,
    /// Orthonormal bases.
    Orthogonal,
    /// Lagrange polynomials through Gauss-Lobatto-Legendre points. Tensor-product shapes only.
    GllLagrange,
    /// Nodal expansions through Fekete points. Triangles only; other shapes use modified bases.
    NodalFekete,
}

/// Discretization settings used to generate basis keys for every shape.
///
/// Tensor directions use Gauss-Lobatto-Legendre points, while collapsed directions use
/// Gauss-Radau-Jacobi points whose weight absorbs the collapse factor. Pyramids always use
/// orthogonal bases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub num_modes: usize,
    pub basis_family: BasisFamily,
    /// Additional quadrature points per direction beyond the default.
    pub quadrature_offset: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            num_modes: 4,
            basis_family: BasisFamily::Modified,
            quadrature_offset: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DirectionKind {
    Tensor,
    CollapsedB,
    CollapsedC,
}

fn direction_kinds(shape: ShapeType) -> &'static [DirectionKind] {
    use DirectionKind::*;
    match shape {
        ShapeType::Segment => &[Tensor],
        ShapeType::Quadrilateral => &[Tensor, Tensor],
        ShapeType::Hexahedron => &[Tensor, Tensor, Tensor],
        ShapeType::Triangle => &[Tensor, CollapsedB],
        ShapeType::Tetrahedron => &[Tensor, CollapsedB, CollapsedC],
        ShapeType::Prism => &[Tensor, Tensor, CollapsedB],
        ShapeType::Pyramid => &[Tensor, Tensor, CollapsedC],
    }
}

impl ExpansionSettings {
    pub fn new(num_modes: usize, basis_family: BasisFamily) -> Self {
        Self {
            num_modes,
            basis_family,
            ..Self::default()
        }
    }

    pub fn with_quadrature_offset(self, quadrature_offset: usize) -> Self {
        Self {
            quadrature_offset,
            ..self
        }
    }

    /// Generates the basis keys for the given shape.
    ///
    /// # Panics
    ///
    /// Panics if the number of modes is zero, or if the GLL Lagrange family is requested for a
    /// collapsed shape.
    pub fn basis_keys(&self, shape: ShapeType) -> Vec<BasisKey> {
        let n = self.num_modes;
        assert!(n > 0, "The number of modes must be positive");
        let offset = self.quadrature_offset;

        let family = match (self.basis_family, shape) {
            (_, ShapeType::Pyramid) => BasisFamily::Orthogonal,
            (BasisFamily::NodalFekete, ShapeType::Triangle) => BasisFamily::Orthogonal,
            (BasisFamily::NodalFekete, _) => BasisFamily::Modified,
            (BasisFamily::GllLagrange, shape) if shape.is_collapsed() => {
                panic!("GLL Lagrange bases are not available for the {shape} expansion")
            }
            (family, _) => family,
        };
        let num_modes = if family == BasisFamily::GllLagrange { n.max(2) } else { n };

        direction_kinds(shape)
            .iter()
            .map(|kind| {
                let basis_type = match (family, kind) {
                    (BasisFamily::GllLagrange, _) => BasisType::GllLagrange,
                    (BasisFamily::Orthogonal, DirectionKind::Tensor) => BasisType::OrthoA,
                    (BasisFamily::Orthogonal, DirectionKind::CollapsedB) => BasisType::OrthoB,
                    (BasisFamily::Orthogonal, DirectionKind::CollapsedC) => BasisType::OrthoC,
                    (_, DirectionKind::Tensor) => BasisType::ModifiedA,
                    (_, DirectionKind::CollapsedB) => BasisType::ModifiedB,
                    (_, DirectionKind::CollapsedC) => BasisType::ModifiedC,
                };
                let points = match (family, kind) {
                    (BasisFamily::GllLagrange, _) => PointsKey::new(num_modes + offset, PointsType::GaussLobattoLegendre),
                    (_, DirectionKind::Tensor) => PointsKey::new(n + 1 + offset, PointsType::GaussLobattoLegendre),
                    (_, DirectionKind::CollapsedB) => PointsKey::new(n + offset, PointsType::GaussRadauMAlpha1Beta0),
                    (_, DirectionKind::CollapsedC) => PointsKey::new(n + offset, PointsType::GaussRadauMAlpha2Beta0),
                };
                BasisKey::new(basis_type, num_modes, points)
            })
            .collect()
    }

    /// The expansion key for the given shape.
    pub fn expansion_key(&self, shape: ShapeType) -> ExpansionKey {
        let keys = self.basis_keys(shape);
        if self.basis_family == BasisFamily::NodalFekete && shape == ShapeType::Triangle {
            ExpansionKey::nodal_triangle(keys, PointsType::NodalTriFekete)
        } else {
            ExpansionKey::new(shape, keys)
        }
    }
}
