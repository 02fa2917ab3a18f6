//! Expansions on the reference shapes.
//!
//! Each reference shape is parametrized by collapsed coordinates $\eta \in [-1, 1]^d$, on which the
//! expansion is a (generalized) tensor product of one-dimensional bases. See [`StdExpansion`].
use crate::foundations::{BasisKey, PointsKey, PointsType};
use crate::shape::ShapeType;
use serde::{Deserialize, Serialize};

pub mod expansion;
pub(crate) mod kernels;
pub(crate) mod layout;
mod settings;

pub use expansion::StdExpansion;
pub use settings::{BasisFamily, ExpansionSettings};

/// Identifies a reference expansion: its shape, one basis key per direction and, for nodal
/// expansions, the nodal point distribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpansionKey {
    shape: ShapeType,
    basis_keys: Vec<BasisKey>,
    nodal_points: Option<PointsKey>,
}

impl ExpansionKey {
    /// # Panics
    ///
    /// Panics if the number of basis keys does not match the dimension of the shape.
    pub fn new(shape: ShapeType, basis_keys: Vec<BasisKey>) -> Self {
        assert_eq!(
            basis_keys.len(),
            shape.dim(),
            "{shape} expansion needs {} basis keys, got {}",
            shape.dim(),
            basis_keys.len()
        );
        Self {
            shape,
            basis_keys,
            nodal_points: None,
        }
    }

    /// A nodal triangle expansion through the given two-dimensional point distribution.
    ///
    /// The modal basis keys must have the same number of modes in both directions, which is also
    /// the number of nodes along each edge.
    pub fn nodal_triangle(basis_keys: Vec<BasisKey>, points_type: PointsType) -> Self {
        assert_eq!(points_type.dim(), 2, "Nodal triangle points must be two-dimensional");
        let mut key = Self::new(ShapeType::Triangle, basis_keys);
        let n = key.basis_keys[0].num_modes();
        assert_eq!(
            n,
            key.basis_keys[1].num_modes(),
            "Nodal triangle expansions need the same number of modes in both directions"
        );
        key.nodal_points = Some(PointsKey::new(n, points_type));
        key
    }

    pub fn shape(&self) -> ShapeType {
        self.shape
    }

    pub fn basis_keys(&self) -> &[BasisKey] {
        &self.basis_keys
    }

    pub fn nodal_points(&self) -> Option<PointsKey> {
        self.nodal_points
    }

    pub fn dim(&self) -> usize {
        self.shape.dim()
    }
}
