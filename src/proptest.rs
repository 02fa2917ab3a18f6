//! Strategies for property-based testing.
use crate::shape::ShapeType;
use crate::std_regions::{BasisFamily, ExpansionSettings};
use ::proptest::prelude::*;

pub fn shape_type() -> impl Strategy<Value = ShapeType> {
    prop::sample::select(ShapeType::ALL.to_vec())
}

/// Settings with a modest number of modes, using the modified or orthogonal family.
pub fn expansion_settings() -> impl Strategy<Value = ExpansionSettings> {
    let families = prop::sample::select(vec![BasisFamily::Modified, BasisFamily::Orthogonal]);
    (2usize..=5, families, 0usize..=1).prop_map(|(num_modes, family, offset)| {
        ExpansionSettings::new(num_modes, family).with_quadrature_offset(offset)
    })
}

/// The vertices of the reference shape under a random orientation-preserving affine map.
///
/// The linear part is diagonally dominant with a positive diagonal, so its determinant is
/// positive and the element is reasonably shaped.
pub fn affine_vertices(shape: ShapeType) -> impl Strategy<Value = Vec<Vec<f64>>> {
    let dim = shape.dim();
    let diagonal = prop::collection::vec(0.5..2.0, dim);
    // Off-diagonal entries are bounded so that every row stays strictly diagonally dominant
    let off_diagonal = prop::collection::vec(-0.2..0.2, dim * dim);
    let translation = prop::collection::vec(-10.0..10.0, dim);
    (diagonal, off_diagonal, translation).prop_map(move |(diagonal, off_diagonal, translation)| {
        shape
            .reference_vertices()
            .iter()
            .map(|xi| {
                (0..dim)
                    .map(|i| {
                        let linear: f64 = (0..dim)
                            .map(|j| {
                                let a = if i == j {
                                    diagonal[i]
                                } else {
                                    off_diagonal[i * dim + j] * diagonal[i]
                                };
                                a * xi[j]
                            })
                            .sum();
                        translation[i] + linear
                    })
                    .collect()
            })
            .collect()
    })
}

/// Coefficient vectors of the given length with entries in a moderate range.
pub fn coefficients(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-5.0..5.0, len)
}
