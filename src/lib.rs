//! Spectral/hp element expansions.
//!
//! The library is organized in layers:
//!
//! - [`foundations`] provides one-dimensional point distributions, the two-dimensional Fekete
//!   points on the triangle and tabulated one-dimensional basis families.
//! - [`std_regions`] builds reference (standard) expansions for the seven element shapes out of
//!   tensor products of the one-dimensional bases, using collapsed coordinates for the simplex-like
//!   shapes.
//! - [`geometry`] describes the mapping from a reference element to a physical element and
//!   computes the derivative factors and Jacobian of that mapping.
//! - [`local_regions`] combines a reference expansion with a geometry to provide physical-space
//!   operators, local matrices and their statically condensed forms.
//! - [`list`] groups many local expansions into a single collection with global coefficient and
//!   quadrature offsets.
pub mod error;
pub mod foundations;
pub mod geometry;
pub mod list;
pub mod local_regions;
pub mod matrix;
pub mod shape;
pub mod std_regions;
pub mod util;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;

/// Collapsed-coordinate denominators smaller than this are treated as the collapsed vertex or edge.
pub const COLLAPSE_TOLERANCE: f64 = 1e-12;
