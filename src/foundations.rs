//! Point distributions and one-dimensional bases.
//!
//! Everything else in the library is built from the [`Points`] and [`Basis`] types defined here.
//! Both are immutable once constructed and are shared through `Arc` handles handed out by the
//! [`BasisRegistry`].
pub mod basis;
pub mod lagrange;
pub mod points;
pub mod registry;

pub(crate) mod fekete;

pub use basis::{triangular_index, Basis, BasisKey, BasisType};
pub use points::{Points, PointsKey, PointsType};
pub use registry::{BasisRegistry, PointsRegistry};
