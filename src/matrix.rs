//! Elemental matrix keys, storage formats and caches.
pub mod assembly;
pub mod block;
pub mod condensation;
pub mod key;
pub mod manager;

pub use block::{BlockMatrix, ScaledMatrix};
pub use key::{ConstFactorType, MatrixKey, MatrixType, VarCoeff, VarCoeffType};
pub use manager::{MatrixFactory, MatrixManager};
