use crate::foundations::basis::{Basis, BasisKey};
use crate::foundations::points::{Points, PointsKey};
use crate::std_regions::{ExpansionKey, StdExpansion};
use crate::util::LazyCache;
use log::debug;
use nalgebra::DMatrix;
use std::sync::Arc;

/// Shared cache of point distributions and interpolation matrices between them.
///
/// Every distribution is constructed at most once per registry. Lookups are safe to perform
/// concurrently from several threads.
#[derive(Debug, Default)]
pub struct PointsRegistry {
    points: LazyCache<PointsKey, Points>,
    interpolation: LazyCache<(PointsKey, PointsKey), DMatrix<f64>>,
}

impl PointsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: PointsKey) -> Arc<Points> {
        self.points.get_or_insert_with(&key, || {
            debug!("Constructing points {:?}", key);
            Points::new(key)
        })
    }

    /// The matrix interpolating values at the points of `from` to the points of `to`.
    pub fn interpolation_matrix(&self, from: PointsKey, to: PointsKey) -> Arc<DMatrix<f64>> {
        self.interpolation.get_or_insert_with(&(from, to), || {
            let source = self.get(from);
            let target = self.get(to);
            source.interpolation_matrix_to(target.z())
        })
    }

    /// The number of cached point distributions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared cache of points, bases and reference expansions.
///
/// A single registry is typically shared (through `Arc` or a plain reference) by all expansions of
/// a discretization, so that reference data is computed once and shared between elements.
#[derive(Debug, Default)]
pub struct BasisRegistry {
    points: PointsRegistry,
    bases: LazyCache<BasisKey, Basis>,
    expansions: LazyCache<ExpansionKey, StdExpansion>,
}

impl BasisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points_registry(&self) -> &PointsRegistry {
        &self.points
    }

    pub fn points(&self, key: PointsKey) -> Arc<Points> {
        self.points.get(key)
    }

    pub fn basis(&self, key: BasisKey) -> Arc<Basis> {
        self.bases.get_or_insert_with(&key, || {
            debug!("Constructing basis {:?}", key);
            Basis::new(key, self.points(key.points_key()))
        })
    }

    /// Returns the reference expansion for the given key, constructing it if necessary.
    pub fn std_expansion(&self, key: &ExpansionKey) -> Arc<StdExpansion> {
        self.expansions.get_or_insert_with(key, || {
            debug!("Constructing {} expansion with {:?}", key.shape(), key.basis_keys());
            StdExpansion::from_key(self, key)
        })
    }

    pub fn num_bases(&self) -> usize {
        self.bases.len()
    }

    pub fn num_std_expansions(&self) -> usize {
        self.expansions.len()
    }
}
