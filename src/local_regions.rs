//! Expansions on physical elements.
//!
//! A [`LocalExpansion`] combines a shared reference expansion with the geometry of a single
//! element. Operators are evaluated in physical coordinates by folding the geometric factors into
//! the reference operators. Regular (affine) elements use constant factors throughout, which lets
//! local matrices be stored as scaled reference matrices.
use crate::foundations::BasisRegistry;
use crate::geometry::{GeomFactors, GeomType, Geometry};
use crate::matrix::{BlockMatrix, MatrixManager, MatrixKey, ScaledMatrix};
use crate::shape::ShapeType;
use crate::std_regions::{ExpansionSettings, StdExpansion};
use crate::util::{LazyCache, LazySlot};
use eyre::WrapErr;
use std::sync::Arc;

mod matrices;
mod metrics;
mod normals;
mod operators;
mod state;

/// Whether the physical coordinates of the quadrature points have been computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeomState {
    NotFilled,
    PtsFilled,
}

/// The origin of the coefficients held by a [`LocalExpansion`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransState {
    /// No coefficients have been set.
    NotSet,
    /// Coefficients were set directly.
    Local,
    /// Coefficients were obtained by a forward transform of the element's own values.
    Transformed,
}

/// An expansion on a single physical element.
///
/// The expansion owns its coefficient and quadrature arrays as well as its local matrix caches.
/// The reference expansion, geometry and geometric factors are shared.
#[derive(Debug)]
pub struct LocalExpansion {
    std: Arc<StdExpansion>,
    geometry: Arc<Geometry>,
    factors: Arc<GeomFactors>,
    coeffs: Vec<f64>,
    phys: Vec<f64>,
    phys_valid: bool,
    trans_state: TransState,
    coords: LazySlot<Vec<Vec<f64>>>,
    quadrature_metric: LazySlot<Vec<f64>>,
    laplacian_metric: LazySlot<Vec<Vec<f64>>>,
    normals: LazyCache<usize, Vec<Vec<f64>>>,
    matrices: MatrixManager<MatrixKey, ScaledMatrix>,
    static_cond: MatrixManager<MatrixKey, BlockMatrix>,
}

impl LocalExpansion {
    /// Creates the expansion of the given reference expansion on the given geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometric factors cannot be computed, for example because the
    /// element is inverted.
    pub fn new(std: Arc<StdExpansion>, geometry: Arc<Geometry>) -> eyre::Result<Self> {
        assert_eq!(
            std.shape(),
            geometry.shape(),
            "A {} expansion cannot be placed on a {} geometry",
            std.shape(),
            geometry.shape()
        );
        let factors = geometry
            .geom_factors(&std)
            .wrap_err_with(|| format!("Failed to compute geometric factors of {} element", geometry.shape()))?;
        Ok(Self {
            coeffs: vec![0.0; std.num_coeffs()],
            phys: vec![0.0; std.num_points()],
            phys_valid: false,
            trans_state: TransState::NotSet,
            std,
            geometry,
            factors,
            coords: LazySlot::default(),
            quadrature_metric: LazySlot::default(),
            laplacian_metric: LazySlot::default(),
            normals: LazyCache::default(),
            matrices: MatrixManager::new("local matrices"),
            static_cond: MatrixManager::new("local static condensation"),
        })
    }

    /// Creates the expansion with the discretization given by the settings.
    pub fn from_settings(
        registry: &BasisRegistry,
        geometry: Arc<Geometry>,
        settings: &ExpansionSettings,
    ) -> eyre::Result<Self> {
        let std = registry.std_expansion(&settings.expansion_key(geometry.shape()));
        Self::new(std, geometry)
    }

    pub fn std(&self) -> &Arc<StdExpansion> {
        &self.std
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn geom_factors(&self) -> &Arc<GeomFactors> {
        &self.factors
    }

    pub fn geom_type(&self) -> GeomType {
        self.factors.geom_type()
    }

    pub fn shape(&self) -> ShapeType {
        self.std.shape()
    }

    pub fn dim(&self) -> usize {
        self.std.dim()
    }

    pub fn coord_dim(&self) -> usize {
        self.geometry.coord_dim()
    }

    pub fn num_coeffs(&self) -> usize {
        self.std.num_coeffs()
    }

    pub fn num_points(&self) -> usize {
        self.std.num_points()
    }

    pub fn boundary_map(&self) -> Vec<usize> {
        self.std.boundary_map()
    }

    pub fn interior_map(&self) -> Vec<usize> {
        self.std.interior_map()
    }

    pub fn num_boundary_coeffs(&self) -> usize {
        self.std.num_boundary_coeffs()
    }

    pub fn vertex_map(&self, vertex: usize) -> usize {
        self.std.vertex_map(vertex)
    }

    /// The quadrature weights multiplied by the Jacobian, computed once.
    pub fn quadrature_metric(&self) -> Arc<Vec<f64>> {
        self.quadrature_metric.get_or_init(|| {
            let mut metric = self.std.quadrature_weights().to_vec();
            self.factors.multiply_by_jacobian(&mut metric);
            metric
        })
    }

    pub fn geom_state(&self) -> GeomState {
        if self.coords.is_initialized() {
            GeomState::PtsFilled
        } else {
            GeomState::NotFilled
        }
    }

    /// Computes the physical coordinates of the quadrature points if they have not been computed.
    pub fn fill_geom(&self) {
        self.coords();
    }

    /// The physical coordinates of the quadrature points, one array per coordinate.
    pub fn coords(&self) -> Arc<Vec<Vec<f64>>> {
        self.coords.get_or_init(|| {
            let xmap = self.geometry.xmap();
            let from = xmap.points();
            let to = self.std.points();
            (0..self.coord_dim())
                .map(|k| {
                    let values = xmap.bwd_trans(self.geometry.coord_coeffs(k));
                    crate::std_regions::kernels::interpolate_tensor(&values, &from, &to)
                })
                .collect()
        })
    }

    /// Maps a reference point to physical coordinates.
    pub fn coord(&self, xi: &[f64]) -> Vec<f64> {
        self.geometry.coord(xi)
    }
}
