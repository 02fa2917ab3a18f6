//! Element geometry: the map from reference to physical coordinates.
//!
//! A [`Geometry`] represents its coordinate map as a reference expansion (the *xmap*), with one
//! set of coefficients per physical coordinate. Straight-sided elements whose vertex map is
//! affine are classified as [`GeomType::Regular`], in which case all geometric factors are
//! constant over the element.
use crate::foundations::{BasisRegistry, PointsKey};
use crate::shape::ShapeType;
use crate::std_regions::kernels::interpolate_tensor;
use crate::std_regions::{BasisFamily, ExpansionSettings, StdExpansion};
use crate::util::LazyCache;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod factors;

pub use factors::GeomFactors;

/// Relative tolerance used when classifying a vertex map as affine.
const AFFINE_TOLERANCE: f64 = 1e-12;
const MAX_INVERSE_MAP_ITERATIONS: usize = 50;
const INVERSE_MAP_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeomType {
    /// Affine map with constant geometric factors.
    Regular,
    /// General map with geometric factors varying over the element.
    Deformed,
}

/// Orientation of an element trace relative to its canonical direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceOrientation {
    Forwards,
    Backwards,
}

/// The affine map $x(\xi) = x_0 + A (\xi - \xi_0)$, where $\xi_0$ is reference vertex 0.
#[derive(Debug, Clone, PartialEq)]
struct AffineMap {
    origin: DVector<f64>,
    reference_origin: DVector<f64>,
    matrix: DMatrix<f64>,
}

impl AffineMap {
    fn from_vertices(shape: ShapeType, vertices: &[DVector<f64>]) -> Self {
        let dim = shape.dim();
        let coord_dim = vertices[0].len();
        let reference = shape.reference_vertices();
        let origin = vertices[0].clone();
        let mut matrix = DMatrix::zeros(coord_dim, dim);
        for (d, &v) in shape.axis_vertices().iter().enumerate() {
            // Moving from vertex 0 to the axis vertex changes xi_d by 2
            let edge = &vertices[v] - &origin;
            matrix.set_column(d, &(edge * 0.5));
            debug_assert!((reference[v][d] - reference[0][d] - 2.0).abs() < 1e-14);
        }
        Self {
            origin,
            reference_origin: DVector::from_fn(dim, |d, _| reference[0][d]),
            matrix,
        }
    }

    fn map(&self, xi: &[f64]) -> DVector<f64> {
        let dxi = DVector::from_fn(self.matrix.ncols(), |d, _| xi[d]) - &self.reference_origin;
        &self.origin + &self.matrix * dxi
    }
}

/// The geometry of a single element.
///
/// Geometries are immutable once constructed, except for the cache of geometric factors.
/// Local expansions hold shared references to their geometry; the geometry never refers back.
#[derive(Debug)]
pub struct Geometry {
    shape: ShapeType,
    coord_dim: usize,
    geom_type: GeomType,
    vertices: Vec<DVector<f64>>,
    affine: AffineMap,
    is_affine: bool,
    xmap: Arc<StdExpansion>,
    /// Coefficients of the xmap, one array per physical coordinate.
    coeffs: Vec<Vec<f64>>,
    /// Values of the physical coordinates at the xmap quadrature points.
    phys: Vec<Vec<f64>>,
    /// `tensor_derivs[k][a]` holds $\partial x_k / \partial \eta_a$ at the xmap quadrature points.
    tensor_derivs: Vec<Vec<Vec<f64>>>,
    trace_orientations: Vec<TraceOrientation>,
    factors: LazyCache<Vec<PointsKey>, GeomFactors>,
}

fn to_vectors<V: AsRef<[f64]>>(shape: ShapeType, vertices: &[V]) -> Vec<DVector<f64>> {
    assert_eq!(
        vertices.len(),
        shape.num_vertices(),
        "A {shape} has {} vertices, got {}",
        shape.num_vertices(),
        vertices.len()
    );
    let coord_dim = vertices[0].as_ref().len();
    assert!(
        coord_dim >= shape.dim() && coord_dim <= 3,
        "Coordinate dimension {coord_dim} is not supported for a {shape}"
    );
    vertices
        .iter()
        .map(|v| {
            assert_eq!(v.as_ref().len(), coord_dim, "All vertices must have the same dimension");
            DVector::from_column_slice(v.as_ref())
        })
        .collect()
}

fn diameter(vertices: &[DVector<f64>]) -> f64 {
    let mut diameter: f64 = 0.0;
    for a in vertices {
        for b in vertices {
            diameter = diameter.max((a - b).norm());
        }
    }
    diameter
}

impl Geometry {
    /// Constructs a straight-sided geometry from its vertices.
    ///
    /// The geometry is regular if the vertices are the image of the reference vertices under an
    /// affine map, and deformed otherwise.
    ///
    /// # Panics
    ///
    /// Panics if the number of vertices does not match the shape, if the vertices have
    /// inconsistent dimensions, or for non-affine pyramids.
    pub fn from_vertices<V: AsRef<[f64]>>(registry: &BasisRegistry, shape: ShapeType, vertices: &[V]) -> Self {
        let vertices = to_vectors(shape, vertices);
        let affine = AffineMap::from_vertices(shape, &vertices);
        let scale = diameter(&vertices).max(f64::MIN_POSITIVE);
        let is_affine = shape
            .reference_vertices()
            .iter()
            .zip(&vertices)
            .all(|(xi, v)| (affine.map(xi) - v).norm() <= AFFINE_TOLERANCE * scale);
        assert!(
            is_affine || shape != ShapeType::Pyramid,
            "Non-affine pyramid geometries are not implemented"
        );

        let xmap = registry.std_expansion(&ExpansionSettings::new(2, BasisFamily::Modified).expansion_key(shape));
        let coord_dim = vertices[0].len();
        let phys: Vec<Vec<f64>> = (0..coord_dim)
            .map(|k| {
                xmap.collapsed_coords()
                    .iter()
                    .map(|eta| {
                        shape
                            .vertex_functions(eta)
                            .iter()
                            .zip(&vertices)
                            .map(|(phi, v)| phi * v[k])
                            .sum::<f64>()
                    })
                    .collect()
            })
            .collect();
        let geom_type = if is_affine {
            GeomType::Regular
        } else {
            GeomType::Deformed
        };
        Self::with_xmap(shape, vertices, affine, is_affine, geom_type, xmap, phys)
    }

    /// Constructs a curved geometry from an arbitrary map from reference to physical coordinates.
    ///
    /// The map is projected onto an expansion with `num_modes` modes per direction, so it is
    /// represented exactly if it is a polynomial of sufficiently low degree. The geometry is always
    /// classified as deformed.
    pub fn from_map(
        registry: &BasisRegistry,
        shape: ShapeType,
        coord_dim: usize,
        num_modes: usize,
        map: impl Fn(&[f64]) -> Vec<f64>,
    ) -> Self {
        let xmap = registry.std_expansion(&ExpansionSettings::new(num_modes, BasisFamily::Modified).expansion_key(shape));
        let vertices: Vec<Vec<f64>> = shape
            .reference_vertices()
            .iter()
            .map(|xi| map(&xi[..shape.dim()]))
            .collect();
        let vertices = to_vectors(shape, &vertices);
        assert_eq!(vertices[0].len(), coord_dim, "Map returns points of the wrong dimension");
        let affine = AffineMap::from_vertices(shape, &vertices);

        let values: Vec<Vec<f64>> = xmap
            .collapsed_coords()
            .iter()
            .map(|eta| map(&shape.uncollapse(eta)[..shape.dim()]))
            .collect();
        let phys: Vec<Vec<f64>> = (0..coord_dim)
            .map(|k| values.iter().map(|x| x[k]).collect())
            .collect();
        Self::with_xmap(shape, vertices, affine, false, GeomType::Deformed, xmap, phys)
    }

    fn with_xmap(
        shape: ShapeType,
        vertices: Vec<DVector<f64>>,
        affine: AffineMap,
        is_affine: bool,
        geom_type: GeomType,
        xmap: Arc<StdExpansion>,
        sampled: Vec<Vec<f64>>,
    ) -> Self {
        let coeffs: Vec<Vec<f64>> = sampled.iter().map(|x| xmap.fwd_trans(x)).collect();
        // Values of the projected map, so that all derived quantities are consistent with it
        let phys: Vec<Vec<f64>> = coeffs.iter().map(|c| xmap.bwd_trans(c)).collect();
        let tensor_derivs = phys.iter().map(|x| xmap.phys_tensor_deriv(x)).collect();
        Self {
            shape,
            coord_dim: vertices[0].len(),
            geom_type,
            vertices,
            affine,
            is_affine,
            trace_orientations: vec![TraceOrientation::Forwards; shape.num_traces()],
            xmap,
            coeffs,
            phys,
            tensor_derivs,
            factors: LazyCache::default(),
        }
    }

    /// Overrides the classification of the geometry.
    ///
    /// # Panics
    ///
    /// Panics if regular geometry is requested for a map that is not affine.
    pub fn with_geom_type(mut self, geom_type: GeomType) -> Self {
        assert!(
            geom_type == GeomType::Deformed || self.is_affine,
            "Only affine geometries can be treated as regular"
        );
        self.geom_type = geom_type;
        self.factors.clear();
        self
    }

    pub fn with_trace_orientations(mut self, orientations: Vec<TraceOrientation>) -> Self {
        assert_eq!(
            orientations.len(),
            self.shape.num_traces(),
            "A {} has {} traces",
            self.shape,
            self.shape.num_traces()
        );
        self.trace_orientations = orientations;
        self
    }

    pub fn shape(&self) -> ShapeType {
        self.shape
    }

    pub fn dim(&self) -> usize {
        self.shape.dim()
    }

    pub fn coord_dim(&self) -> usize {
        self.coord_dim
    }

    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    pub fn vertex(&self, i: usize) -> &[f64] {
        self.vertices[i].as_slice()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn trace_orientation(&self, trace: usize) -> TraceOrientation {
        self.trace_orientations[trace]
    }

    /// The reference expansion of the coordinate map.
    pub fn xmap(&self) -> &Arc<StdExpansion> {
        &self.xmap
    }

    /// The coefficients of coordinate `k` in the coordinate map.
    pub fn coord_coeffs(&self, k: usize) -> &[f64] {
        &self.coeffs[k]
    }

    pub fn diameter(&self) -> f64 {
        diameter(&self.vertices)
    }

    /// Maps a reference point to physical coordinates.
    pub fn coord(&self, xi: &[f64]) -> Vec<f64> {
        assert!(xi.len() >= self.dim(), "Reference point has too few components");
        match self.geom_type {
            GeomType::Regular => self.affine.map(xi).as_slice().to_vec(),
            GeomType::Deformed => self.coord_collapsed(&self.shape.collapse(xi)),
        }
    }

    fn coord_collapsed(&self, eta: &[f64; 3]) -> Vec<f64> {
        self.phys
            .iter()
            .map(|x| self.xmap.interpolate_collapsed(eta, x))
            .collect()
    }

    /// The Jacobian matrix $\partial x / \partial \xi$ at a reference point.
    fn jacobian_matrix_at(&self, xi: &[f64]) -> DMatrix<f64> {
        let eta = self.shape.collapse(xi);
        let m = self.shape.collapse_jacobian(&eta);
        let dim = self.dim();
        let dx_deta: Vec<Vec<f64>> = self
            .tensor_derivs
            .iter()
            .map(|derivs| derivs.iter().map(|d| self.xmap.interpolate_collapsed(&eta, d)).collect())
            .collect();
        DMatrix::from_fn(self.coord_dim, dim, |k, j| (0..dim).map(|a| dx_deta[k][a] * m[a][j]).sum())
    }

    /// Maps a physical point to reference coordinates.
    ///
    /// Regular geometries are inverted directly. Deformed geometries use Gauss-Newton iteration
    /// starting from the centroid of the reference shape. The returned point is not restricted to
    /// the reference shape.
    pub fn loc_coords(&self, x: &[f64]) -> eyre::Result<Vec<f64>> {
        assert_eq!(x.len(), self.coord_dim, "Physical point has the wrong dimension");
        let target = DVector::from_column_slice(x);
        let dim = self.dim();

        if self.geom_type == GeomType::Regular {
            let (_, inverse) = factors::invert_jacobian(&self.affine.matrix)?;
            let xi = &self.affine.reference_origin + inverse * (target - &self.affine.origin);
            return Ok(xi.as_slice().to_vec());
        }

        let reference = self.shape.reference_vertices();
        let mut xi: Vec<f64> = (0..dim)
            .map(|d| reference.iter().map(|v| v[d]).sum::<f64>() / reference.len() as f64)
            .collect();
        let tolerance = INVERSE_MAP_TOLERANCE * self.diameter().max(1.0);
        for iteration in 0..MAX_INVERSE_MAP_ITERATIONS {
            let residual = DVector::from_vec(self.coord(&xi)) - &target;
            if residual.norm() <= tolerance {
                debug!("Inverted coordinate map in {iteration} iterations");
                return Ok(xi);
            }
            let j = self.jacobian_matrix_at(&xi);
            let (_, inverse) = factors::invert_jacobian(&j)?;
            let step = inverse * residual;
            xi.iter_mut().zip(step.iter()).for_each(|(xi, dx)| *xi -= dx);
        }
        Err(eyre!(
            "Failed to invert the coordinate map at {x:?} within {MAX_INVERSE_MAP_ITERATIONS} iterations"
        ))
    }

    /// Geometric factors at the quadrature points of the given expansion, computed once per set
    /// of quadrature points.
    ///
    /// # Errors
    ///
    /// Returns an error if the Jacobian is singular or negative at any point.
    pub fn geom_factors(&self, target: &StdExpansion) -> eyre::Result<Arc<GeomFactors>> {
        assert_eq!(target.shape(), self.shape, "Expansion shape does not match the geometry");
        let keys: Vec<PointsKey> = target.bases().iter().map(|b| b.key().points_key()).collect();
        self.factors.get_or_try_insert_with(&keys, || {
            debug!("Computing {:?} geometric factors for {:?}", self.geom_type, keys);
            self.compute_factors(target, keys.clone())
        })
    }

    /// Geometric factors at the quadrature points of the coordinate map itself.
    pub fn native_geom_factors(&self) -> eyre::Result<Arc<GeomFactors>> {
        self.geom_factors(&self.xmap)
    }

    fn compute_factors(&self, target: &StdExpansion, keys: Vec<PointsKey>) -> eyre::Result<GeomFactors> {
        let num_points = target.num_points();
        if self.geom_type == GeomType::Regular {
            return GeomFactors::from_jacobian_matrices(
                GeomType::Regular,
                num_points,
                keys,
                &[self.affine.matrix.clone()],
            );
        }

        let dim = self.dim();
        let from = self.xmap.points();
        let to = target.points();
        // dx_k / deta_a at the target points
        let derivs: Vec<Vec<Vec<f64>>> = self
            .tensor_derivs
            .iter()
            .map(|per_dir| per_dir.iter().map(|d| interpolate_tensor(d, &from, &to)).collect())
            .collect();
        let matrices: Vec<DMatrix<f64>> = target
            .collapse_factors()
            .iter()
            .enumerate()
            .map(|(q, m)| {
                DMatrix::from_fn(self.coord_dim, dim, |k, j| {
                    (0..dim).map(|a| derivs[k][a][q] * m[a][j]).sum()
                })
            })
            .collect();
        GeomFactors::from_jacobian_matrices(GeomType::Deformed, num_points, keys, &matrices)
    }
}

/// Opaque handle to a geometry in a [`GeometryTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryId(usize);

impl GeometryId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owns a collection of geometries and hands out [`GeometryId`] handles to them.
#[derive(Debug, Default)]
pub struct GeometryTable {
    geometries: Vec<Arc<Geometry>>,
}

impl GeometryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(Arc::new(geometry));
        GeometryId(self.geometries.len() - 1)
    }

    /// # Panics
    ///
    /// Panics if the handle does not belong to this table.
    pub fn get(&self, id: GeometryId) -> &Arc<Geometry> {
        self.geometries
            .get(id.0)
            .unwrap_or_else(|| panic!("Geometry {id:?} is not in the table"))
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeometryId, &Arc<Geometry>)> {
        self.geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (GeometryId(i), g))
    }
}
