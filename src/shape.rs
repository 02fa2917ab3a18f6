//! Element shapes and their collapsed-coordinate transformations.
//!
//! The simplex-like shapes (triangle, tetrahedron, prism and pyramid) are described as degenerate
//! tensor-product domains. A reference point $\xi$ is mapped to *collapsed* coordinates $\eta$
//! living in the hypercube $[-1, 1]^d$. For the triangle, for example,
//!
//! $$ \eta_1 = \frac{2 (1 + \xi_1)}{1 - \xi_2} - 1, \qquad \eta_2 = \xi_2. $$
//!
//! The collapse is singular on the collapsed vertex or edge. Whenever a denominator is smaller
//! than [`COLLAPSE_TOLERANCE`](crate::COLLAPSE_TOLERANCE) in magnitude, the collapsed coordinate is
//! set to `-1` and the corresponding entries of $\partial \eta / \partial \xi$ are set to zero.
use crate::COLLAPSE_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The element shapes supported by the library.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeType {
    Segment,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Prism,
    Pyramid,
    Hexahedron,
}

/// Description of a single trace (vertex, edge or face) of a shape in collapsed coordinates.
///
/// Each trace is the set of points where the collapsed coordinate in `fixed_dir` equals `-1`
/// (or `+1` if `at_upper` is set).
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct TraceInfo {
    pub fixed_dir: usize,
    pub at_upper: bool,
    pub free_dirs: &'static [usize],
    /// Whether the trace runs against the ascending order of its free collapsed coordinate.
    pub reversed: bool,
    /// The gradient of the function whose zero level set is the trace, in reference coordinates.
    pub normal: [f64; 3],
}

const fn trace(fixed_dir: usize, at_upper: bool, free_dirs: &'static [usize], reversed: bool, normal: [f64; 3]) -> TraceInfo {
    TraceInfo {
        fixed_dir,
        at_upper,
        free_dirs,
        reversed,
        normal,
    }
}

static SEGMENT_TRACES: [TraceInfo; 2] = [
    trace(0, false, &[], false, [-1.0, 0.0, 0.0]),
    trace(0, true, &[], false, [1.0, 0.0, 0.0]),
];

static TRIANGLE_TRACES: [TraceInfo; 3] = [
    trace(1, false, &[0], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1], false, [1.0, 1.0, 0.0]),
    trace(0, false, &[1], true, [-1.0, 0.0, 0.0]),
];

static QUADRILATERAL_TRACES: [TraceInfo; 4] = [
    trace(1, false, &[0], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1], false, [1.0, 0.0, 0.0]),
    trace(1, true, &[0], true, [0.0, 1.0, 0.0]),
    trace(0, false, &[1], true, [-1.0, 0.0, 0.0]),
];

static TETRAHEDRON_TRACES: [TraceInfo; 4] = [
    trace(2, false, &[0, 1], false, [0.0, 0.0, -1.0]),
    trace(1, false, &[0, 2], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1, 2], false, [1.0, 1.0, 1.0]),
    trace(0, false, &[1, 2], false, [-1.0, 0.0, 0.0]),
];

static PRISM_TRACES: [TraceInfo; 5] = [
    trace(2, false, &[0, 1], false, [0.0, 0.0, -1.0]),
    trace(1, false, &[0, 2], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1, 2], false, [1.0, 0.0, 1.0]),
    trace(1, true, &[0, 2], false, [0.0, 1.0, 0.0]),
    trace(0, false, &[1, 2], false, [-1.0, 0.0, 0.0]),
];

static PYRAMID_TRACES: [TraceInfo; 5] = [
    trace(2, false, &[0, 1], false, [0.0, 0.0, -1.0]),
    trace(1, false, &[0, 2], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1, 2], false, [1.0, 0.0, 1.0]),
    trace(1, true, &[0, 2], false, [0.0, 1.0, 1.0]),
    trace(0, false, &[1, 2], false, [-1.0, 0.0, 0.0]),
];

static HEXAHEDRON_TRACES: [TraceInfo; 6] = [
    trace(2, false, &[0, 1], false, [0.0, 0.0, -1.0]),
    trace(1, false, &[0, 2], false, [0.0, -1.0, 0.0]),
    trace(0, true, &[1, 2], false, [1.0, 0.0, 0.0]),
    trace(1, true, &[0, 2], false, [0.0, 1.0, 0.0]),
    trace(0, false, &[1, 2], false, [-1.0, 0.0, 0.0]),
    trace(2, true, &[0, 1], false, [0.0, 0.0, 1.0]),
];

impl ShapeType {
    pub const ALL: [ShapeType; 7] = [
        ShapeType::Segment,
        ShapeType::Triangle,
        ShapeType::Quadrilateral,
        ShapeType::Tetrahedron,
        ShapeType::Prism,
        ShapeType::Pyramid,
        ShapeType::Hexahedron,
    ];

    /// The reference dimension of the shape.
    pub fn dim(&self) -> usize {
        use ShapeType::*;
        match self {
            Segment => 1,
            Triangle | Quadrilateral => 2,
            Tetrahedron | Prism | Pyramid | Hexahedron => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.reference_vertices().len()
    }

    /// The number of traces, i.e. vertices of a segment, edges of a 2D shape or faces of a 3D shape.
    pub fn num_traces(&self) -> usize {
        self.traces().len()
    }

    /// Whether the shape is described with at least one collapsed coordinate direction.
    pub fn is_collapsed(&self) -> bool {
        use ShapeType::*;
        matches!(self, Triangle | Tetrahedron | Prism | Pyramid)
    }

    /// The reference vertices of the shape, padded with zeros to three components.
    pub fn reference_vertices(&self) -> &'static [[f64; 3]] {
        use ShapeType::*;
        match self {
            Segment => &[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            Triangle => &[[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]],
            Quadrilateral => &[[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
            Tetrahedron => &[[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0]],
            Prism => &[
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
                [-1.0, 1.0, 1.0],
            ],
            Pyramid => &[
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
            ],
            Hexahedron => &[
                [-1.0, -1.0, -1.0],
                [1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
                [1.0, -1.0, 1.0],
                [1.0, 1.0, 1.0],
                [-1.0, 1.0, 1.0],
            ],
        }
    }

    /// For each reference direction, the vertex reached from vertex 0 by moving along that direction.
    pub(crate) fn axis_vertices(&self) -> &'static [usize] {
        use ShapeType::*;
        match self {
            Segment => &[1],
            Triangle => &[1, 2],
            Quadrilateral => &[1, 3],
            Tetrahedron => &[1, 2, 3],
            Prism | Pyramid | Hexahedron => &[1, 3, 4],
        }
    }

    /// The volume (length, area) of the reference shape.
    pub fn reference_volume(&self) -> f64 {
        use ShapeType::*;
        match self {
            Segment => 2.0,
            Triangle => 2.0,
            Quadrilateral => 4.0,
            Tetrahedron => 4.0 / 3.0,
            Prism => 4.0,
            Pyramid => 8.0 / 3.0,
            Hexahedron => 8.0,
        }
    }

    /// Exponent $k$ of the factor $((1 - \eta_d) / 2)^k$ that the collapse contributes to the
    /// reference Jacobian in collapsed direction `d`.
    pub(crate) fn collapse_exponent(&self, dir: usize) -> i32 {
        use ShapeType::*;
        match (self, dir) {
            (Triangle, 1) => 1,
            (Tetrahedron, 1) => 1,
            (Tetrahedron, 2) => 2,
            (Prism, 2) => 1,
            (Pyramid, 2) => 2,
            _ => 0,
        }
    }

    /// Maps reference coordinates $\xi$ to collapsed coordinates $\eta$.
    pub fn collapse(&self, xi: &[f64]) -> [f64; 3] {
        use ShapeType::*;
        assert!(xi.len() >= self.dim(), "Reference point has too few components");
        let collapse = |num: f64, den: f64| {
            if den.abs() < COLLAPSE_TOLERANCE {
                -1.0
            } else {
                2.0 * num / den - 1.0
            }
        };
        match self {
            Segment => [xi[0], 0.0, 0.0],
            Quadrilateral => [xi[0], xi[1], 0.0],
            Hexahedron => [xi[0], xi[1], xi[2]],
            Triangle => [collapse(1.0 + xi[0], 1.0 - xi[1]), xi[1], 0.0],
            Tetrahedron => [
                collapse(1.0 + xi[0], -xi[1] - xi[2]),
                collapse(1.0 + xi[1], 1.0 - xi[2]),
                xi[2],
            ],
            Prism => [collapse(1.0 + xi[0], 1.0 - xi[2]), xi[1], xi[2]],
            Pyramid => [
                collapse(1.0 + xi[0], 1.0 - xi[2]),
                collapse(1.0 + xi[1], 1.0 - xi[2]),
                xi[2],
            ],
        }
    }

    /// Maps collapsed coordinates $\eta$ to reference coordinates $\xi$.
    pub fn uncollapse(&self, eta: &[f64]) -> [f64; 3] {
        use ShapeType::*;
        assert!(eta.len() >= self.dim(), "Collapsed point has too few components");
        match self {
            Segment => [eta[0], 0.0, 0.0],
            Quadrilateral => [eta[0], eta[1], 0.0],
            Hexahedron => [eta[0], eta[1], eta[2]],
            Triangle => [0.5 * (1.0 + eta[0]) * (1.0 - eta[1]) - 1.0, eta[1], 0.0],
            Tetrahedron => [
                0.25 * (1.0 + eta[0]) * (1.0 - eta[1]) * (1.0 - eta[2]) - 1.0,
                0.5 * (1.0 + eta[1]) * (1.0 - eta[2]) - 1.0,
                eta[2],
            ],
            Prism => [0.5 * (1.0 + eta[0]) * (1.0 - eta[2]) - 1.0, eta[1], eta[2]],
            Pyramid => [
                0.5 * (1.0 + eta[0]) * (1.0 - eta[2]) - 1.0,
                0.5 * (1.0 + eta[1]) * (1.0 - eta[2]) - 1.0,
                eta[2],
            ],
        }
    }

    /// The derivatives $\partial \eta_a / \partial \xi_j$ at the given collapsed point,
    /// stored as `m[a][j]`.
    pub fn collapse_jacobian(&self, eta: &[f64]) -> [[f64; 3]; 3] {
        use ShapeType::*;
        let mut m = [[0.0; 3]; 3];
        for d in 0..self.dim() {
            m[d][d] = 1.0;
        }
        // Reciprocal of (1 - eta), or zero on the collapsed vertex/edge
        let inv = |e: f64| {
            let den = 1.0 - e;
            if den.abs() < COLLAPSE_TOLERANCE {
                0.0
            } else {
                1.0 / den
            }
        };
        match self {
            Segment | Quadrilateral | Hexahedron => {}
            Triangle => {
                let r2 = inv(eta[1]);
                m[0][0] = 2.0 * r2;
                m[0][1] = (1.0 + eta[0]) * r2;
            }
            Tetrahedron => {
                let (r2, r3) = (inv(eta[1]), inv(eta[2]));
                m[0][0] = 4.0 * r2 * r3;
                m[0][1] = 2.0 * (1.0 + eta[0]) * r2 * r3;
                m[0][2] = m[0][1];
                m[1][1] = 2.0 * r3;
                m[1][2] = (1.0 + eta[1]) * r3;
            }
            Prism => {
                let r3 = inv(eta[2]);
                m[0][0] = 2.0 * r3;
                m[0][2] = (1.0 + eta[0]) * r3;
            }
            Pyramid => {
                let r3 = inv(eta[2]);
                m[0][0] = 2.0 * r3;
                m[1][1] = 2.0 * r3;
                m[0][2] = (1.0 + eta[0]) * r3;
                m[1][2] = (1.0 + eta[1]) * r3;
            }
        }
        m
    }

    /// Evaluates the linear (or multilinear) vertex functions at the given collapsed point.
    ///
    /// The functions form a partition of unity and reproduce all affine functions of $\xi$.
    pub fn vertex_functions(&self, eta: &[f64]) -> Vec<f64> {
        use ShapeType::*;
        let lo = |e: f64| 0.5 * (1.0 - e);
        let hi = |e: f64| 0.5 * (1.0 + e);
        match self {
            Segment => vec![lo(eta[0]), hi(eta[0])],
            Triangle => vec![lo(eta[0]) * lo(eta[1]), hi(eta[0]) * lo(eta[1]), hi(eta[1])],
            Quadrilateral => vec![
                lo(eta[0]) * lo(eta[1]),
                hi(eta[0]) * lo(eta[1]),
                hi(eta[0]) * hi(eta[1]),
                lo(eta[0]) * hi(eta[1]),
            ],
            Tetrahedron => vec![
                lo(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[1]) * lo(eta[2]),
                hi(eta[2]),
            ],
            Prism => vec![
                lo(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[0]) * hi(eta[1]) * lo(eta[2]),
                lo(eta[0]) * hi(eta[1]) * lo(eta[2]),
                lo(eta[1]) * hi(eta[2]),
                hi(eta[1]) * hi(eta[2]),
            ],
            Pyramid => vec![
                lo(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[0]) * lo(eta[1]) * lo(eta[2]),
                hi(eta[0]) * hi(eta[1]) * lo(eta[2]),
                lo(eta[0]) * hi(eta[1]) * lo(eta[2]),
                hi(eta[2]),
            ],
            Hexahedron => {
                let (x, y, z) = (eta[0], eta[1], eta[2]);
                vec![
                    lo(x) * lo(y) * lo(z),
                    hi(x) * lo(y) * lo(z),
                    hi(x) * hi(y) * lo(z),
                    lo(x) * hi(y) * lo(z),
                    lo(x) * lo(y) * hi(z),
                    hi(x) * lo(y) * hi(z),
                    hi(x) * hi(y) * hi(z),
                    lo(x) * hi(y) * hi(z),
                ]
            }
        }
    }

    /// Whether the reference point lies in the (closed) reference shape, up to the given tolerance.
    pub fn contains_reference_point(&self, xi: &[f64], tol: f64) -> bool {
        use ShapeType::*;
        let inside = |x: f64| x >= -1.0 - tol && x <= 1.0 + tol;
        match self {
            Segment => inside(xi[0]),
            Quadrilateral => inside(xi[0]) && inside(xi[1]),
            Hexahedron => inside(xi[0]) && inside(xi[1]) && inside(xi[2]),
            Triangle => xi[0] >= -1.0 - tol && xi[1] >= -1.0 - tol && xi[0] + xi[1] <= tol,
            Tetrahedron => {
                xi[0] >= -1.0 - tol && xi[1] >= -1.0 - tol && xi[2] >= -1.0 - tol && xi[0] + xi[1] + xi[2] <= -1.0 + tol
            }
            Prism => inside(xi[1]) && xi[0] >= -1.0 - tol && xi[2] >= -1.0 - tol && xi[0] + xi[2] <= tol,
            Pyramid => {
                xi[0] >= -1.0 - tol
                    && xi[1] >= -1.0 - tol
                    && xi[2] >= -1.0 - tol
                    && xi[0] + xi[2] <= tol
                    && xi[1] + xi[2] <= tol
            }
        }
    }

    pub(crate) fn traces(&self) -> &'static [TraceInfo] {
        use ShapeType::*;
        match self {
            Segment => &SEGMENT_TRACES,
            Triangle => &TRIANGLE_TRACES,
            Quadrilateral => &QUADRILATERAL_TRACES,
            Tetrahedron => &TETRAHEDRON_TRACES,
            Prism => &PRISM_TRACES,
            Pyramid => &PYRAMID_TRACES,
            Hexahedron => &HEXAHEDRON_TRACES,
        }
    }

    pub(crate) fn trace(&self, trace: usize) -> &'static TraceInfo {
        let traces = self.traces();
        assert!(
            trace < traces.len(),
            "Trace index {trace} out of bounds for {self} with {} traces",
            traces.len()
        );
        &traces[trace]
    }
}

impl Display for ShapeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeType::Segment => "segment",
            ShapeType::Triangle => "triangle",
            ShapeType::Quadrilateral => "quadrilateral",
            ShapeType::Tetrahedron => "tetrahedron",
            ShapeType::Prism => "prism",
            ShapeType::Pyramid => "pyramid",
            ShapeType::Hexahedron => "hexahedron",
        };
        write!(f, "{name}")
    }
}
