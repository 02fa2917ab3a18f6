//! Coefficient ordering and tensor-product structure of the reference expansions.
use crate::foundations::{triangular_index, BasisKey, BasisType};
use crate::shape::ShapeType;

/// The family of one-dimensional bases an expansion is built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum LayoutFamily {
    Modified,
    Orthogonal,
    Lagrange,
}

/// Mode indices and tensor-product terms of a reference expansion.
#[derive(Debug, Clone)]
pub(crate) struct ModeLayout {
    pub family: LayoutFamily,
    /// The mode index `(p, q, r)` of every coefficient.
    pub modes: Vec<[usize; 3]>,
    /// Products `(coeff, [a, b, c])` of one-dimensional table columns.
    pub terms: Vec<(usize, [usize; 3])>,
    pub num_modes: [usize; 3],
}

fn family_of(shape: ShapeType, keys: &[BasisKey]) -> LayoutFamily {
    let types: Vec<BasisType> = keys.iter().map(BasisKey::basis_type).collect();
    let expected: Option<(LayoutFamily, Vec<BasisType>)> = if types.iter().all(|t| t.is_modified()) {
        use BasisType::*;
        let expected = match shape {
            ShapeType::Triangle => vec![ModifiedA, ModifiedB],
            ShapeType::Tetrahedron => vec![ModifiedA, ModifiedB, ModifiedC],
            ShapeType::Prism => vec![ModifiedA, ModifiedA, ModifiedB],
            ShapeType::Pyramid => panic!("Modified pyramid expansions are not implemented, use orthogonal bases"),
            _ => vec![ModifiedA; shape.dim()],
        };
        Some((LayoutFamily::Modified, expected))
    } else if types.iter().all(|t| t.is_orthogonal()) {
        use BasisType::*;
        let expected = match shape {
            ShapeType::Triangle => vec![OrthoA, OrthoB],
            ShapeType::Tetrahedron => vec![OrthoA, OrthoB, OrthoC],
            ShapeType::Prism => vec![OrthoA, OrthoA, OrthoB],
            ShapeType::Pyramid => vec![OrthoA, OrthoA, OrthoC],
            _ => vec![OrthoA; shape.dim()],
        };
        Some((LayoutFamily::Orthogonal, expected))
    } else if types.iter().all(|t| *t == BasisType::GllLagrange) {
        assert!(
            !shape.is_collapsed(),
            "Lagrange bases are not implemented for the {shape} expansion"
        );
        Some((LayoutFamily::Lagrange, types.clone()))
    } else {
        None
    };

    match expected {
        Some((family, expected)) if expected == types => family,
        _ => panic!("Unsupported basis combination {types:?} for {shape} expansion"),
    }
}

impl ModeLayout {
    /// Determines the coefficient layout of the given shape and basis keys.
    ///
    /// # Panics
    ///
    /// Panics if the basis types do not form a supported combination for the shape, or if the
    /// mode counts violate the ordering required by the collapsed directions.
    pub fn new(shape: ShapeType, keys: &[BasisKey]) -> Self {
        assert_eq!(
            keys.len(),
            shape.dim(),
            "{shape} expansion needs {} basis keys",
            shape.dim()
        );
        let family = family_of(shape, keys);
        let mut n = [1; 3];
        for (d, key) in keys.iter().enumerate() {
            n[d] = key.num_modes();
        }
        let [na, nb, nc] = n;
        let modified = family == LayoutFamily::Modified;

        let mut modes = Vec::new();
        let mut terms = Vec::new();
        let mut push = |mode: [usize; 3], index: [usize; 3]| {
            terms.push((modes.len(), index));
            modes.push(mode);
        };

        match shape {
            ShapeType::Segment => (0..na).for_each(|p| push([p, 0, 0], [p, 0, 0])),
            ShapeType::Quadrilateral => {
                for q in 0..nb {
                    for p in 0..na {
                        push([p, q, 0], [p, q, 0]);
                    }
                }
            }
            ShapeType::Hexahedron => {
                for r in 0..nc {
                    for q in 0..nb {
                        for p in 0..na {
                            push([p, q, r], [p, q, r]);
                        }
                    }
                }
            }
            ShapeType::Triangle => {
                assert!(na <= nb, "Triangle expansion requires na <= nb, got {na} > {nb}");
                for p in 0..na {
                    for q in 0..(nb - p) {
                        push([p, q, 0], [p, triangular_index(nb, p, q), 0]);
                    }
                }
            }
            ShapeType::Tetrahedron => {
                assert!(
                    na <= nb && nb <= nc,
                    "Tetrahedron expansion requires na <= nb <= nc, got ({na}, {nb}, {nc})"
                );
                for p in 0..na {
                    for q in 0..(nb - p) {
                        for r in 0..(nc - p - q) {
                            push(
                                [p, q, r],
                                [p, triangular_index(nb, p, q), triangular_index(nc, p + q, r)],
                            );
                        }
                    }
                }
            }
            ShapeType::Prism => {
                assert!(na <= nc, "Prism expansion requires na <= nc, got {na} > {nc}");
                for p in 0..na {
                    for q in 0..nb {
                        for r in 0..(nc - p) {
                            push([p, q, r], [p, q, triangular_index(nc, p, r)]);
                        }
                    }
                }
            }
            ShapeType::Pyramid => {
                assert!(
                    na <= nc && nb <= nc,
                    "Pyramid expansion requires na <= nc and nb <= nc, got ({na}, {nb}, {nc})"
                );
                for p in 0..na {
                    for q in 0..nb {
                        for r in 0..nc.saturating_sub(p + q) {
                            push([p, q, r], [p, q, triangular_index(nc, p + q, r)]);
                        }
                    }
                }
            }
        }

        let mut layout = Self {
            family,
            modes,
            terms,
            num_modes: n,
        };
        if modified {
            layout.add_singular_vertex_terms(shape);
        }
        layout
    }

    /// Returns the coefficient index of the given mode, if the expansion has it.
    pub fn coeff_of(&self, mode: [usize; 3]) -> Option<usize> {
        self.modes.iter().position(|m| *m == mode)
    }

    /// Adds the extra products that make the modified bases continuous at collapsed vertices.
    fn add_singular_vertex_terms(&mut self, shape: ShapeType) {
        let [na, nb, nc] = self.num_modes;
        if na < 2 {
            // Constant expansions have no vertex modes to fix
            return;
        }
        let mut extra = Vec::new();
        match shape {
            ShapeType::Triangle => {
                if let Some(m) = self.coeff_of([0, 1, 0]) {
                    extra.push((m, [1, triangular_index(nb, 0, 1), 0]));
                }
            }
            ShapeType::Tetrahedron => {
                let b01 = triangular_index(nb, 0, 1);
                if let Some(m) = self.coeff_of([0, 0, 1]) {
                    let c = triangular_index(nc, 0, 1);
                    extra.push((m, [1, triangular_index(nb, 1, 0), c]));
                    extra.push((m, [0, b01, c]));
                    extra.push((m, [1, b01, c]));
                }
                for r in 0..nc - 1 {
                    if let Some(m) = self.coeff_of([0, 1, r]) {
                        extra.push((m, [1, b01, triangular_index(nc, 1, r)]));
                    }
                }
            }
            ShapeType::Prism => {
                for q in 0..self.num_modes[1] {
                    if let Some(m) = self.coeff_of([0, q, 1]) {
                        extra.push((m, [1, q, triangular_index(nc, 0, 1)]));
                    }
                }
            }
            _ => {}
        }
        self.terms.extend(extra);
    }

    /// Whether the modes split into vertex, boundary and interior modes.
    pub fn has_boundary_decomposition(&self, shape: ShapeType) -> bool {
        self.family != LayoutFamily::Orthogonal && shape != ShapeType::Pyramid
    }

    /// Whether the mode with the given coefficient index is nonzero on the element boundary.
    ///
    /// # Panics
    ///
    /// Panics for orthogonal expansions, which have no boundary/interior decomposition.
    pub fn is_boundary_mode(&self, shape: ShapeType, m: usize) -> bool {
        let [p, q, r] = self.modes[m];
        let [na, nb, nc] = self.num_modes;
        match self.family {
            LayoutFamily::Orthogonal => {
                panic!("Boundary/interior decomposition is not implemented for orthogonal {shape} expansions")
            }
            LayoutFamily::Lagrange => {
                let edge = |i: usize, n: usize| i == 0 || i == n - 1;
                match shape.dim() {
                    1 => edge(p, na),
                    2 => edge(p, na) || edge(q, nb),
                    _ => edge(p, na) || edge(q, nb) || edge(r, nc),
                }
            }
            LayoutFamily::Modified => match shape {
                ShapeType::Segment => p <= 1,
                ShapeType::Quadrilateral => p <= 1 || q <= 1,
                ShapeType::Hexahedron => p <= 1 || q <= 1 || r <= 1,
                ShapeType::Triangle => p <= 1 || q == 0,
                ShapeType::Tetrahedron => !(p >= 2 && q >= 1 && r >= 1),
                ShapeType::Prism => !(p >= 2 && q >= 2 && r >= 1),
                ShapeType::Pyramid => panic!("Boundary/interior decomposition is not implemented for pyramids"),
            },
        }
    }

    /// The mode index of the given vertex.
    pub fn vertex_mode(&self, shape: ShapeType, vertex: usize) -> [usize; 3] {
        assert!(
            vertex < shape.num_vertices(),
            "Vertex {vertex} out of bounds for {shape}"
        );
        if self.family == LayoutFamily::Orthogonal || shape == ShapeType::Pyramid {
            panic!("Vertex modes are not implemented for orthogonal {shape} expansions");
        }
        // Index of the "upper" end mode in each direction
        let hi = |d: usize| match self.family {
            LayoutFamily::Lagrange => self.num_modes[d] - 1,
            _ => 1,
        };
        match shape {
            ShapeType::Triangle => [[0, 0, 0], [1, 0, 0], [0, 1, 0]][vertex],
            ShapeType::Tetrahedron => [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]][vertex],
            ShapeType::Prism => [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0], [0, 0, 1], [0, 1, 1]][vertex],
            _ => {
                let xi = shape.reference_vertices()[vertex];
                let mut mode = [0; 3];
                for d in 0..shape.dim() {
                    if xi[d] > 0.0 {
                        mode[d] = hi(d);
                    }
                }
                mode
            }
        }
    }
}
