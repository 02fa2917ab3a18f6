//! Sum-factorization kernels for backward transforms and inner products.
//!
//! A reference expansion with coefficients $\hat u_m$ evaluates to
//!
//! $$ u(\eta_i, \eta_j, \eta_k) = \sum_m \hat u_m \, A_{a(m)}(\eta_i) B_{b(m)}(\eta_j) C_{c(m)}(\eta_k), $$
//!
//! where `a`, `b` and `c` are column indices into the tabulated one-dimensional bases. A mode may
//! contribute several such products (this is how the singular vertex modes of collapsed bases are
//! made continuous). Grouping the products by `a` (and then by `b`) allows each operation to be
//! applied as a sequence of one-dimensional contractions.
use crate::foundations::Points;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use nalgebra::DMatrix;
use std::collections::BTreeMap;

define_thread_local_workspace!(KERNEL_WORKSPACE);

#[derive(Debug, Default)]
struct KernelBuffers {
    g: Vec<f64>,
    h: Vec<f64>,
}

/// Products `(coeff, c)` sharing the same `a` and `b` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VolumePair {
    pub b: usize,
    pub terms: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VolumeRow {
    pub a: usize,
    pub pairs: Vec<VolumePair>,
}

/// Products `(coeff, b)` sharing the same `a` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SurfaceRow {
    pub a: usize,
    pub terms: Vec<(usize, usize)>,
}

/// The grouped tensor-product structure of an expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Contraction {
    /// Products `(coeff, a)`.
    Line(Vec<(usize, usize)>),
    Surface(Vec<SurfaceRow>),
    Volume(Vec<VolumeRow>),
}

fn column(matrix: &DMatrix<f64>, j: usize) -> &[f64] {
    let n = matrix.nrows();
    &matrix.as_slice()[j * n..(j + 1) * n]
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Contraction {
    /// Groups the products `(coeff, [a, b, c])` by their leading column indices.
    pub fn from_terms(dim: usize, terms: &[(usize, [usize; 3])]) -> Self {
        match dim {
            1 => Contraction::Line(terms.iter().map(|&(m, idx)| (m, idx[0])).collect()),
            2 => {
                let mut rows: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
                for &(m, idx) in terms {
                    rows.entry(idx[0]).or_default().push((m, idx[1]));
                }
                Contraction::Surface(
                    rows.into_iter()
                        .map(|(a, terms)| SurfaceRow { a, terms })
                        .collect(),
                )
            }
            3 => {
                let mut rows: BTreeMap<usize, BTreeMap<usize, Vec<(usize, usize)>>> = BTreeMap::new();
                for &(m, idx) in terms {
                    rows.entry(idx[0])
                        .or_default()
                        .entry(idx[1])
                        .or_default()
                        .push((m, idx[2]));
                }
                Contraction::Volume(
                    rows.into_iter()
                        .map(|(a, pairs)| VolumeRow {
                            a,
                            pairs: pairs
                                .into_iter()
                                .map(|(b, terms)| VolumePair { b, terms })
                                .collect(),
                        })
                        .collect(),
                )
            }
            _ => panic!("Unsupported expansion dimension {dim}"),
        }
    }

    /// Evaluates the expansion with the given coefficients at the tensor grid of the tables.
    ///
    /// `tables[d]` holds the basis (or basis derivative) values in direction `d`, one row per point.
    pub fn bwd(&self, tables: &[&DMatrix<f64>], coeffs: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        match self {
            Contraction::Line(terms) => {
                for &(m, a) in terms {
                    let c = coeffs[m];
                    for (o, v) in out.iter_mut().zip(column(tables[0], a)) {
                        *o += c * v;
                    }
                }
            }
            Contraction::Surface(rows) => {
                let (n0, n1) = (tables[0].nrows(), tables[1].nrows());
                assert_eq!(out.len(), n0 * n1);
                with_thread_local_workspace(&KERNEL_WORKSPACE, |buffers: &mut KernelBuffers| {
                    let g = &mut buffers.g;
                    for row in rows {
                        g.clear();
                        g.resize(n1, 0.0);
                        for &(m, b) in &row.terms {
                            let c = coeffs[m];
                            if c != 0.0 {
                                for (gj, bj) in g.iter_mut().zip(column(tables[1], b)) {
                                    *gj += c * bj;
                                }
                            }
                        }
                        let a_col = column(tables[0], row.a);
                        for (j, &gj) in g.iter().enumerate() {
                            if gj != 0.0 {
                                for (o, ai) in out[n0 * j..n0 * (j + 1)].iter_mut().zip(a_col) {
                                    *o += ai * gj;
                                }
                            }
                        }
                    }
                });
            }
            Contraction::Volume(rows) => {
                let (n0, n1, n2) = (tables[0].nrows(), tables[1].nrows(), tables[2].nrows());
                assert_eq!(out.len(), n0 * n1 * n2);
                with_thread_local_workspace(&KERNEL_WORKSPACE, |buffers: &mut KernelBuffers| {
                    let KernelBuffers { g, h } = buffers;
                    for row in rows {
                        g.clear();
                        g.resize(n1 * n2, 0.0);
                        for pair in &row.pairs {
                            h.clear();
                            h.resize(n2, 0.0);
                            for &(m, c) in &pair.terms {
                                let coeff = coeffs[m];
                                if coeff != 0.0 {
                                    for (hk, ck) in h.iter_mut().zip(column(tables[2], c)) {
                                        *hk += coeff * ck;
                                    }
                                }
                            }
                            let b_col = column(tables[1], pair.b);
                            for (k, &hk) in h.iter().enumerate() {
                                for (gjk, bj) in g[n1 * k..n1 * (k + 1)].iter_mut().zip(b_col) {
                                    *gjk += bj * hk;
                                }
                            }
                        }
                        let a_col = column(tables[0], row.a);
                        for (jk, &gjk) in g.iter().enumerate() {
                            if gjk != 0.0 {
                                for (o, ai) in out[n0 * jk..n0 * (jk + 1)].iter_mut().zip(a_col) {
                                    *o += ai * gjk;
                                }
                            }
                        }
                    }
                });
            }
        }
    }

    /// Computes the inner products of the (already weighted) input with every mode.
    pub fn iproduct(&self, tables: &[&DMatrix<f64>], input: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        match self {
            Contraction::Line(terms) => {
                for &(m, a) in terms {
                    out[m] += dot(column(tables[0], a), input);
                }
            }
            Contraction::Surface(rows) => {
                let (n0, n1) = (tables[0].nrows(), tables[1].nrows());
                assert_eq!(input.len(), n0 * n1);
                with_thread_local_workspace(&KERNEL_WORKSPACE, |buffers: &mut KernelBuffers| {
                    let h = &mut buffers.h;
                    for row in rows {
                        let a_col = column(tables[0], row.a);
                        h.clear();
                        h.extend((0..n1).map(|j| dot(a_col, &input[n0 * j..n0 * (j + 1)])));
                        for &(m, b) in &row.terms {
                            out[m] += dot(column(tables[1], b), h);
                        }
                    }
                });
            }
            Contraction::Volume(rows) => {
                let (n0, n1, n2) = (tables[0].nrows(), tables[1].nrows(), tables[2].nrows());
                assert_eq!(input.len(), n0 * n1 * n2);
                with_thread_local_workspace(&KERNEL_WORKSPACE, |buffers: &mut KernelBuffers| {
                    let KernelBuffers { g, h } = buffers;
                    for row in rows {
                        let a_col = column(tables[0], row.a);
                        g.clear();
                        g.extend((0..n1 * n2).map(|jk| dot(a_col, &input[n0 * jk..n0 * (jk + 1)])));
                        for pair in &row.pairs {
                            let b_col = column(tables[1], pair.b);
                            h.clear();
                            h.extend((0..n2).map(|k| dot(b_col, &g[n1 * k..n1 * (k + 1)])));
                            for &(m, c) in &pair.terms {
                                out[m] += dot(column(tables[2], c), h);
                            }
                        }
                    }
                });
            }
        }
    }
}

/// Applies the operator `op` along direction `dir` of tensor-grid data with the given dimensions.
///
/// `op` maps `dims[dir]` values to `op.nrows()` values. Returns the new data together with its
/// dimensions.
pub(crate) fn tensor_apply(u: &[f64], dims: [usize; 3], dir: usize, op: &DMatrix<f64>) -> (Vec<f64>, [usize; 3]) {
    assert_eq!(u.len(), dims.iter().product::<usize>(), "Data does not match grid dimensions");
    assert_eq!(op.ncols(), dims[dir], "Operator does not match grid dimension");
    let strides = [1, dims[0], dims[0] * dims[1]];
    let mut out_dims = dims;
    out_dims[dir] = op.nrows();

    let mut out = Vec::with_capacity(out_dims.iter().product());
    for k in 0..out_dims[2] {
        for j in 0..out_dims[1] {
            for i in 0..out_dims[0] {
                let mut idx = [i, j, k];
                let target = idx[dir];
                idx[dir] = 0;
                let base = idx[0] + dims[0] * (idx[1] + dims[1] * idx[2]);
                let value: f64 = (0..dims[dir])
                    .map(|l| op[(target, l)] * u[base + l * strides[dir]])
                    .sum();
                out.push(value);
            }
        }
    }
    (out, out_dims)
}

/// Interpolates tensor-grid data between two tensor products of one-dimensional point sets.
pub(crate) fn interpolate_tensor(u: &[f64], from: &[&Points], to: &[&Points]) -> Vec<f64> {
    assert_eq!(from.len(), to.len(), "Point sets must have the same dimension");
    let mut dims = [1; 3];
    for (d, points) in from.iter().enumerate() {
        dims[d] = points.num_points();
    }
    let mut data = u.to_vec();
    for d in 0..from.len() {
        if from[d].key() != to[d].key() {
            let op = from[d].interpolation_matrix_to(to[d].z());
            let (next, next_dims) = tensor_apply(&data, dims, d, &op);
            data = next;
            dims = next_dims;
        }
    }
    data
}
