use crate::foundations::Points;
use crate::geometry::{GeomFactors, TraceOrientation};
use crate::local_regions::LocalExpansion;
use crate::shape::TraceInfo;
use crate::std_regions::kernels::interpolate_tensor;
use std::sync::Arc;

/// Indices of the points of a tensor grid with dimensions `dims` lying on the given trace, with
/// the first free direction running fastest.
fn trace_point_indices(trace: &TraceInfo, dims: [usize; 3]) -> Vec<usize> {
    let fixed = if trace.at_upper {
        dims[trace.fixed_dir] - 1
    } else {
        0
    };
    let strides = [1, dims[0], dims[0] * dims[1]];
    let free: Vec<usize> = trace.free_dirs.to_vec();
    let counts: Vec<usize> = free.iter().map(|&d| dims[d]).collect();
    let total: usize = counts.iter().product();
    (0..total)
        .map(|flat| {
            let mut index = fixed * strides[trace.fixed_dir];
            let mut rest = flat;
            for (&d, &n) in free.iter().zip(&counts) {
                index += (rest % n) * strides[d];
                rest /= n;
            }
            index
        })
        .collect()
}

/// Reverses the ordering of trace data along its first free direction.
fn reverse_along_first(values: &mut [f64], first_count: usize) {
    if first_count == 0 {
        return;
    }
    for row in values.chunks_mut(first_count) {
        row.reverse();
    }
}

impl LocalExpansion {
    /// Outward unit normals on the given trace, one array per physical coordinate.
    ///
    /// For regular elements each array holds a single value. For deformed elements the arrays
    /// hold one value per point of the trace, ordered along the trace with the first free
    /// direction running fastest, and reversed for traces that run against their canonical
    /// direction or that are oriented backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometric factors at the points of the coordinate map cannot be
    /// computed.
    pub fn trace_normals(&self, trace: usize) -> eyre::Result<Arc<Vec<Vec<f64>>>> {
        self.normals.get_or_try_insert_with(&trace, || {
            if self.factors.is_regular() {
                Ok(self.regular_normals(trace))
            } else {
                self.deformed_normals(trace)
            }
        })
    }

    /// Evaluates $\sum_j n^{ref}_j \, \partial \xi_j / \partial x_i$ for each coordinate `i`.
    fn unnormalized_normal(&self, factors: &GeomFactors, reference: &[f64; 3], q: usize) -> Vec<f64> {
        (0..self.coord_dim())
            .map(|i| {
                (0..self.dim())
                    .map(|j| reference[j] * GeomFactors::at(factors.deriv_factor(i, j), q))
                    .sum()
            })
            .collect()
    }

    fn regular_normals(&self, trace: usize) -> Vec<Vec<f64>> {
        let info = self.shape().trace(trace);
        let n = self.unnormalized_normal(&self.factors, &info.normal, 0);
        let norm = n.iter().map(|v| v * v).sum::<f64>().sqrt();
        n.iter().map(|v| vec![v / norm]).collect()
    }

    fn deformed_normals(&self, trace: usize) -> eyre::Result<Vec<Vec<f64>>> {
        let info = self.shape().trace(trace);
        let native = self.geometry.native_geom_factors()?;
        let xmap = self.geometry.xmap();
        let native_points = xmap.points();
        let dir_points = &native_points[info.fixed_dir];
        assert!(
            dir_points.contains_left_endpoint() && (!info.at_upper || dir_points.contains_right_endpoint()),
            "Coordinate map points do not include the trace"
        );

        // Scaled normals n J and the Jacobian on the trace points of the coordinate map
        let indices = trace_point_indices(info, xmap.points_per_direction());
        let mut scaled: Vec<Vec<f64>> = vec![Vec::with_capacity(indices.len()); self.coord_dim()];
        let mut jacobian = Vec::with_capacity(indices.len());
        for &q in &indices {
            let jac = GeomFactors::at(native.jacobian(), q);
            let n = self.unnormalized_normal(&native, &info.normal, q);
            for (s, v) in scaled.iter_mut().zip(n) {
                s.push(v * jac);
            }
            jacobian.push(jac);
        }

        // Interpolate from the trace points of the coordinate map to those of the expansion
        let target_points = self.std.points();
        let from: Vec<&Points> = info.free_dirs.iter().map(|&d| native_points[d]).collect();
        let to: Vec<&Points> = info.free_dirs.iter().map(|&d| target_points[d]).collect();
        let jacobian = interpolate_tensor(&jacobian, &from, &to);
        let mut normals: Vec<Vec<f64>> = scaled
            .iter()
            .map(|s| {
                interpolate_tensor(s, &from, &to)
                    .iter()
                    .zip(&jacobian)
                    .map(|(v, j)| v / j)
                    .collect()
            })
            .collect();

        let num_trace_points = jacobian.len();
        for q in 0..num_trace_points {
            let norm = normals.iter().map(|n| n[q] * n[q]).sum::<f64>().sqrt();
            normals.iter_mut().for_each(|n| n[q] /= norm);
        }

        let mut reversals = usize::from(info.reversed);
        if self.geometry.trace_orientation(trace) == TraceOrientation::Backwards {
            reversals += 1;
        }
        if reversals % 2 == 1 {
            let first_count = to.first().map_or(1, |p| p.num_points());
            normals
                .iter_mut()
                .for_each(|n| reverse_along_first(n, first_count));
        }
        Ok(normals)
    }
}
