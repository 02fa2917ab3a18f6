//! Barycentric Lagrange interpolation through a set of distinct one-dimensional nodes.
use nalgebra::DMatrix;

/// Computes the barycentric weights $b_j = 1 / \prod_{k \neq j} (x_j - x_k)$.
pub fn barycentric_weights(nodes: &[f64]) -> Vec<f64> {
    nodes
        .iter()
        .enumerate()
        .map(|(j, xj)| {
            let prod: f64 = nodes
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != j)
                .map(|(_, xk)| xj - xk)
                .product();
            1.0 / prod
        })
        .collect()
}

/// Evaluates all Lagrange polynomials through `nodes` at `x`.
pub fn lagrange_basis_at(nodes: &[f64], weights: &[f64], x: f64) -> Vec<f64> {
    assert_eq!(nodes.len(), weights.len());
    if let Some(k) = nodes.iter().position(|xk| (x - xk).abs() < 1e-15) {
        let mut values = vec![0.0; nodes.len()];
        values[k] = 1.0;
        return values;
    }

    let mut values: Vec<f64> = nodes.iter().zip(weights).map(|(xj, bj)| bj / (x - xj)).collect();
    let sum: f64 = values.iter().sum();
    for v in &mut values {
        *v /= sum;
    }
    values
}

/// The matrix mapping nodal values to values at `targets`.
///
/// The result has dimensions `targets.len() x nodes.len()`.
pub fn interpolation_matrix(nodes: &[f64], weights: &[f64], targets: &[f64]) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(targets.len(), nodes.len());
    for (i, &x) in targets.iter().enumerate() {
        let row = lagrange_basis_at(nodes, weights, x);
        for (j, value) in row.into_iter().enumerate() {
            matrix[(i, j)] = value;
        }
    }
    matrix
}

/// The matrix mapping nodal values to values of the derivative of the interpolant at the nodes.
///
/// Uses the "negative sum trick" for the diagonal, so that the derivative of a constant is
/// exactly zero.
pub fn differentiation_matrix(nodes: &[f64], weights: &[f64]) -> DMatrix<f64> {
    let n = nodes.len();
    let mut d = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut diagonal = 0.0;
        for j in 0..n {
            if i != j {
                let entry = (weights[j] / weights[i]) / (nodes[i] - nodes[j]);
                d[(i, j)] = entry;
                diagonal -= entry;
            }
        }
        d[(i, i)] = diagonal;
    }
    d
}
