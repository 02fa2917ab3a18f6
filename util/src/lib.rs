use nalgebra::DMatrix;

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::panic::AssertUnwindSafe;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Deterministic pseudo-random values in `[-1, 1]`.
///
/// Tests use this instead of a random number generator so that failures are reproducible.
pub fn pseudo_random_values(n: usize, seed: u64) -> Vec<f64> {
    // Numerical Recipes LCG constants
    let mut state = seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            2.0 * unit - 1.0
        })
        .collect()
}

/// The `i`-th standard basis vector of length `n`.
pub fn unit_vector(n: usize, i: usize) -> Vec<f64> {
    let mut e = vec![0.0; n];
    e[i] = 1.0;
    e
}

/// Builds a dense matrix column by column by applying `op` to each standard basis vector.
pub fn matrix_from_operator(ncols: usize, mut op: impl FnMut(&[f64]) -> Vec<f64>) -> DMatrix<f64> {
    let columns: Vec<Vec<f64>> = (0..ncols).map(|j| op(&unit_vector(ncols, j))).collect();
    let nrows = columns.first().map(Vec::len).unwrap_or(0);
    DMatrix::from_fn(nrows, ncols, |i, j| columns[j][i])
}
