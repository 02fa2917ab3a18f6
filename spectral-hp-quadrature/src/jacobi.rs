//! Jacobi polynomials $P_n^{(\alpha, \beta)}$ and their zeros, used to build Gauss-Jacobi rules.

use std::f64::consts::PI;

/// Maximum number of Newton iterations used when locating a single root.
const MAX_NEWTON_ITERATIONS: usize = 60;

/// Recurrence for the Jacobi polynomials $P_n^{(\alpha, \beta)}(x)$.
///
/// Unlike the plain Legendre recurrence, the derivative is computed from the identity
/// $\frac{d}{dx} P_n^{(\alpha, \beta)} = \frac{n + \alpha + \beta + 1}{2} P_{n-1}^{(\alpha+1, \beta+1)}$,
/// so it is well defined on the closed interval `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobiRecurrence {
    value: f64,
    derivative: f64,
}

impl JacobiRecurrence {
    pub fn evaluate(n: usize, alpha: f64, beta: f64, x: f64) -> Self {
        let value = jacobi(n, alpha, beta, x);
        let derivative = if n == 0 {
            0.0
        } else {
            0.5 * (n as f64 + alpha + beta + 1.0) * jacobi(n - 1, alpha + 1.0, beta + 1.0, x)
        };
        Self { value, derivative }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    pub fn value_and_derivative(&self) -> (f64, f64) {
        (self.value, self.derivative)
    }
}

/// Evaluates $P_n^{(\alpha, \beta)}(x)$ with the standard three-term recurrence.
pub fn jacobi(n: usize, alpha: f64, beta: f64, x: f64) -> f64 {
    let apb = alpha + beta;
    let mut p_prev = 1.0;
    if n == 0 {
        return p_prev;
    }
    let mut p = 0.5 * (alpha - beta + (apb + 2.0) * x);
    for k in 2..=n {
        let k = k as f64;
        let a1 = 2.0 * k * (k + apb) * (2.0 * k + apb - 2.0);
        let a2 = (2.0 * k + apb - 1.0) * (alpha * alpha - beta * beta);
        let a3 = (2.0 * k + apb - 2.0) * (2.0 * k + apb - 1.0) * (2.0 * k + apb);
        let a4 = 2.0 * (k + alpha - 1.0) * (k + beta - 1.0) * (2.0 * k + apb);
        let p_next = ((a2 + a3 * x) * p - a4 * p_prev) / a1;
        p_prev = p;
        p = p_next;
    }
    p
}

/// Computes the `n` zeros of $P_n^{(\alpha, \beta)}$ in ascending order.
///
/// Newton's method with polynomial deflation, started from Chebyshev points. Each new root is
/// started halfway between the Chebyshev guess and the previous root.
pub fn jacobi_zeros(n: usize, alpha: f64, beta: f64) -> Vec<f64> {
    let mut zeros: Vec<f64> = Vec::with_capacity(n);
    let dth = PI / (2.0 * n as f64);
    let mut r_last = 0.0;

    for k in 0..n {
        let mut r = -((2.0 * k as f64 + 1.0) * dth).cos();
        if k > 0 {
            r = 0.5 * (r + r_last);
        }

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (p, dp) = JacobiRecurrence::evaluate(n, alpha, beta, r).value_and_derivative();
            let deflation: f64 = zeros.iter().map(|z| 1.0 / (r - z)).sum();
            let delta = -p / (dp - deflation * p);
            r += delta;
            if delta.abs() < 1e-15 {
                break;
            }
        }

        zeros.push(r);
        r_last = r;
    }

    zeros
}
