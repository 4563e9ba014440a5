//! Test utilities shared by the `tmop` test suites.
use nalgebra::Matrix2;

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Approximates the gradient of `f: R^n -> R` at `x` with central differences of step `h`.
///
/// The vector `x` is mutable in order to hold perturbed states, but its content is restored
/// before returning.
pub fn approximate_gradient_fd(mut f: impl FnMut(&[f64]) -> f64, x: &mut [f64], h: f64) -> Vec<f64> {
    let mut df = vec![0.0; x.len()];
    for i in 0..x.len() {
        let x_i = x[i];
        x[i] = x_i + h;
        let f_plus = f(x);
        x[i] = x_i - h;
        let f_minus = f(x);
        x[i] = x_i;
        df[i] = (f_plus - f_minus) / (2.0 * h);
    }
    df
}

/// Approximates the derivative of `f: R^n -> R^m` at `x` in the given direction,
/// i.e. `(f(x + h d) - f(x - h d)) / 2h`.
pub fn approximate_directional_derivative_fd(
    mut f: impl FnMut(&[f64]) -> Vec<f64>,
    x: &[f64],
    direction: &[f64],
    h: f64,
) -> Vec<f64> {
    assert_eq!(x.len(), direction.len());
    let x_plus: Vec<_> = x.iter().zip(direction).map(|(x, d)| x + h * d).collect();
    let x_minus: Vec<_> = x.iter().zip(direction).map(|(x, d)| x - h * d).collect();
    let f_plus = f(&x_plus);
    let f_minus = f(&x_minus);
    assert_eq!(f_plus.len(), f_minus.len());
    f_plus
        .iter()
        .zip(&f_minus)
        .map(|(p, m)| (p - m) / (2.0 * h))
        .collect()
}

/// Approximates the derivative of a scalar function of a 2x2 matrix with respect to each entry.
pub fn approximate_matrix_derivative_fd(f: impl Fn(&Matrix2<f64>) -> f64, m: &Matrix2<f64>, h: f64) -> Matrix2<f64> {
    Matrix2::from_fn(|i, j| {
        let mut plus = *m;
        let mut minus = *m;
        plus[(i, j)] += h;
        minus[(i, j)] -= h;
        (f(&plus) - f(&minus)) / (2.0 * h)
    })
}

/// Approximates the derivative of a matrix-valued function of a 2x2 matrix with respect to
/// the entry `(i, j)`.
pub fn approximate_matrix_partial_fd(
    f: impl Fn(&Matrix2<f64>) -> Matrix2<f64>,
    m: &Matrix2<f64>,
    (i, j): (usize, usize),
    h: f64,
) -> Matrix2<f64> {
    let mut plus = *m;
    let mut minus = *m;
    plus[(i, j)] += h;
    minus[(i, j)] -= h;
    (f(&plus) - f(&minus)) / (2.0 * h)
}
