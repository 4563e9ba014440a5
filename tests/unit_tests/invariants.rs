use matrixcompare::{assert_scalar_eq, prop_assert_matrix_eq};
use nalgebra::{matrix, Matrix2};
use proptest::prelude::*;
use tmop::invariants::{
    d2_det, d2_metric, d_det, d_metric, frobenius_norm_squared, metric, shape_energy_density, shape_energy_gradient,
};
use util::{approximate_matrix_derivative_fd, approximate_matrix_partial_fd};

/// Matrices with entries in [-2, 2] that are safely away from being singular.
fn nonsingular_matrix() -> impl Strategy<Value = Matrix2<f64>> {
    [-2.0..=2.0f64, -2.0..=2.0, -2.0..=2.0, -2.0..=2.0]
        .prop_map(|[a, b, c, d]| matrix![a, b; c, d])
        .prop_filter("Matrix must be far from singular", |m| m.determinant().abs() > 0.25)
}

fn fd_tolerance(reference: &Matrix2<f64>) -> f64 {
    1e-6 * (1.0 + reference.amax())
}

#[test]
fn frobenius_norm_squared_sums_squared_entries() {
    let m = matrix![1.0, -2.0; 3.0, 0.5];
    assert_scalar_eq!(frobenius_norm_squared(&m), 14.25, comp = abs, tol = 1e-14);
}

#[test]
fn metric_of_identity_is_two() {
    assert_eq!(metric(&Matrix2::<f64>::identity()), 2.0);
    assert_eq!(shape_energy_density(&Matrix2::<f64>::identity()), 0.0);
}

#[test]
fn metric_of_shear() {
    // |M|^2 = 1 + 1 + 1 = 3, det = 1
    let m = matrix![1.0, 1.0; 0.0, 1.0];
    assert_scalar_eq!(metric(&m), 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(shape_energy_density(&m), 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn d2_det_panics_out_of_bounds() {
    util::assert_panics!(d2_det::<f64>(2, 0));
    util::assert_panics!(d2_det::<f64>(0, 2));
}

proptest! {
    #[test]
    fn d_det_is_derivative_of_det(m in nonsingular_matrix()) {
        let fd = approximate_matrix_derivative_fd(|m| m.determinant(), &m, 1e-6);
        prop_assert_matrix_eq!(d_det(&m), fd, comp = abs, tol = 1e-8);
    }

    #[test]
    fn d2_det_is_derivative_of_d_det(m in nonsingular_matrix(), i in 0..2usize, j in 0..2usize) {
        let fd = approximate_matrix_partial_fd(d_det::<f64>, &m, (i, j), 1e-6);
        prop_assert_matrix_eq!(d2_det::<f64>(i, j), fd, comp = abs, tol = 1e-8);
    }

    #[test]
    fn d_metric_is_derivative_of_metric(m in nonsingular_matrix()) {
        let analytic = d_metric(&m);
        let fd = approximate_matrix_derivative_fd(metric::<f64>, &m, 1e-6);
        prop_assert_matrix_eq!(analytic, fd, comp = abs, tol = fd_tolerance(&analytic));
    }

    #[test]
    fn d2_metric_is_derivative_of_d_metric(m in nonsingular_matrix(), i in 0..2usize, j in 0..2usize) {
        let analytic = d2_metric(&m, i, j);
        let fd = approximate_matrix_partial_fd(d_metric::<f64>, &m, (i, j), 1e-6);
        prop_assert_matrix_eq!(analytic, fd, comp = abs, tol = fd_tolerance(&analytic));
    }

    #[test]
    fn d2_metric_has_symmetric_mixed_partials(m in nonsingular_matrix(), i in 0..2usize, j in 0..2usize) {
        let d2_ij = d2_metric(&m, i, j);
        let tol = 1e-10 * (1.0 + d2_ij.amax());
        for r in 0..2 {
            for c in 0..2 {
                let d2_rc = d2_metric(&m, r, c);
                prop_assert!((d2_ij[(r, c)] - d2_rc[(i, j)]).abs() <= tol);
            }
        }
    }

    #[test]
    fn metric_is_scale_invariant(m in nonsingular_matrix(), s in 0.1..10.0f64) {
        let expected = metric(&m);
        let tol = 1e-12 * (1.0 + expected.abs());
        prop_assert!((metric(&(m * s)) - expected).abs() <= tol);
        prop_assert!((metric(&(m * -s)) - expected).abs() <= tol);
    }

    #[test]
    fn shape_energy_gradient_is_derivative_of_density(m in nonsingular_matrix()) {
        let analytic = shape_energy_gradient(&m);
        let fd = approximate_matrix_derivative_fd(shape_energy_density::<f64>, &m, 1e-6);
        prop_assert_matrix_eq!(analytic, fd, comp = abs, tol = fd_tolerance(&analytic));
    }
}
