use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dmatrix, DMatrix};
use tmop::basis::TensorBasis;
use tmop::dispatch::KernelKey;
use tmop::KernelError;

#[test]
fn linear_basis_at_midpoint() {
    let basis = TensorBasis::<f64>::lagrange(2, 1).unwrap();
    assert_eq!(basis.dofs_1d(), 2);
    assert_eq!(basis.quad_1d(), 1);
    assert_eq!(basis.num_element_nodes(), 4);
    assert_eq!(basis.num_quadrature_points(), 1);
    assert_eq!(basis.key(), KernelKey::new(2, 1));

    assert_matrix_eq!(basis.values().clone(), dmatrix![0.5, 0.5], comp = abs, tol = 1e-14);
    assert_matrix_eq!(basis.derivatives().clone(), dmatrix![-1.0, 1.0], comp = abs, tol = 1e-14);
    assert_eq!(basis.weights().len(), 1);
    assert_scalar_eq!(basis.weights()[0], 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn lagrange_basis_is_partition_of_unity() {
    for dofs_1d in 2..=6 {
        for quad_1d in 1..=6 {
            let basis = TensorBasis::<f64>::lagrange(dofs_1d, quad_1d).unwrap();
            for q in 0..quad_1d {
                let value_sum: f64 = basis.values().row(q).sum();
                let derivative_sum: f64 = basis.derivatives().row(q).sum();
                assert_scalar_eq!(value_sum, 1.0, comp = abs, tol = 1e-12);
                assert_scalar_eq!(derivative_sum, 0.0, comp = abs, tol = 1e-11);
            }
            let weight_sum: f64 = basis.weights().iter().sum();
            assert_scalar_eq!(weight_sum, 1.0, comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn lagrange_basis_reproduces_linear_functions() {
    // Nodal values of f(x) = 3x - 1 on the nodes are reproduced exactly by the interpolant,
    // so the interpolated derivative is 3 at every quadrature point
    let basis = TensorBasis::<f64>::lagrange(4, 3).unwrap();
    let nodes = crate::reference_nodes(4);
    let f: Vec<f64> = nodes.iter().map(|x| 3.0 * x - 1.0).collect();
    let f = DMatrix::from_column_slice(4, 1, &f);
    let derivatives = basis.derivatives() * &f;
    assert_matrix_eq!(derivatives, DMatrix::repeat(3, 1, 3.0), comp = abs, tol = 1e-12);
}

#[test]
fn shape_gradients_sum_to_zero() {
    let basis = TensorBasis::<f64>::lagrange(3, 4).unwrap();
    for qy in 0..4 {
        for qx in 0..4 {
            let mut sum = [0.0, 0.0];
            for dy in 0..3 {
                for dx in 0..3 {
                    let gradient = basis.shape_gradient((dx, dy), (qx, qy));
                    sum[0] += gradient[0];
                    sum[1] += gradient[1];
                }
            }
            assert_scalar_eq!(sum[0], 0.0, comp = abs, tol = 1e-12);
            assert_scalar_eq!(sum[1], 0.0, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn lagrange_basis_rejects_invalid_sizes() {
    assert!(TensorBasis::<f64>::lagrange(1, 2).is_err());
    assert!(TensorBasis::<f64>::lagrange(0, 2).is_err());
    assert!(TensorBasis::<f64>::lagrange(2, 0).is_err());
}

#[test]
fn from_tables_validates_dimensions() {
    let b = dmatrix![0.5, 0.5];
    let g = dmatrix![-1.0, 1.0];
    assert!(TensorBasis::from_tables(b.clone(), g.clone(), vec![1.0]).is_ok());

    let error = TensorBasis::from_tables(b.clone(), g, vec![0.5, 0.5]).unwrap_err();
    assert_eq!(
        error,
        KernelError::DimensionMismatch {
            buffer: "quadrature weights",
            expected: 1,
            actual: 2
        }
    );

    let g = dmatrix![-1.0, 1.0, 0.0];
    let error = TensorBasis::from_tables(b, g, vec![1.0]).unwrap_err();
    assert!(matches!(error, KernelError::DimensionMismatch { expected: 2, actual: 3, .. }));
}

#[test]
fn lagrange_basis_in_single_precision() {
    let basis = TensorBasis::<f32>::lagrange(3, 2).unwrap();
    let value_sum: f32 = basis.values().row(0).sum();
    assert!((value_sum - 1.0).abs() < 1e-6);
}
