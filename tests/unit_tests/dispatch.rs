use nalgebra::{matrix, Matrix2};
use tmop::basis::TensorBasis;
use tmop::dispatch::{apply_hessian, lookup, setup_hessian, supported_kernel_keys, KernelKey, SUPPORTED_KERNELS};
use tmop::kernels::KernelContext;
use tmop::layout::{CoefficientTensor, ElementFieldLayout};
use tmop::{KernelConfig, KernelError};

#[test]
fn supported_keys_cover_all_combinations() {
    let keys: Vec<_> = supported_kernel_keys().collect();
    assert_eq!(keys.len(), 20);
    assert_eq!(keys, SUPPORTED_KERNELS);
    for dofs_1d in 2..=5 {
        for quad_1d in 1..=5 {
            let key = KernelKey::new(dofs_1d, quad_1d);
            assert!(key.is_supported());
            assert!(lookup::<f64>(key).is_ok());
            assert!(lookup::<f32>(key).is_ok());
        }
    }
}

#[test]
fn unsupported_keys_are_rejected() {
    for (dofs_1d, quad_1d) in [(1, 1), (6, 3), (3, 6), (2, 0), (0, 0), (8, 8)] {
        let key = KernelKey::new(dofs_1d, quad_1d);
        assert!(!key.is_supported());
        let error = lookup::<f64>(key).unwrap_err();
        assert_eq!(error, KernelError::UnsupportedConfiguration { dofs_1d, quad_1d });
    }
}

#[test]
fn kernel_key_display() {
    assert_eq!(KernelKey::new(3, 4).to_string(), "(D1D = 3, Q1D = 4)");
}

#[test]
fn unsupported_configuration_never_writes_output() {
    let basis = TensorBasis::<f64>::lagrange(6, 3).unwrap();
    let num_elements = 2;
    let context = KernelContext::new(&basis, Matrix2::identity(), num_elements, &KernelConfig::default()).unwrap();
    let layout = ElementFieldLayout::new(6, num_elements);
    let x = crate::distorted_positions(&basis, num_elements);
    let r = crate::trial_field(layout.len(), 0.3);

    let mut p = CoefficientTensor::zeros(3, num_elements);
    let error = setup_hessian(&context, &x, &mut p).unwrap_err();
    assert_eq!(error, KernelError::UnsupportedConfiguration { dofs_1d: 6, quad_1d: 3 });
    assert!(p.as_slice().iter().all(|&p| p == 0.0));

    let mut y = vec![7.0; layout.len()];
    let error = apply_hessian(&context, &p, &r, &mut y).unwrap_err();
    assert_eq!(error, KernelError::UnsupportedConfiguration { dofs_1d: 6, quad_1d: 3 });
    assert!(y.iter().all(|&y| y == 7.0));
}

#[test]
fn dimension_mismatch_never_writes_output() {
    let basis = TensorBasis::<f64>::lagrange(3, 3).unwrap();
    let num_elements = 3;
    let context = KernelContext::new(&basis, Matrix2::identity(), num_elements, &KernelConfig::default()).unwrap();
    let layout = ElementFieldLayout::new(3, num_elements);
    let x = crate::distorted_positions(&basis, num_elements);

    let mut p = CoefficientTensor::zeros(3, num_elements);
    setup_hessian(&context, &x, &mut p).unwrap();

    let r = crate::trial_field(layout.len() - 1, 0.3);
    let mut y = vec![7.0; layout.len()];
    let error = apply_hessian(&context, &p, &r, &mut y).unwrap_err();
    assert_eq!(
        error,
        KernelError::DimensionMismatch {
            buffer: "trial field",
            expected: layout.len(),
            actual: layout.len() - 1
        }
    );
    assert!(y.iter().all(|&y| y == 7.0));

    let r = crate::trial_field(layout.len(), 0.3);
    let wrong_p = CoefficientTensor::zeros(2, num_elements);
    let error = apply_hessian(&context, &wrong_p, &r, &mut y).unwrap_err();
    assert!(matches!(error, KernelError::DimensionMismatch { .. }));
    assert!(y.iter().all(|&y| y == 7.0));

    let mut wrong_p = CoefficientTensor::zeros(3, num_elements + 1);
    let error = setup_hessian(&context, &x, &mut wrong_p).unwrap_err();
    assert!(matches!(error, KernelError::DimensionMismatch { .. }));
    assert!(wrong_p.as_slice().iter().all(|&p| p == 0.0));
}

#[test]
fn context_validates_reference_jacobian() {
    let basis = TensorBasis::<f64>::lagrange(2, 2).unwrap();
    let config = KernelConfig::default();

    let singular = matrix![1.0, 2.0; 2.0, 4.0];
    let error = KernelContext::new(&basis, singular, 1, &config).unwrap_err();
    assert!(matches!(error, KernelError::DegenerateReferenceJacobian { .. }));

    let scaled = Matrix2::identity() * 2.0;
    let error = KernelContext::new(&basis, scaled, 1, &config).unwrap_err();
    assert_eq!(error, KernelError::NonUnitReferenceJacobian { determinant: 4.0 });

    let context = KernelContext::new(&basis, scaled, 1, &config.with_unit_reference_jacobian(false)).unwrap();
    assert_eq!(context.inverse_reference_jacobian(), &(Matrix2::identity() * 0.5));

    let shear = matrix![1.0, 0.5; 0.0, 1.0];
    assert!(KernelContext::new(&basis, shear, 1, &config).is_ok());
}

#[test]
fn unit_determinant_tolerance_respects_precision() {
    let config = KernelConfig::default();
    let basis = TensorBasis::<f32>::lagrange(2, 2).unwrap();
    for angle in [0.3f32, 0.7, 1.1, 2.9] {
        let (s, c) = angle.sin_cos();
        let rotation = matrix![c, -s; s, c];
        assert!(KernelContext::new(&basis, rotation, 1, &config).is_ok());
    }
    let stretched = matrix![1.001f32, 0.0; 0.0, 1.0];
    assert!(matches!(
        KernelContext::new(&basis, stretched, 1, &config),
        Err(KernelError::NonUnitReferenceJacobian { .. })
    ));

    let basis = TensorBasis::<f64>::lagrange(2, 2).unwrap();
    let stretched = matrix![1.0 + 1e-9, 0.0; 0.0, 1.0];
    assert!(matches!(
        KernelContext::new(&basis, stretched, 1, &config),
        Err(KernelError::NonUnitReferenceJacobian { .. })
    ));
}

#[test]
fn zero_batch_size_is_treated_as_one() {
    let basis = TensorBasis::<f64>::lagrange(2, 2).unwrap();
    let config = KernelConfig::default().with_batch_size(0);
    let context = KernelContext::new(&basis, Matrix2::identity(), 5, &config).unwrap();
    assert_eq!(context.batch_size(), 1);
}
