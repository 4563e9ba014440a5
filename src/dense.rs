//! Dense assembly of element Hessians.
//!
//! The routines in this module evaluate the element Hessian of the shape energy node by node,
//! without sum factorization. They are much slower than the kernels and only intended for
//! verification and debugging of small problems.
use crate::basis::TensorBasis;
use crate::error::{check_len, KernelError};
use crate::invariants::d2_metric;
use crate::layout::ElementFieldLayout;
use crate::{Real, VDIM};
use nalgebra::{try_convert, DMatrix, DVector, Matrix2};
use numeric_literals::replace_float_literals;

/// Assembles the dense element Hessian of a single element with nodal positions `x_element`.
///
/// Rows and columns are indexed by `node + n * component`, where `n` is the number of element
/// nodes and `node = dx + dofs_1d * dy`. This matches the element-local field layout, see
/// [`ElementFieldLayout`]. Entry $((a, r), (b, i))$ is
/// $$
/// \sum_q \sum_{c, j} \nabla \phi_a^{c} \\, P_{ijrc}(\xi_q) \\, \nabla \phi_b^{j},
/// $$
/// with $\nabla \phi$ the physical shape function gradients and $P$ the coefficient tensor.
///
/// # Errors
///
/// Fails if `x_element` has the wrong length, if the reference Jacobian is singular or if the
/// element is degenerate at a quadrature point. Degenerate elements are reported as element 0.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn assemble_element_hessian<T: Real>(
    basis: &TensorBasis<T>,
    reference_jacobian: &Matrix2<T>,
    x_element: &[T],
) -> Result<DMatrix<T>, KernelError> {
    let n = basis.num_element_nodes();
    check_len(
        "element nodal positions",
        ElementFieldLayout::new(basis.dofs_1d(), 1).len(),
        x_element.len(),
    )?;
    let jrt = reference_jacobian
        .try_inverse()
        .ok_or_else(|| KernelError::DegenerateReferenceJacobian {
            determinant: try_convert(reference_jacobian.determinant()).unwrap_or(f64::NAN),
        })?;
    let det_jtr = reference_jacobian.determinant();

    let mut hessian = DMatrix::<T>::zeros(VDIM * n, VDIM * n);
    let mut ds = DMatrix::<T>::zeros(n, VDIM);
    for qy in 0..basis.quad_1d() {
        for qx in 0..basis.quad_1d() {
            physical_shape_gradients(basis, &jrt, (qx, qy), &mut ds);

            let mut jpt = Matrix2::<T>::zeros();
            for b in 0..n {
                for i in 0..VDIM {
                    for j in 0..VDIM {
                        jpt[(i, j)] += x_element[b + n * i] * ds[(b, j)];
                    }
                }
            }
            let det = jpt.determinant();
            if det == 0.0 || !det.is_finite() {
                return Err(KernelError::DegenerateElement { element: 0, qx, qy });
            }
            let sign = if det < 0.0 { -1.0 } else { 1.0 };
            let scale = sign * 0.5 * basis.weights()[qx + basis.quad_1d() * qy] * det_jtr;

            for r in 0..VDIM {
                for c in 0..VDIM {
                    let p_rc = d2_metric(&jpt, r, c) * scale;
                    for i in 0..VDIM {
                        for j in 0..VDIM {
                            for a in 0..n {
                                for b in 0..n {
                                    hessian[(a + n * r, b + n * i)] += ds[(a, c)] * p_rc[(i, j)] * ds[(b, j)];
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(hessian)
}

/// Computes the product of the dense element Hessian with the element-local trial field
/// `r_element`.
///
/// # Errors
///
/// See [`assemble_element_hessian`]. Additionally fails if `r_element` has the wrong length.
pub fn apply_element_hessian<T: Real>(
    basis: &TensorBasis<T>,
    reference_jacobian: &Matrix2<T>,
    x_element: &[T],
    r_element: &[T],
) -> Result<DVector<T>, KernelError> {
    check_len(
        "element trial field",
        ElementFieldLayout::new(basis.dofs_1d(), 1).len(),
        r_element.len(),
    )?;
    let hessian = assemble_element_hessian(basis, reference_jacobian, x_element)?;
    Ok(hessian * DVector::from_column_slice(r_element))
}

/// Physical gradients of all element shape functions at a quadrature point, stored row-wise.
fn physical_shape_gradients<T: Real>(
    basis: &TensorBasis<T>,
    jrt: &Matrix2<T>,
    quadrature_point: (usize, usize),
    output: &mut DMatrix<T>,
) {
    let d = basis.dofs_1d();
    for dy in 0..d {
        for dx in 0..d {
            let [gx, gy] = basis.shape_gradient((dx, dy), quadrature_point);
            for c in 0..VDIM {
                output[(dx + d * dy, c)] = gx * jrt[(0, c)] + gy * jrt[(1, c)];
            }
        }
    }
}
