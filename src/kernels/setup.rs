//! Setup stage: evaluation of the per-quadrature-point coefficient tensor.
use crate::error::KernelError;
use crate::invariants::d2_metric;
use crate::kernels::{interpolate_gradients, BasisTile, KernelContext};
use crate::layout::{point_entry, ENTRIES_PER_POINT};
use crate::{Real, VDIM};
use numeric_literals::replace_float_literals;
use rayon::prelude::*;

/// Computes the coefficient tensor for all elements, given the nodal positions `x`.
///
/// For every element and quadrature point, the reference gradient of `x` is interpolated
/// with sum factorization and mapped to the local Jacobian
/// $\vec J_{pt} = \nabla_\xi \vec x \\, \vec J_{tr}^{-1}$. The tensor block of the point is then
/// $$
/// P_{ijrc} = s \\, \frac{w \det(\vec J_{tr})}{2} \\, \frac{\partial^2 I_1}{\partial J_{rc} \partial J_{ij}}(\vec J_{pt}),
/// \qquad s = \operatorname{sign} \det \vec J_{pt}.
/// $$
/// Inverted elements ($\det \vec J_{pt} < 0$) are not rejected. The sign $s$ keeps the
/// quadratic form consistent for tangled meshes, which may occur while a mesh is being
/// untangled by the optimization.
///
/// Every entry of `p` is overwritten. `x` is only read.
///
/// Returns the number of quadrature points at which the element map is inverted.
///
/// # Errors
///
/// Returns [`KernelError::DegenerateElement`] if $\det \vec J_{pt}$ vanishes (or is not finite)
/// at any quadrature point. The content of `p` is then unspecified.
///
/// # Panics
///
/// Panics if the basis in the context does not have `D1D` nodes and `Q1D` quadrature points per
/// dimension, or if the buffers do not match the number of elements in the context.
pub fn setup_hessian_2d<T: Real, const D1D: usize, const Q1D: usize>(
    context: &KernelContext<T>,
    x: &[T],
    p: &mut [T],
) -> Result<usize, KernelError> {
    context.assert_specialization(D1D, Q1D);
    let x_element_len = D1D * D1D * VDIM;
    let p_element_len = ENTRIES_PER_POINT * Q1D * Q1D;
    let num_elements = context.num_elements();
    assert_eq!(x.len(), x_element_len * num_elements, "Nodal field dimension mismatch");
    assert_eq!(p.len(), p_element_len * num_elements, "Coefficient tensor dimension mismatch");
    if num_elements == 0 {
        return Ok(0);
    }

    let batch_size = context.batch_size();
    p.par_chunks_mut(batch_size * p_element_len)
        .zip(x.par_chunks(batch_size * x_element_len))
        .enumerate()
        .map(|(block_index, (p_block, x_block))| -> Result<usize, KernelError> {
            let tile = BasisTile::<T, D1D, Q1D>::load(context.basis());
            let mut inverted = 0;
            let element_iter = p_block
                .chunks_exact_mut(p_element_len)
                .zip(x_block.chunks_exact(x_element_len))
                .enumerate();
            for (local_index, (p_element, x_element)) in element_iter {
                let element = block_index * batch_size + local_index;
                inverted += setup_element(&tile, context, element, x_element, p_element)?;
            }
            Ok(inverted)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn setup_element<T: Real, const D1D: usize, const Q1D: usize>(
    tile: &BasisTile<T, D1D, Q1D>,
    context: &KernelContext<T>,
    element: usize,
    x_element: &[T],
    p_element: &mut [T],
) -> Result<usize, KernelError> {
    let gradients = interpolate_gradients(tile, x_element);

    let jrt = context.inverse_reference_jacobian();
    let det_jtr = context.reference_jacobian().determinant();
    let weights = context.basis().weights();

    let mut inverted = 0;
    for qy in 0..Q1D {
        for qx in 0..Q1D {
            let jpt = gradients[qy][qx] * jrt;
            let det = jpt.determinant();
            if det == 0.0 || !det.is_finite() {
                return Err(KernelError::DegenerateElement { element, qx, qy });
            }
            let sign = if det < 0.0 {
                inverted += 1;
                -1.0
            } else {
                1.0
            };
            let scale = sign * 0.5 * weights[qx + Q1D * qy] * det_jtr;

            let offset = ENTRIES_PER_POINT * (qx + Q1D * qy);
            let block = &mut p_element[offset..offset + ENTRIES_PER_POINT];
            for r in 0..VDIM {
                for c in 0..VDIM {
                    let dp = d2_metric(&jpt, r, c);
                    for i in 0..VDIM {
                        for j in 0..VDIM {
                            block[point_entry(i, j, r, c)] = scale * dp[(i, j)];
                        }
                    }
                }
            }
        }
    }
    Ok(inverted)
}
