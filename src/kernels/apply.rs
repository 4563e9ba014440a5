//! Apply stage: the action of the cached Hessian on a trial field.
use crate::kernels::{interpolate_gradients, project_gradients_add, BasisTile, KernelContext, PointTile};
use crate::layout::{point_entry, ENTRIES_PER_POINT};
use crate::{Real, VDIM};
use nalgebra::Matrix2;
use rayon::prelude::*;

/// Computes $\vec y \leftarrow \vec y + \vec H \vec r$, where $\vec H$ is the Hessian encoded by
/// the coefficient tensor `p` (as computed by
/// [`setup_hessian_2d`](crate::kernels::setup::setup_hessian_2d)).
///
/// At every quadrature point the physical gradient of the trial field
/// $\vec A = \nabla_\xi \vec r \\, \vec J_{tr}^{-1}$ is contracted against the tensor,
/// $B_{rc} = \sum_{ij} P_{ijrc} A_{ij}$, and $\vec C = \vec J_{tr}^{-1} \vec B^T$ is projected
/// back onto the nodes with the transposed basis tables.
///
/// The result is *added* to `y`. The operation is linear in `r` and only reads `p`.
///
/// # Panics
///
/// Panics if the basis in the context does not have `D1D` nodes and `Q1D` quadrature points per
/// dimension, or if the buffers do not match the number of elements in the context.
pub fn apply_hessian_2d<T: Real, const D1D: usize, const Q1D: usize>(
    context: &KernelContext<T>,
    p: &[T],
    r: &[T],
    y: &mut [T],
) {
    context.assert_specialization(D1D, Q1D);
    let field_element_len = D1D * D1D * VDIM;
    let p_element_len = ENTRIES_PER_POINT * Q1D * Q1D;
    let num_elements = context.num_elements();
    assert_eq!(p.len(), p_element_len * num_elements, "Coefficient tensor dimension mismatch");
    assert_eq!(r.len(), field_element_len * num_elements, "Trial field dimension mismatch");
    assert_eq!(y.len(), field_element_len * num_elements, "Output field dimension mismatch");
    if num_elements == 0 {
        return;
    }

    let batch_size = context.batch_size();
    y.par_chunks_mut(batch_size * field_element_len)
        .zip(r.par_chunks(batch_size * field_element_len))
        .zip(p.par_chunks(batch_size * p_element_len))
        .for_each(|((y_block, r_block), p_block)| {
            let tile = BasisTile::<T, D1D, Q1D>::load(context.basis());
            let element_iter = y_block
                .chunks_exact_mut(field_element_len)
                .zip(r_block.chunks_exact(field_element_len))
                .zip(p_block.chunks_exact(p_element_len));
            for ((y_element, r_element), p_element) in element_iter {
                apply_element(&tile, context, p_element, r_element, y_element);
            }
        });
}

fn apply_element<T: Real, const D1D: usize, const Q1D: usize>(
    tile: &BasisTile<T, D1D, Q1D>,
    context: &KernelContext<T>,
    p_element: &[T],
    r_element: &[T],
    y_element: &mut [T],
) {
    let gradients = interpolate_gradients(tile, r_element);
    let jrt = context.inverse_reference_jacobian();

    let mut coefficients: PointTile<T, Q1D> = [[Matrix2::zeros(); Q1D]; Q1D];
    for qy in 0..Q1D {
        for qx in 0..Q1D {
            let a = gradients[qy][qx] * jrt;
            let offset = ENTRIES_PER_POINT * (qx + Q1D * qy);
            let block = &p_element[offset..offset + ENTRIES_PER_POINT];
            let b = Matrix2::from_fn(|r, c| {
                let mut b_rc = T::zero();
                for i in 0..VDIM {
                    for j in 0..VDIM {
                        b_rc += block[point_entry(i, j, r, c)] * a[(i, j)];
                    }
                }
                b_rc
            });
            coefficients[qy][qx] = jrt * b.transpose();
        }
    }

    project_gradients_add(tile, &coefficients, y_element);
}
