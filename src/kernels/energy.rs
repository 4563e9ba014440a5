//! The shape energy and its gradient, evaluated with the same sum-factorized interpolation as
//! the Hessian kernels.
//!
//! The energy of a mesh with nodal positions $\vec x$ is
//! $$
//! E(\vec x) = \sum_e \sum_q w_q \det(\vec J_{tr}) \\, \mu(\vec J_{pt}(\xi_q)),
//! \qquad
//! \mu(\vec J) = \frac{1}{2} I_1(\vec J) - 1.
//! $$
//! The Hessian computed by [`setup`](crate::kernels::setup) and [`apply`](crate::kernels::apply)
//! is the derivative of [`add_mult_gradient_2d`] for meshes without inverted elements.
use crate::error::KernelError;
use crate::invariants::{shape_energy_density, shape_energy_gradient};
use crate::kernels::{interpolate_gradients, project_gradients_add, BasisTile, KernelContext, PointTile};
use crate::{Real, VDIM};
use nalgebra::Matrix2;
use rayon::prelude::*;

/// Computes the total shape energy $E(\vec x)$ of all elements.
///
/// # Errors
///
/// Returns [`KernelError::DegenerateElement`] if the element map is degenerate at any
/// quadrature point.
///
/// # Panics
///
/// Panics if the basis in the context does not have `D1D` nodes and `Q1D` quadrature points per
/// dimension, or if `x` does not match the number of elements in the context.
pub fn energy_2d<T: Real, const D1D: usize, const Q1D: usize>(
    context: &KernelContext<T>,
    x: &[T],
) -> Result<T, KernelError> {
    context.assert_specialization(D1D, Q1D);
    let x_element_len = D1D * D1D * VDIM;
    assert_eq!(x.len(), x_element_len * context.num_elements(), "Nodal field dimension mismatch");
    if context.num_elements() == 0 {
        return Ok(T::zero());
    }

    let batch_size = context.batch_size();
    x.par_chunks(batch_size * x_element_len)
        .enumerate()
        .map(|(block_index, x_block)| -> Result<T, KernelError> {
            let tile = BasisTile::<T, D1D, Q1D>::load(context.basis());
            let mut energy = T::zero();
            for (local_index, x_element) in x_block.chunks_exact(x_element_len).enumerate() {
                let element = block_index * batch_size + local_index;
                let jacobians = element_jacobians(&tile, context, element, x_element)?;
                for qy in 0..Q1D {
                    for qx in 0..Q1D {
                        let w = point_scale(context, qx, qy, Q1D);
                        energy += w * shape_energy_density(&jacobians[qy][qx]);
                    }
                }
            }
            Ok(energy)
        })
        .try_reduce(T::zero, |a, b| Ok(a + b))
}

/// Computes $\vec y \leftarrow \vec y + \nabla E(\vec x)$.
///
/// # Errors
///
/// Returns [`KernelError::DegenerateElement`] if the element map is degenerate at any
/// quadrature point. All elements are checked before anything is accumulated, so `y` is left
/// untouched on failure.
///
/// # Panics
///
/// Panics if the basis in the context does not have `D1D` nodes and `Q1D` quadrature points per
/// dimension, or if the buffers do not match the number of elements in the context.
pub fn add_mult_gradient_2d<T: Real, const D1D: usize, const Q1D: usize>(
    context: &KernelContext<T>,
    x: &[T],
    y: &mut [T],
) -> Result<(), KernelError> {
    context.assert_specialization(D1D, Q1D);
    let field_element_len = D1D * D1D * VDIM;
    let num_elements = context.num_elements();
    assert_eq!(x.len(), field_element_len * num_elements, "Nodal field dimension mismatch");
    assert_eq!(y.len(), field_element_len * num_elements, "Output field dimension mismatch");
    if num_elements == 0 {
        return Ok(());
    }

    let batch_size = context.batch_size();
    x.par_chunks(batch_size * field_element_len)
        .enumerate()
        .try_for_each(|(block_index, x_block)| -> Result<(), KernelError> {
            let tile = BasisTile::<T, D1D, Q1D>::load(context.basis());
            for (local_index, x_element) in x_block.chunks_exact(field_element_len).enumerate() {
                element_jacobians(&tile, context, block_index * batch_size + local_index, x_element)?;
            }
            Ok(())
        })?;

    let jrt = context.inverse_reference_jacobian();
    y.par_chunks_mut(batch_size * field_element_len)
        .zip(x.par_chunks(batch_size * field_element_len))
        .enumerate()
        .try_for_each(|(block_index, (y_block, x_block))| {
            let tile = BasisTile::<T, D1D, Q1D>::load(context.basis());
            let element_iter = y_block
                .chunks_exact_mut(field_element_len)
                .zip(x_block.chunks_exact(field_element_len))
                .enumerate();
            for (local_index, (y_element, x_element)) in element_iter {
                let element = block_index * batch_size + local_index;
                let jacobians = element_jacobians(&tile, context, element, x_element)?;
                let mut coefficients: PointTile<T, Q1D> = [[Matrix2::zeros(); Q1D]; Q1D];
                for qy in 0..Q1D {
                    for qx in 0..Q1D {
                        let w = point_scale(context, qx, qy, Q1D);
                        let stress = shape_energy_gradient(&jacobians[qy][qx]) * w;
                        coefficients[qy][qx] = jrt * stress.transpose();
                    }
                }
                project_gradients_add(&tile, &coefficients, y_element);
            }
            Ok(())
        })
}

/// The local Jacobians $\vec J_{pt}$ at all quadrature points of an element.
fn element_jacobians<T: Real, const D1D: usize, const Q1D: usize>(
    tile: &BasisTile<T, D1D, Q1D>,
    context: &KernelContext<T>,
    element: usize,
    x_element: &[T],
) -> Result<PointTile<T, Q1D>, KernelError> {
    let mut jacobians = interpolate_gradients(tile, x_element);
    for qy in 0..Q1D {
        for qx in 0..Q1D {
            let jpt = jacobians[qy][qx] * context.inverse_reference_jacobian();
            let det = jpt.determinant();
            if det == T::zero() || !det.is_finite() {
                return Err(KernelError::DegenerateElement { element, qx, qy });
            }
            jacobians[qy][qx] = jpt;
        }
    }
    Ok(jacobians)
}

fn point_scale<T: Real>(context: &KernelContext<T>, qx: usize, qy: usize, q1d: usize) -> T {
    context.basis().weights()[qx + q1d * qy] * context.reference_jacobian().determinant()
}
