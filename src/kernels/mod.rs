//! Sum-factorized element kernels.
//!
//! Every kernel is specialized for a fixed number of nodes `D1D` and quadrature points `Q1D`
//! per dimension, so that all scratch storage consists of fixed-size arrays on the stack.
//!
//! # Execution model
//!
//! Elements are independent and processed in parallel with `rayon`. Elements are grouped into
//! *launch blocks* of [`KernelConfig::batch_size`](crate::KernelConfig) elements. At the start
//! of a block, the 1D basis tables are staged once into a [`BasisTile`] shared by all elements
//! of the block. Each element is then taken through a fixed sequence of phases:
//!
//! 1. load the element-local nodal values into a `D1D x D1D` tile,
//! 2. contract along the first axis into `D1D x Q1D` tiles,
//! 3. contract along the second axis into `Q1D x Q1D` tiles,
//! 4. per-quadrature-point work,
//! 5. (apply and gradient only) the transposed contractions back to a `D1D x D1D` tile,
//!    accumulated into the output.
//!
//! Each phase reads every entry the previous phase wrote, so a phase only starts once the
//! previous one has completed for the whole tile. There is no synchronization between
//! elements: each parallel task owns disjoint output chunks.
use crate::basis::TensorBasis;
use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::{Real, VDIM};
use nalgebra::{try_convert, Matrix2};

pub mod apply;
pub mod energy;
pub mod setup;

/// Inputs shared by all elements of a kernel invocation.
#[derive(Debug, Clone)]
pub struct KernelContext<'a, T: Real> {
    basis: &'a TensorBasis<T>,
    num_elements: usize,
    reference_jacobian: Matrix2<T>,
    inverse_reference_jacobian: Matrix2<T>,
    batch_size: usize,
}

impl<'a, T: Real> KernelContext<'a, T> {
    /// Validates the reference Jacobian and prepares the context.
    ///
    /// The reference Jacobian must be non-singular, and, if required by the configuration,
    /// have unit determinant. The unit determinant tolerance is never smaller than a few machine
    /// epsilons of `T`.
    pub fn new(
        basis: &'a TensorBasis<T>,
        reference_jacobian: Matrix2<T>,
        num_elements: usize,
        config: &KernelConfig,
    ) -> Result<Self, KernelError> {
        let det = reference_jacobian.determinant();
        let determinant = try_convert::<T, f64>(det).unwrap_or(f64::NAN);
        let inverse_reference_jacobian = reference_jacobian
            .try_inverse()
            .filter(|inverse| inverse.iter().all(|x| x.is_finite()))
            .ok_or(KernelError::DegenerateReferenceJacobian { determinant })?;

        // Never demand more than the scalar type can represent
        let epsilon = try_convert::<T, f64>(T::default_epsilon()).unwrap_or(0.0);
        let tolerance = config.unit_determinant_tolerance.max(8.0 * epsilon);
        let is_unit = (determinant - 1.0).abs() <= tolerance;
        if config.require_unit_reference_jacobian && !is_unit {
            return Err(KernelError::NonUnitReferenceJacobian { determinant });
        }

        Ok(Self {
            basis,
            num_elements,
            reference_jacobian,
            inverse_reference_jacobian,
            batch_size: config.effective_batch_size(),
        })
    }

    pub fn basis(&self) -> &TensorBasis<T> {
        self.basis
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn reference_jacobian(&self) -> &Matrix2<T> {
        &self.reference_jacobian
    }

    pub fn inverse_reference_jacobian(&self) -> &Matrix2<T> {
        &self.inverse_reference_jacobian
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Asserts that the context matches the compile-time configuration of a kernel.
    fn assert_specialization(&self, d1d: usize, q1d: usize) {
        assert_eq!(self.basis.dofs_1d(), d1d, "Basis does not match kernel node count");
        assert_eq!(self.basis.quad_1d(), q1d, "Basis does not match kernel quadrature point count");
    }
}

/// The 1D basis tables, staged once per launch block.
///
/// Entries are indexed as `b[q][d]`. The backward (transposed) contractions read the same
/// tables with swapped roles of the indices.
pub(crate) struct BasisTile<T, const D1D: usize, const Q1D: usize> {
    b: [[T; D1D]; Q1D],
    g: [[T; D1D]; Q1D],
}

impl<T: Real, const D1D: usize, const Q1D: usize> BasisTile<T, D1D, Q1D> {
    pub fn load(basis: &TensorBasis<T>) -> Self {
        let mut b = [[T::zero(); D1D]; Q1D];
        let mut g = [[T::zero(); D1D]; Q1D];
        for d in 0..D1D {
            for q in 0..Q1D {
                b[q][d] = basis.values()[(q, d)];
                g[q][d] = basis.derivatives()[(q, d)];
            }
        }
        Self { b, g }
    }
}

/// Per-quadrature-point 2x2 matrices of an element, indexed as `[qy][qx]`.
pub(crate) type PointTile<T, const Q1D: usize> = [[Matrix2<T>; Q1D]; Q1D];

/// Interpolates the reference gradient of an element-local vector field at all quadrature
/// points.
///
/// Entry `(component, direction)` of each matrix is the derivative of the field component
/// with respect to the reference coordinate `direction`.
pub(crate) fn interpolate_gradients<T: Real, const D1D: usize, const Q1D: usize>(
    tile: &BasisTile<T, D1D, Q1D>,
    field: &[T],
) -> PointTile<T, Q1D> {
    debug_assert_eq!(field.len(), D1D * D1D * VDIM);
    let (b, g) = (&tile.b, &tile.g);

    // Load: X[c][dy][dx]
    let mut x = [[[T::zero(); D1D]; D1D]; VDIM];
    for c in 0..VDIM {
        for dy in 0..D1D {
            for dx in 0..D1D {
                x[c][dy][dx] = field[dx + D1D * (dy + D1D * c)];
            }
        }
    }

    // First axis: value and derivative channels at (dy, qx)
    let mut xb = [[[T::zero(); Q1D]; D1D]; VDIM];
    let mut xg = [[[T::zero(); Q1D]; D1D]; VDIM];
    for dy in 0..D1D {
        for qx in 0..Q1D {
            for c in 0..VDIM {
                let mut u = T::zero();
                let mut v = T::zero();
                for dx in 0..D1D {
                    u += b[qx][dx] * x[c][dy][dx];
                    v += g[qx][dx] * x[c][dy][dx];
                }
                xb[c][dy][qx] = u;
                xg[c][dy][qx] = v;
            }
        }
    }

    // Second axis: full reference gradients at (qx, qy)
    let mut gradients = [[Matrix2::zeros(); Q1D]; Q1D];
    for qy in 0..Q1D {
        for qx in 0..Q1D {
            let gradient: &mut Matrix2<T> = &mut gradients[qy][qx];
            for c in 0..VDIM {
                let mut u = T::zero();
                let mut v = T::zero();
                for dy in 0..D1D {
                    u += xg[c][dy][qx] * b[qy][dy];
                    v += xb[c][dy][qx] * g[qy][dy];
                }
                gradient[(c, 0)] = u;
                gradient[(c, 1)] = v;
            }
        }
    }
    gradients
}

/// Projects per-quadrature-point coefficients back onto the element nodes and adds the result
/// to `output`.
///
/// Entry `(direction, component)` of each matrix is the coefficient multiplying the reference
/// derivative in `direction` of the shape functions, for the given output component. This is
/// the transpose of [`interpolate_gradients`].
pub(crate) fn project_gradients_add<T: Real, const D1D: usize, const Q1D: usize>(
    tile: &BasisTile<T, D1D, Q1D>,
    coefficients: &PointTile<T, Q1D>,
    output: &mut [T],
) {
    debug_assert_eq!(output.len(), D1D * D1D * VDIM);
    let (b, g) = (&tile.b, &tile.g);

    // Transposed first axis: (qy, qx) -> (dx, qy)
    let mut cb = [[[T::zero(); Q1D]; D1D]; VDIM];
    let mut cg = [[[T::zero(); Q1D]; D1D]; VDIM];
    for qy in 0..Q1D {
        for dx in 0..D1D {
            for c in 0..VDIM {
                let mut u = T::zero();
                let mut v = T::zero();
                for qx in 0..Q1D {
                    let coefficient = &coefficients[qy][qx];
                    u += g[qx][dx] * coefficient[(0, c)];
                    v += b[qx][dx] * coefficient[(1, c)];
                }
                cb[c][dx][qy] = u;
                cg[c][dx][qy] = v;
            }
        }
    }

    // Transposed second axis: (dx, qy) -> (dx, dy), accumulated
    for dy in 0..D1D {
        for dx in 0..D1D {
            for c in 0..VDIM {
                let mut u = T::zero();
                for qy in 0..Q1D {
                    u += cb[c][dx][qy] * b[qy][dy] + cg[c][dx][qy] * g[qy][dy];
                }
                output[dx + D1D * (dy + D1D * c)] += u;
            }
        }
    }
}
