//! Error types.
use std::fmt;
use std::fmt::{Display, Formatter};

/// Errors that abort a setup or apply computation.
///
/// None of these are recoverable by retrying: the kernels are deterministic, so the same inputs
/// reproduce the same failure. Inverted elements are *not* errors, see
/// [`setup_hessian_2d`](crate::kernels::setup::setup_hessian_2d).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum KernelError {
    /// The reference Jacobian is singular.
    DegenerateReferenceJacobian { determinant: f64 },
    /// The reference Jacobian does not have unit determinant, which is required by the
    /// current configuration.
    NonUnitReferenceJacobian { determinant: f64 },
    /// No kernel has been compiled for the given numbers of nodes and quadrature points
    /// per dimension.
    UnsupportedConfiguration { dofs_1d: usize, quad_1d: usize },
    /// A buffer does not have the extent implied by the element configuration.
    DimensionMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The element map has a vanishing Jacobian determinant at a quadrature point.
    DegenerateElement { element: usize, qx: usize, qy: usize },
}

impl Display for KernelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateReferenceJacobian { determinant } => {
                write!(f, "Reference Jacobian is singular (determinant {determinant})")
            }
            Self::NonUnitReferenceJacobian { determinant } => {
                write!(f, "Reference Jacobian must have unit determinant, but has determinant {determinant}")
            }
            Self::UnsupportedConfiguration { dofs_1d, quad_1d } => {
                write!(
                    f,
                    "No kernel available for {dofs_1d} nodes and {quad_1d} quadrature points per dimension"
                )
            }
            Self::DimensionMismatch {
                buffer,
                expected,
                actual,
            } => {
                write!(f, "Buffer `{buffer}` has length {actual}, expected {expected}")
            }
            Self::DegenerateElement { element, qx, qy } => {
                write!(
                    f,
                    "Element {element} has a degenerate Jacobian at quadrature point ({qx}, {qy})"
                )
            }
        }
    }
}

impl std::error::Error for KernelError {}

/// Checks that a buffer has the expected length.
pub(crate) fn check_len(buffer: &'static str, expected: usize, actual: usize) -> Result<(), KernelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(KernelError::DimensionMismatch {
            buffer,
            expected,
            actual,
        })
    }
}
