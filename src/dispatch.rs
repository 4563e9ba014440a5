//! Runtime selection of the compile-time specialized kernels.
//!
//! Each kernel in [`kernels`](crate::kernels) is instantiated for every supported
//! [`KernelKey`], listed in [`SUPPORTED_KERNELS`]. Keys outside of this list are rejected with
//! [`KernelError::UnsupportedConfiguration`]. There is no generic fallback kernel.
use crate::error::{check_len, KernelError};
use crate::kernels::apply::apply_hessian_2d;
use crate::kernels::energy::{add_mult_gradient_2d, energy_2d};
use crate::kernels::setup::setup_hessian_2d;
use crate::kernels::KernelContext;
use crate::layout::{CoefficientTensor, ElementFieldLayout};
use crate::Real;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Identifies a kernel specialization by its number of nodes and quadrature points per
/// dimension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelKey {
    dofs_1d: usize,
    quad_1d: usize,
}

impl KernelKey {
    pub const fn new(dofs_1d: usize, quad_1d: usize) -> Self {
        Self { dofs_1d, quad_1d }
    }

    pub fn dofs_1d(&self) -> usize {
        self.dofs_1d
    }

    pub fn quad_1d(&self) -> usize {
        self.quad_1d
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_KERNELS.contains(self)
    }
}

impl Display for KernelKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(D1D = {}, Q1D = {})", self.dofs_1d, self.quad_1d)
    }
}

type SetupFn<T> = fn(&KernelContext<'_, T>, &[T], &mut [T]) -> Result<usize, KernelError>;
type ApplyFn<T> = fn(&KernelContext<'_, T>, &[T], &[T], &mut [T]);
type EnergyFn<T> = fn(&KernelContext<'_, T>, &[T]) -> Result<T, KernelError>;
type GradientFn<T> = fn(&KernelContext<'_, T>, &[T], &mut [T]) -> Result<(), KernelError>;

/// The kernels specialized for a single [`KernelKey`].
#[derive(Copy, Clone)]
pub struct KernelSet<T: Real> {
    pub setup: SetupFn<T>,
    pub apply: ApplyFn<T>,
    pub energy: EnergyFn<T>,
    pub gradient: GradientFn<T>,
}

impl<T: Real> fmt::Debug for KernelSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelSet").finish_non_exhaustive()
    }
}

macro_rules! kernel_table {
    ($(($d1d:literal, $q1d:literal)),* $(,)?) => {
        /// All kernel specializations compiled into the library.
        pub const SUPPORTED_KERNELS: &[KernelKey] = &[$(KernelKey::new($d1d, $q1d)),*];

        fn specialized_kernels<T: Real>(key: KernelKey) -> Option<KernelSet<T>> {
            match (key.dofs_1d, key.quad_1d) {
                $(
                    ($d1d, $q1d) => Some(KernelSet {
                        setup: setup_hessian_2d::<T, $d1d, $q1d>,
                        apply: apply_hessian_2d::<T, $d1d, $q1d>,
                        energy: energy_2d::<T, $d1d, $q1d>,
                        gradient: add_mult_gradient_2d::<T, $d1d, $q1d>,
                    }),
                )*
                _ => None,
            }
        }
    };
}

kernel_table!(
    (2, 1), (2, 2), (2, 3), (2, 4), (2, 5),
    (3, 1), (3, 2), (3, 3), (3, 4), (3, 5),
    (4, 1), (4, 2), (4, 3), (4, 4), (4, 5),
    (5, 1), (5, 2), (5, 3), (5, 4), (5, 5),
);

/// Returns the keys of all compiled kernel specializations.
pub fn supported_kernel_keys() -> impl Iterator<Item = KernelKey> {
    SUPPORTED_KERNELS.iter().copied()
}

/// Looks up the kernels specialized for the given key.
pub fn lookup<T: Real>(key: KernelKey) -> Result<KernelSet<T>, KernelError> {
    specialized_kernels(key).ok_or(KernelError::UnsupportedConfiguration {
        dofs_1d: key.dofs_1d,
        quad_1d: key.quad_1d,
    })
}

fn check_field<T: Real>(context: &KernelContext<T>, buffer: &'static str, field: &[T]) -> Result<(), KernelError> {
    let layout = ElementFieldLayout::new(context.basis().dofs_1d(), context.num_elements());
    check_len(buffer, layout.len(), field.len())
}

fn check_coefficients<T: Real>(context: &KernelContext<T>, p: &CoefficientTensor<T>) -> Result<(), KernelError> {
    check_len("coefficient tensor (quad_1d)", context.basis().quad_1d(), p.quad_1d())?;
    check_len("coefficient tensor (elements)", context.num_elements(), p.num_elements())
}

/// Computes the coefficient tensor with the kernel matching the basis of the context.
///
/// Returns the number of quadrature points at which elements are inverted. See
/// [`setup_hessian_2d`] for details.
///
/// # Errors
///
/// Returns an error if no kernel is available for the basis, if the buffers do not match the
/// context or if an element is degenerate. Dimensions are validated before `p` is written.
pub fn setup_hessian<T: Real>(
    context: &KernelContext<T>,
    x: &[T],
    p: &mut CoefficientTensor<T>,
) -> Result<usize, KernelError> {
    let kernels = lookup::<T>(context.basis().key())?;
    check_field(context, "nodal positions", x)?;
    check_coefficients(context, p)?;
    (kernels.setup)(context, x, p.as_mut_slice())
}

/// Computes $\vec y \leftarrow \vec y + \vec H \vec r$ with the kernel matching the basis of the
/// context.
///
/// # Errors
///
/// Returns an error if no kernel is available for the basis or if the buffers do not match the
/// context. In both cases `y` is left untouched.
pub fn apply_hessian<T: Real>(
    context: &KernelContext<T>,
    p: &CoefficientTensor<T>,
    r: &[T],
    y: &mut [T],
) -> Result<(), KernelError> {
    let kernels = lookup::<T>(context.basis().key())?;
    check_coefficients(context, p)?;
    check_field(context, "trial field", r)?;
    check_field(context, "output", y)?;
    (kernels.apply)(context, p.as_slice(), r, y);
    Ok(())
}

/// Computes the shape energy with the kernel matching the basis of the context.
pub fn energy<T: Real>(context: &KernelContext<T>, x: &[T]) -> Result<T, KernelError> {
    let kernels = lookup::<T>(context.basis().key())?;
    check_field(context, "nodal positions", x)?;
    (kernels.energy)(context, x)
}

/// Computes $\vec y \leftarrow \vec y + \nabla E(\vec x)$ with the kernel matching the basis of
/// the context.
pub fn add_mult_gradient<T: Real>(context: &KernelContext<T>, x: &[T], y: &mut [T]) -> Result<(), KernelError> {
    let kernels = lookup::<T>(context.basis().key())?;
    check_field(context, "nodal positions", x)?;
    check_field(context, "output", y)?;
    (kernels.gradient)(context, x, y)
}
