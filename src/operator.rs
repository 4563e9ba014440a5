//! The cached Hessian operator.
use crate::basis::TensorBasis;
use crate::config::KernelConfig;
use crate::dispatch::{self, KernelKey};
use crate::error::check_len;
use crate::kernels::KernelContext;
use crate::layout::{CoefficientTensor, ElementFieldLayout};
use crate::Real;
use eyre::eyre;
use log::{debug, trace, warn};
use nalgebra::Matrix2;

/// Computes the action of the shape energy Hessian on vector fields of a mesh of
/// tensor-product quadrilaterals.
///
/// The first call to [`apply_hessian`](Self::apply_hessian) runs the setup stage, which
/// evaluates the coefficient tensor at the given nodal positions. Subsequent calls reuse the
/// tensor and only run the apply stage, until the cache is cleared with
/// [`invalidate`](Self::invalidate). The operator does not track changes to the nodal
/// positions: callers must invalidate the cache whenever the positions passed to
/// `apply_hessian` change.
///
/// The operator owns its cache, so all operations that may run the setup stage take
/// `&mut self`. Sharing an operator between threads requires external synchronization.
#[derive(Debug, Clone)]
pub struct HessianOperator<T: Real> {
    basis: TensorBasis<T>,
    reference_jacobian: Matrix2<T>,
    num_elements: usize,
    config: KernelConfig,
    key: KernelKey,
    coefficients: CoefficientTensor<T>,
    cache_valid: bool,
    setup_invocations: usize,
}

impl<T: Real> HessianOperator<T> {
    /// Creates an operator for `num_elements` elements sharing the given basis and reference
    /// Jacobian.
    ///
    /// # Errors
    ///
    /// Fails if the basis contains non-finite entries, if no kernel is compiled for the basis
    /// dimensions (see [`SUPPORTED_KERNELS`](crate::dispatch::SUPPORTED_KERNELS)) or if the
    /// reference Jacobian is rejected (see [`KernelContext::new`]). Errors originating in the
    /// kernels can be downcast to [`KernelError`](crate::KernelError).
    pub fn new(
        basis: TensorBasis<T>,
        reference_jacobian: Matrix2<T>,
        num_elements: usize,
        config: KernelConfig,
    ) -> eyre::Result<Self> {
        if !basis.is_finite() {
            return Err(eyre!("Basis tables and quadrature weights must be finite"));
        }
        let key = basis.key();
        dispatch::lookup::<T>(key)?;
        KernelContext::new(&basis, reference_jacobian, num_elements, &config)?;

        debug!("Created Hessian operator with kernel {} for {} elements", key, num_elements);
        let coefficients = CoefficientTensor::zeros(basis.quad_1d(), num_elements);
        Ok(Self {
            basis,
            reference_jacobian,
            num_elements,
            config,
            key,
            coefficients,
            cache_valid: false,
            setup_invocations: 0,
        })
    }

    pub fn basis(&self) -> &TensorBasis<T> {
        &self.basis
    }

    pub fn reference_jacobian(&self) -> &Matrix2<T> {
        &self.reference_jacobian
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The kernel specialization used by this operator.
    pub fn key(&self) -> KernelKey {
        self.key
    }

    /// The layout of the nodal position, trial and output fields.
    pub fn field_layout(&self) -> ElementFieldLayout {
        ElementFieldLayout::new(self.basis.dofs_1d(), self.num_elements)
    }

    pub fn is_cache_valid(&self) -> bool {
        self.cache_valid
    }

    /// The number of times the setup stage has completed successfully.
    pub fn setup_invocations(&self) -> usize {
        self.setup_invocations
    }

    /// The cached coefficient tensor, if the cache is valid.
    pub fn coefficients(&self) -> Option<&CoefficientTensor<T>> {
        self.cache_valid.then_some(&self.coefficients)
    }

    /// Clears the cache, so that the next call to [`apply_hessian`](Self::apply_hessian)
    /// re-runs the setup stage.
    pub fn invalidate(&mut self) {
        if self.cache_valid {
            debug!("Invalidating cached Hessian coefficients");
        }
        self.cache_valid = false;
    }

    /// Computes $\vec y \leftarrow \vec y + \vec H(\vec x) \vec r$.
    ///
    /// Runs the setup stage with the positions `x` if the cache is invalid, otherwise `x` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails if a buffer does not match [`field_layout`](Self::field_layout) or if an element
    /// is degenerate at `x`. `y` is not modified if an error is returned, and the cache
    /// remains invalid after a failed setup.
    pub fn apply_hessian(&mut self, x: &[T], r: &[T], y: &mut [T]) -> eyre::Result<()> {
        let len = self.field_layout().len();
        check_len("nodal positions", len, x.len())?;
        check_len("trial field", len, r.len())?;
        check_len("output", len, y.len())?;

        let context = KernelContext::new(&self.basis, self.reference_jacobian, self.num_elements, &self.config)?;
        if self.cache_valid {
            trace!("Reusing cached Hessian coefficients");
        } else {
            debug!("Running Hessian setup for {} elements", self.num_elements);
            let inverted = dispatch::setup_hessian(&context, x, &mut self.coefficients)?;
            if inverted > 0 {
                warn!("Found {} quadrature points with inverted element maps", inverted);
            }
            self.setup_invocations += 1;
            self.cache_valid = true;
        }

        dispatch::apply_hessian(&context, &self.coefficients, r, y)?;
        Ok(())
    }

    /// Computes the shape energy of the mesh with nodal positions `x`.
    ///
    /// Does not use or modify the cache.
    pub fn energy(&self, x: &[T]) -> eyre::Result<T> {
        let context = self.context()?;
        Ok(dispatch::energy(&context, x)?)
    }

    /// Computes $\vec y \leftarrow \vec y + \nabla E(\vec x)$.
    ///
    /// Does not use or modify the cache.
    pub fn add_mult_gradient(&self, x: &[T], y: &mut [T]) -> eyre::Result<()> {
        let context = self.context()?;
        dispatch::add_mult_gradient(&context, x, y)?;
        Ok(())
    }

    fn context(&self) -> eyre::Result<KernelContext<T>> {
        Ok(KernelContext::new(
            &self.basis,
            self.reference_jacobian,
            self.num_elements,
            &self.config,
        )?)
    }
}
