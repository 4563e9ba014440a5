//! Runtime configuration of the kernels.
use serde::{Deserialize, Serialize};

/// Configuration shared by the setup and apply kernels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Number of elements processed by a single parallel task.
    ///
    /// A value of zero is treated as one.
    pub batch_size: usize,
    /// Whether the reference Jacobian must have unit determinant.
    pub require_unit_reference_jacobian: bool,
    /// Absolute tolerance used when checking for unit determinant.
    ///
    /// The tolerance used is at least `8 * T::default_epsilon()` for the scalar type `T` of the
    /// kernels, so the default also accepts rotations in single precision.
    pub unit_determinant_tolerance: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            require_unit_reference_jacobian: true,
            unit_determinant_tolerance: 1e-12,
        }
    }
}

impl KernelConfig {
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    pub fn with_unit_reference_jacobian(self, required: bool) -> Self {
        Self {
            require_unit_reference_jacobian: required,
            ..self
        }
    }

    pub fn with_unit_determinant_tolerance(self, tolerance: f64) -> Self {
        Self {
            unit_determinant_tolerance: tolerance,
            ..self
        }
    }

    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
