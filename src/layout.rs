//! Memory layout of element-local fields and of the cached coefficient tensor.
//!
//! All buffers are flat and column-major, i.e. the first index varies fastest:
//!
//! - vector fields (nodal positions, trial fields and outputs) have shape
//!   `(dofs_1d, dofs_1d, 2, num_elements)`, indexed by `(dx, dy, component, element)`,
//! - the coefficient tensor has shape `(2, 2, 2, 2, quad_1d, quad_1d, num_elements)`,
//!   indexed by `(i, j, r, c, qx, qy, element)`.
use crate::{Real, VDIM};

/// Number of coefficient tensor entries stored per quadrature point.
pub const ENTRIES_PER_POINT: usize = VDIM * VDIM * VDIM * VDIM;

/// Describes the layout of an element-local vector field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ElementFieldLayout {
    dofs_1d: usize,
    num_elements: usize,
}

impl ElementFieldLayout {
    pub fn new(dofs_1d: usize, num_elements: usize) -> Self {
        Self { dofs_1d, num_elements }
    }

    pub fn dofs_1d(&self) -> usize {
        self.dofs_1d
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// The number of scalar entries belonging to a single element.
    pub fn element_len(&self) -> usize {
        self.dofs_1d * self.dofs_1d * VDIM
    }

    /// The total number of scalar entries in the field.
    pub fn len(&self) -> usize {
        self.element_len() * self.num_elements
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, dx: usize, dy: usize, component: usize, element: usize) -> usize {
        let n = self.dofs_1d;
        debug_assert!(dx < n && dy < n && component < VDIM && element < self.num_elements);
        dx + n * (dy + n * (component + VDIM * element))
    }

    /// Returns a zero-initialized field with this layout.
    pub fn zeros<T: Real>(&self) -> Vec<T> {
        vec![T::zero(); self.len()]
    }
}

/// Index of the entry `(i, j, r, c)` within the block of a single quadrature point.
#[inline(always)]
pub fn point_entry(i: usize, j: usize, r: usize, c: usize) -> usize {
    i + VDIM * (j + VDIM * (r + VDIM * c))
}

/// The per-quadrature-point 4th-order coefficient tensor computed by the setup stage.
///
/// At quadrature point $q$ of element $e$, the entry `(i, j, r, c)` holds
/// $$
/// s \\, \frac{w_q \det(\vec J_{tr})}{2} \\, \frac{\partial^2 I_1}{\partial J_{rc} \partial J_{ij}}(\vec J_{pt}),
/// $$
/// where $s$ is the orientation sign of the element map at the quadrature point.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTensor<T> {
    quad_1d: usize,
    num_elements: usize,
    data: Vec<T>,
}

impl<T: Real> CoefficientTensor<T> {
    pub fn zeros(quad_1d: usize, num_elements: usize) -> Self {
        let len = Self::element_len_for(quad_1d) * num_elements;
        Self {
            quad_1d,
            num_elements,
            data: vec![T::zero(); len],
        }
    }

    pub(crate) fn element_len_for(quad_1d: usize) -> usize {
        ENTRIES_PER_POINT * quad_1d * quad_1d
    }

    pub fn quad_1d(&self) -> usize {
        self.quad_1d
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    #[allow(clippy::too_many_arguments)]
    pub fn get(&self, i: usize, j: usize, r: usize, c: usize, qx: usize, qy: usize, element: usize) -> T {
        self.quadrature_point_block(qx, qy, element)[point_entry(i, j, r, c)]
    }

    /// The 16 entries belonging to a single quadrature point, indexed by [`point_entry`].
    pub fn quadrature_point_block(&self, qx: usize, qy: usize, element: usize) -> &[T] {
        let q = self.quad_1d;
        assert!(qx < q && qy < q && element < self.num_elements);
        let offset = ENTRIES_PER_POINT * (qx + q * (qy + q * element));
        &self.data[offset..offset + ENTRIES_PER_POINT]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
