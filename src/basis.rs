//! One-dimensional basis tables for tensor-product quadrilateral elements.
use crate::dispatch::KernelKey;
use crate::error::{check_len, KernelError};
use crate::Real;
use eyre::eyre;
use itertools::izip;
use nalgebra::DMatrix;
use tmop_quadrature::univariate::{gauss, gauss_lobatto};
use tmop_quadrature::to_unit_interval;

/// Basis tables and quadrature weights for a tensor-product element on $[0, 1]^2$.
///
/// The 2D shape functions are products $\phi_{d_x}(\xi_x) \phi_{d_y}(\xi_y)$ of 1D shape
/// functions, and the 2D quadrature rule is the tensor product of a 1D rule. The tables
/// store
///
/// - `values[(q, d)]`: the value of the `d`-th 1D shape function at the `q`-th 1D point,
/// - `derivatives[(q, d)]`: its derivative at the same point,
/// - `weights[qx + quad_1d * qy]`: the 2D quadrature weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBasis<T: Real> {
    values: DMatrix<T>,
    derivatives: DMatrix<T>,
    weights: Vec<T>,
}

impl<T: Real> TensorBasis<T> {
    /// Constructs the basis from explicitly provided tables.
    ///
    /// Both tables must have dimensions `quad_1d x dofs_1d` and there must be
    /// `quad_1d * quad_1d` weights.
    pub fn from_tables(values: DMatrix<T>, derivatives: DMatrix<T>, weights: Vec<T>) -> Result<Self, KernelError> {
        let (quad_1d, dofs_1d) = values.shape();
        check_len("basis derivatives (rows)", quad_1d, derivatives.nrows())?;
        check_len("basis derivatives (columns)", dofs_1d, derivatives.ncols())?;
        check_len("quadrature weights", quad_1d * quad_1d, weights.len())?;
        Ok(Self {
            values,
            derivatives,
            weights,
        })
    }

    /// Lagrange shape functions on Gauss-Lobatto nodes, evaluated at Gauss points.
    ///
    /// This is the standard choice for continuous quadrilateral elements of order
    /// `dofs_1d - 1`, integrated with `quad_1d` Gauss points per dimension.
    pub fn lagrange(dofs_1d: usize, quad_1d: usize) -> eyre::Result<Self> {
        if quad_1d == 0 {
            return Err(eyre!("At least one quadrature point per dimension is required"));
        }
        let (_, nodes) = to_unit_interval(gauss_lobatto(dofs_1d)?);
        let (weights_1d, points) = to_unit_interval(gauss(quad_1d));
        let nodes: Vec<f64> = nodes.into_iter().map(|[x]| x).collect();

        let mut values = DMatrix::<T>::zeros(quad_1d, dofs_1d);
        let mut derivatives = DMatrix::<T>::zeros(quad_1d, dofs_1d);
        for (q, &[x]) in points.iter().enumerate() {
            for d in 0..dofs_1d {
                let (phi, dphi) = lagrange_polynomial(&nodes, d, x);
                values[(q, d)] = convert(phi);
                derivatives[(q, d)] = convert(dphi);
            }
        }

        let mut weights = Vec::with_capacity(quad_1d * quad_1d);
        for wy in &weights_1d {
            for wx in &weights_1d {
                weights.push(convert(wx * wy));
            }
        }

        Ok(Self {
            values,
            derivatives,
            weights,
        })
    }

    pub fn dofs_1d(&self) -> usize {
        self.values.ncols()
    }

    pub fn quad_1d(&self) -> usize {
        self.values.nrows()
    }

    /// The number of nodes of a single element.
    pub fn num_element_nodes(&self) -> usize {
        self.dofs_1d() * self.dofs_1d()
    }

    /// The number of quadrature points of a single element.
    pub fn num_quadrature_points(&self) -> usize {
        self.quad_1d() * self.quad_1d()
    }

    pub fn key(&self) -> KernelKey {
        KernelKey::new(self.dofs_1d(), self.quad_1d())
    }

    pub fn values(&self) -> &DMatrix<T> {
        &self.values
    }

    pub fn derivatives(&self) -> &DMatrix<T> {
        &self.derivatives
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Evaluates the gradient of the 2D shape function of node `(dx, dy)` at the quadrature
    /// point `(qx, qy)` with respect to reference coordinates.
    pub fn shape_gradient(&self, (dx, dy): (usize, usize), (qx, qy): (usize, usize)) -> [T; 2] {
        let (b, g) = (&self.values, &self.derivatives);
        [g[(qx, dx)] * b[(qy, dy)], b[(qx, dx)] * g[(qy, dy)]]
    }

    /// Checks that the tables are finite, i.e. usable by the kernels.
    pub(crate) fn is_finite(&self) -> bool {
        izip!(self.values.iter(), self.derivatives.iter()).all(|(v, d)| v.is_finite() && d.is_finite())
            && self.weights.iter().all(|w| w.is_finite())
    }
}

fn convert<T: Real>(x: f64) -> T {
    T::from_f64(x).expect("f64 must be representable in T")
}

/// Value and derivative at `x` of the Lagrange polynomial associated with `nodes[j]`.
fn lagrange_polynomial(nodes: &[f64], j: usize, x: f64) -> (f64, f64) {
    let x_j = nodes[j];
    let factor = |m: usize| (x - nodes[m]) / (x_j - nodes[m]);

    let value: f64 = (0..nodes.len()).filter(|&m| m != j).map(&factor).product();
    let derivative: f64 = (0..nodes.len())
        .filter(|&k| k != j)
        .map(|k| {
            let rest: f64 = (0..nodes.len())
                .filter(|&m| m != j && m != k)
                .map(&factor)
                .product();
            rest / (x_j - nodes[k])
        })
        .sum();
    (value, derivative)
}
