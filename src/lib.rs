//! Matrix-free Hessian actions for mesh-quality optimization on 2D tensor-product elements.
//!
//! The central type is [`HessianOperator`](operator::HessianOperator), which computes
//! products of the Hessian of a shape energy with arbitrary vector fields without ever forming
//! the Hessian as a matrix. The computation is split into a *setup* stage, which evaluates and
//! caches a 4th-order coefficient tensor per quadrature point, and an *apply* stage, which
//! contracts that tensor against a trial field. Both stages use sum factorization and are
//! specialized at compile time for each supported pair of (nodes per dimension, quadrature
//! points per dimension), see [`dispatch`].
//!
//! All element-local fields share the same layout, see [`layout`].
pub mod basis;
pub mod config;
pub mod dense;
pub mod dispatch;
pub mod error;
pub mod invariants;
pub mod kernels;
pub mod layout;
pub mod operator;

pub extern crate nalgebra;

pub use config::KernelConfig;
pub use error::KernelError;
pub use operator::HessianOperator;

use nalgebra::RealField;

/// Number of vector components of the fields handled by the kernels.
pub const VDIM: usize = 2;

/// Scalar types supported by the kernels.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
