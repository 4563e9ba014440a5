//! Closed-form derivatives of invariants of 2x2 matrices.
//!
//! Given a 2x2 matrix $\vec M$, we work with the two invariants
//! $$
//! I_2(\vec M) = \det \vec M,
//! \qquad
//! I_1(\vec M) = \frac{\norm{\vec M}_F^2}{\det \vec M},
//! $$
//! where $I_1$ is the classical shape invariant used by mesh-quality metrics. It is invariant
//! under scaling and rotation of $\vec M$ and attains its minimum value $2$ exactly when
//! $\vec M$ is a scaled rotation.
//!
//! All derivatives are taken with respect to the individual entries $M_{ij}$, and derivative
//! matrices are laid out so that entry $(r, c)$ holds the derivative with respect to $M_{rc}$.
//! The functions are exact closed forms. Anything involving $I_1$ requires $\det \vec M \neq 0$
//! and produces non-finite values otherwise.
use crate::Real;
use nalgebra::Matrix2;
use numeric_literals::replace_float_literals;

/// The squared Frobenius norm $\norm{\vec M}_F^2 = \sum_{ij} M_{ij}^2$.
pub fn frobenius_norm_squared<T: Real>(m: &Matrix2<T>) -> T {
    m.norm_squared()
}

/// The derivative of $\det \vec M$, i.e. the transposed adjugate (cofactor matrix) of $\vec M$.
pub fn d_det<T: Real>(m: &Matrix2<T>) -> Matrix2<T> {
    Matrix2::new(m[(1, 1)], -m[(1, 0)], -m[(0, 1)], m[(0, 0)])
}

/// The derivative of $\partial \det \vec M / \partial M_{ij}$ with respect to every entry.
///
/// For 2x2 matrices this is a constant pattern which does not depend on the entries of the
/// matrix: it is $\pm 1$ at the position $(1 - i, 1 - j)$, with a positive sign when $i = j$,
/// and zero elsewhere.
///
/// # Panics
///
/// Panics if `i` or `j` is not 0 or 1.
pub fn d2_det<T: Real>(i: usize, j: usize) -> Matrix2<T> {
    assert!(i < 2 && j < 2, "Entry ({i}, {j}) is out of bounds for a 2x2 matrix");
    let mut dmdm = Matrix2::zeros();
    dmdm[(1 - i, 1 - j)] = if i == j { T::one() } else { -T::one() };
    dmdm
}

/// The shape invariant $I_1(\vec M) = \norm{\vec M}_F^2 / \det \vec M$.
pub fn metric<T: Real>(m: &Matrix2<T>) -> T {
    frobenius_norm_squared(m) / m.determinant()
}

/// The derivative of the shape invariant,
/// $$
/// \pd{I_1}{\vec M} = \frac{2 \det(\vec M) \vec M - \norm{\vec M}_F^2 \operatorname{adj}(\vec M)^T}{\det(\vec M)^2}.
/// $$
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn d_metric<T: Real>(m: &Matrix2<T>) -> Matrix2<T> {
    let det = m.determinant();
    let fnorm2 = frobenius_norm_squared(m);
    (m * (2.0 * det) - d_det(m) * fnorm2) / (det * det)
}

/// The derivative of $\partial I_1 / \partial \vec M$ with respect to the entry $M_{ij}$.
///
/// Entry $(r, c)$ of the result is the mixed second derivative
/// $\partial^2 I_1 / \partial M_{ij} \partial M_{rc}$. The result is obtained by applying the
/// quotient rule to [`d_metric`], with the derivatives of the numerator expressed through
/// [`d_det`], [`d2_det`] and $\partial \norm{\vec M}_F^2 / \partial M_{ij} = 2 M_{ij}$.
///
/// # Panics
///
/// Panics if `i` or `j` is not 0 or 1.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn d2_metric<T: Real>(m: &Matrix2<T>, i: usize, j: usize) -> Matrix2<T> {
    let d_i2 = d_det(m);
    let dd_i2 = d2_det::<T>(i, j);
    let ddet = d_i2[(i, j)];
    let dfnorm2 = 2.0 * m[(i, j)];

    let det = m.determinant();
    let det2 = det * det;
    let fnorm2 = frobenius_norm_squared(m);

    Matrix2::from_fn(|r, c| {
        let dm = if (r, c) == (i, j) { 1.0 } else { 0.0 };
        let numerator = 2.0 * det * m[(r, c)] - fnorm2 * d_i2[(r, c)];
        let d_numerator = 2.0 * ddet * m[(r, c)] + 2.0 * det * dm - dfnorm2 * d_i2[(r, c)] - fnorm2 * dd_i2[(r, c)];
        (det2 * d_numerator - 2.0 * det * ddet * numerator) / (det2 * det2)
    })
}

/// The shape energy density $\mu(\vec M) = \frac{1}{2} I_1(\vec M) - 1$.
///
/// The density vanishes for scaled rotations and is positive otherwise (for $\det \vec M > 0$).
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn shape_energy_density<T: Real>(m: &Matrix2<T>) -> T {
    0.5 * metric(m) - 1.0
}

/// The derivative $\partial \mu / \partial \vec M = \frac{1}{2} \partial I_1 / \partial \vec M$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn shape_energy_gradient<T: Real>(m: &Matrix2<T>) -> Matrix2<T> {
    d_metric(m) * 0.5
}
