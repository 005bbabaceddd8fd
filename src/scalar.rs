//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Functions written as `fn f<T: Scalar>(x: &[T]) -> T` work transparently
//! with plain `f64`, `Dual<f64>`, `Var<f64>`, and any nesting of them such as
//! `Dual<Dual<f64>>` or `Dual<Var<f64>>`.

use std::fmt::{Debug, Display};

use num_traits::FromPrimitive;

use crate::dual::Dual;
use crate::float::Float;
use crate::tape::TapeThreadLocal;
use crate::var::Var;

/// The central trait for AD-generic numeric code.
pub trait Scalar:
    num_traits::Float
    + num_traits::FloatConst
    + FromPrimitive
    + Copy
    + Default
    + Debug
    + Display
    + Send
    + 'static
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar (constant, zero derivative).
    fn from_f(val: Self::Float) -> Self;

    /// Extract the primal value, unwrapping every level of nesting.
    fn value(&self) -> Self::Float;

    /// Whether this is an exact zero carrying no derivative at any level.
    ///
    /// A tracked `Var` is never one, even when its value is zero: scaling it
    /// still records a dependency.
    fn is_constant_zero(&self) -> bool;
}

impl Scalar for f32 {
    type Float = f32;

    #[inline]
    fn from_f(val: f32) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f32 {
        *self
    }

    #[inline]
    fn is_constant_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Scalar for f64 {
    type Float = f64;

    #[inline]
    fn from_f(val: f64) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn is_constant_zero(&self) -> bool {
        *self == 0.0
    }
}

impl<T: Scalar> Scalar for Dual<T> {
    type Float = T::Float;

    #[inline]
    fn from_f(val: T::Float) -> Self {
        Dual::constant(T::from_f(val))
    }

    #[inline]
    fn value(&self) -> T::Float {
        self.re.value()
    }

    #[inline]
    fn is_constant_zero(&self) -> bool {
        self.re.is_constant_zero() && self.eps.is_constant_zero()
    }
}

impl<F: Float + TapeThreadLocal> Scalar for Var<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Var::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn is_constant_zero(&self) -> bool {
        self.is_constant() && self.value == F::zero()
    }
}

/// Unwrap an AD value of any nesting depth to its primitive float.
#[inline]
pub fn value_of<T: Scalar>(x: T) -> T::Float {
    x.value()
}

/// Lift an `f64` literal into any scalar type as a constant.
///
/// Literals that do not fit the target float (never the case for `f32`/`f64`)
/// become NaN.
#[inline]
pub fn lit<T: Scalar>(x: f64) -> T {
    T::from_f(<T::Float as FromPrimitive>::from_f64(x).unwrap_or_else(<T::Float as num_traits::Float>::nan))
}
