//! Local derivative rules for the elementary functions.
//!
//! A unary rule maps a primal `x` to `(f(x), f'(x))`; a binary rule maps
//! `(x, y)` to `(f, ∂f/∂x, ∂f/∂y)`. Forward mode scales incoming tangents by
//! these partials and reverse mode stores them on the node, so both read the
//! same table. Rules are generic over [`Scalar`]: under `Dual<Dual<_>>` they
//! are themselves differentiated.

use crate::scalar::{lit, Scalar};

macro_rules! unary_rules {
    ($($name:ident($x:ident) => $body:expr;)+) => {
        $(
            #[inline]
            pub(crate) fn $name<T: Scalar>($x: T) -> (T, T) {
                $body
            }
        )+
    };
}

unary_rules! {
    recip(x) => {
        let inv = x.recip();
        (inv, -inv * inv)
    };
    sqrt(x) => {
        let s = x.sqrt();
        (s, (s + s).recip())
    };
    cbrt(x) => {
        let c = x.cbrt();
        (c, (lit::<T>(3.0) * c * c).recip())
    };

    exp(x) => {
        let e = x.exp();
        (e, e)
    };
    exp2(x) => {
        let e = x.exp2();
        (e, e * T::LN_2())
    };
    exp_m1(x) => (x.exp_m1(), x.exp());
    ln(x) => (x.ln(), x.recip());
    log2(x) => (x.log2(), (x * T::LN_2()).recip());
    log10(x) => (x.log10(), (x * T::LN_10()).recip());
    ln_1p(x) => (x.ln_1p(), (T::one() + x).recip());

    sin(x) => (x.sin(), x.cos());
    cos(x) => (x.cos(), -x.sin());
    tan(x) => {
        let c = x.cos();
        (x.tan(), (c * c).recip())
    };
    asin(x) => (x.asin(), (T::one() - x * x).sqrt().recip());
    acos(x) => (x.acos(), -(T::one() - x * x).sqrt().recip());
    atan(x) => (x.atan(), (T::one() + x * x).recip());

    sinh(x) => (x.sinh(), x.cosh());
    cosh(x) => (x.cosh(), x.sinh());
    tanh(x) => {
        let c = x.cosh();
        (x.tanh(), (c * c).recip())
    };
    asinh(x) => (x.asinh(), (x * x + T::one()).sqrt().recip());
    acosh(x) => (x.acosh(), (x * x - T::one()).sqrt().recip());
    atanh(x) => (x.atanh(), (T::one() - x * x).recip());

    // Flat at the kink.
    abs(x) => {
        let slope = if x == T::zero() { T::zero() } else { x.signum() };
        (x.abs(), slope)
    };
    fract(x) => (x.fract(), T::one());
    to_degrees(x) => (x.to_degrees(), T::one().to_degrees());
    to_radians(x) => (x.to_radians(), T::one().to_radians());
}

#[inline]
pub(crate) fn powi<T: Scalar>(x: T, n: i32) -> (T, T) {
    (x.powi(n), lit::<T>(f64::from(n)) * x.powi(n - 1))
}

/// `x^y`. The `y` partial is NaN for `x < 0` and infinite at `x = 0`; callers
/// drop it when `y` is constant.
#[inline]
pub(crate) fn powf<T: Scalar>(x: T, y: T) -> (T, T, T) {
    let value = x.powf(y);
    (value, y * x.powf(y - T::one()), value * x.ln())
}

/// `atan2(y, x)`.
#[inline]
pub(crate) fn atan2<T: Scalar>(y: T, x: T) -> (T, T, T) {
    let r2 = y * y + x * x;
    (y.atan2(x), x / r2, -y / r2)
}

#[inline]
pub(crate) fn hypot<T: Scalar>(x: T, y: T) -> (T, T, T) {
    let h = x.hypot(y);
    (h, x / h, y / h)
}
