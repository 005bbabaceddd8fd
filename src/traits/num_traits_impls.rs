use std::num::FpCategory;

use num_traits::{
    Float as NumFloat, FloatConst, FromPrimitive, Num, NumCast, One, Signed, ToPrimitive, Zero,
};

use crate::dual::Dual;
use crate::float::Float;
use crate::rules;
use crate::scalar::Scalar;
use crate::tape::TapeThreadLocal;
use crate::var::{rev_binary, rev_unary, Var};

// Associated constants and special values, lifted as constants.
macro_rules! lift_constants {
    ($lift:path, <$inner:ty as $tr:path>; $($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name() -> Self {
                $lift(<$inner as $tr>::$name())
            }
        )+
    };
}

// Predicates answered by the primal alone.
macro_rules! primal_predicates {
    ($field:ident; $($name:ident -> $out:ty),+ $(,)?) => {
        $(
            #[inline]
            fn $name(self) -> $out {
                self.$field.$name()
            }
        )+
    };
}

// Conversions read the primal; constructions give constants.
macro_rules! primitive_conversions {
    ([$($g:tt)*] $ty:ty, $inner:ty, $field:ident, $lift:path) => {
        impl<$($g)*> FromPrimitive for $ty {
            #[inline]
            fn from_i64(n: i64) -> Option<Self> {
                <$inner>::from_i64(n).map($lift)
            }
            #[inline]
            fn from_u64(n: u64) -> Option<Self> {
                <$inner>::from_u64(n).map($lift)
            }
            #[inline]
            fn from_f32(n: f32) -> Option<Self> {
                <$inner>::from_f32(n).map($lift)
            }
            #[inline]
            fn from_f64(n: f64) -> Option<Self> {
                <$inner>::from_f64(n).map($lift)
            }
        }

        impl<$($g)*> ToPrimitive for $ty {
            #[inline]
            fn to_i64(&self) -> Option<i64> {
                self.$field.to_i64()
            }
            #[inline]
            fn to_u64(&self) -> Option<u64> {
                self.$field.to_u64()
            }
            #[inline]
            fn to_f32(&self) -> Option<f32> {
                self.$field.to_f32()
            }
            #[inline]
            fn to_f64(&self) -> Option<f64> {
                self.$field.to_f64()
            }
        }

        impl<$($g)*> NumCast for $ty {
            #[inline]
            fn from<N: ToPrimitive>(n: N) -> Option<Self> {
                <$inner as NumCast>::from(n).map($lift)
            }
        }

        impl<$($g)*> Num for $ty {
            type FromStrRadixErr = <$inner as Num>::FromStrRadixErr;
            fn from_str_radix(s: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
                <$inner as Num>::from_str_radix(s, radix).map($lift)
            }
        }

        impl<$($g)*> Zero for $ty {
            #[inline]
            fn zero() -> Self {
                $lift(<$inner as Zero>::zero())
            }
            #[inline]
            fn is_zero(&self) -> bool {
                self.$field.is_zero()
            }
        }

        impl<$($g)*> One for $ty {
            #[inline]
            fn one() -> Self {
                $lift(<$inner as One>::one())
            }
        }

        impl<$($g)*> FloatConst for $ty {
            lift_constants! {
                $lift, <$inner as FloatConst>;
                E, FRAC_1_PI, FRAC_1_SQRT_2, FRAC_2_PI, FRAC_2_SQRT_PI, FRAC_PI_2,
                FRAC_PI_3, FRAC_PI_4, FRAC_PI_6, FRAC_PI_8, LN_10, LN_2, LOG10_E,
                LOG2_E, PI, SQRT_2, TAU, LOG10_2, LOG2_10,
            }
        }
    };
}

primitive_conversions!([T: Scalar] Dual<T>, T, re, Dual::constant);
primitive_conversions!([F: Float + TapeThreadLocal] Var<F>, F, value, Var::constant);

// ══════════════════════════════════════════════
//  Dual<T>
// ══════════════════════════════════════════════

// Forward to the inherent method of the same name.
macro_rules! inherent {
    ($($name:ident($($arg:ident: $t:ty),*)),+ $(,)?) => {
        $(
            #[inline]
            fn $name(self $(, $arg: $t)*) -> Self {
                Dual::$name(self $(, $arg)*)
            }
        )+
    };
}

impl<T: Scalar> Signed for Dual<T> {
    #[inline]
    fn abs(&self) -> Self {
        Dual::abs(*self)
    }
    #[inline]
    fn abs_sub(&self, other: &Self) -> Self {
        NumFloat::abs_sub(*self, *other)
    }
    #[inline]
    fn signum(&self) -> Self {
        Dual::signum(*self)
    }
    #[inline]
    fn is_positive(&self) -> bool {
        self.re.is_sign_positive()
    }
    #[inline]
    fn is_negative(&self) -> bool {
        self.re.is_sign_negative()
    }
}

impl<T: Scalar> NumFloat for Dual<T> {
    lift_constants! {
        Dual::constant, <T as NumFloat>;
        nan, infinity, neg_infinity, neg_zero,
        min_value, min_positive_value, max_value, epsilon,
    }

    primal_predicates! {
        re;
        is_nan -> bool, is_infinite -> bool, is_finite -> bool, is_normal -> bool,
        is_sign_positive -> bool, is_sign_negative -> bool, classify -> FpCategory,
        integer_decode -> (u64, i16, i8),
    }

    inherent! {
        floor(), ceil(), round(), trunc(), fract(), abs(), signum(),
        recip(), powi(n: i32), powf(n: Self), sqrt(), cbrt(),
        exp(), exp2(), exp_m1(), ln(), log2(), log10(), ln_1p(), log(base: Self),
        sin(), cos(), tan(), asin(), acos(), atan(), atan2(other: Self),
        sinh(), cosh(), tanh(), asinh(), acosh(), atanh(),
        hypot(other: Self), max(other: Self), min(other: Self),
        mul_add(a: Self, b: Self), to_degrees(), to_radians(),
    }

    #[inline]
    fn sin_cos(self) -> (Self, Self) {
        Dual::sin_cos(self)
    }

    fn abs_sub(self, other: Self) -> Self {
        if self.re > other.re {
            self - other
        } else {
            Self::zero()
        }
    }
}

// ══════════════════════════════════════════════
//  Var<F>
// ══════════════════════════════════════════════

// Record one unary node from the rule of the same name.
macro_rules! recorded {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name(self) -> Self {
                let (value, partial) = rules::$name(self.value);
                rev_unary(self, value, partial)
            }
        )+
    };
}

// Record two operands from a binary rule.
macro_rules! recorded2 {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name(self, other: Self) -> Self {
                let (value, dx, dy) = rules::$name(self.value, other.value);
                rev_binary(self, other, value, dx, dy)
            }
        )+
    };
}

// Piecewise-constant: no dependency is recorded.
macro_rules! untracked {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name(self) -> Self {
                Var::constant(self.value.$name())
            }
        )+
    };
}

impl<F: Float + TapeThreadLocal> Signed for Var<F> {
    #[inline]
    fn abs(&self) -> Self {
        NumFloat::abs(*self)
    }
    #[inline]
    fn abs_sub(&self, other: &Self) -> Self {
        NumFloat::abs_sub(*self, *other)
    }
    #[inline]
    fn signum(&self) -> Self {
        NumFloat::signum(*self)
    }
    #[inline]
    fn is_positive(&self) -> bool {
        self.value.is_sign_positive()
    }
    #[inline]
    fn is_negative(&self) -> bool {
        self.value.is_sign_negative()
    }
}

impl<F: Float + TapeThreadLocal> NumFloat for Var<F> {
    lift_constants! {
        Var::constant, <F as NumFloat>;
        nan, infinity, neg_infinity, neg_zero,
        min_value, min_positive_value, max_value, epsilon,
    }

    primal_predicates! {
        value;
        is_nan -> bool, is_infinite -> bool, is_finite -> bool, is_normal -> bool,
        is_sign_positive -> bool, is_sign_negative -> bool, classify -> FpCategory,
        integer_decode -> (u64, i16, i8),
    }

    untracked! { floor, ceil, round, trunc, signum }

    recorded! {
        recip, sqrt, cbrt,
        exp, exp2, exp_m1, ln, log2, log10, ln_1p,
        sin, cos, tan, asin, acos, atan,
        sinh, cosh, tanh, asinh, acosh, atanh,
        abs, fract, to_degrees, to_radians,
    }

    recorded2! { powf, atan2, hypot }

    fn powi(self, n: i32) -> Self {
        let (value, partial) = rules::powi(self.value, n);
        rev_unary(self, value, partial)
    }

    fn sin_cos(self) -> (Self, Self) {
        let (s, c) = self.value.sin_cos();
        (rev_unary(self, s, c), rev_unary(self, c, -s))
    }

    fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }

    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }

    // The selected operand's node is returned as-is.
    fn max(self, other: Self) -> Self {
        if self.value >= other.value { self } else { other }
    }

    fn min(self, other: Self) -> Self {
        if self.value <= other.value { self } else { other }
    }

    fn abs_sub(self, other: Self) -> Self {
        if self.value > other.value { self - other } else { Self::zero() }
    }
}
