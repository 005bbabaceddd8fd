use std::fmt::{self, Display};

use crate::rules;
use crate::Scalar;

// One method per unary rule, named after it.
macro_rules! elementals {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            pub fn $name(self) -> Self {
                self.chain(rules::$name(self.re))
            }
        )+
    };
}

// Piecewise-constant functions: zero tangent.
macro_rules! flat {
    ($($name:ident),+) => {
        $(
            #[inline]
            pub fn $name(self) -> Self {
                Dual::constant(self.re.$name())
            }
        )+
    };
}

/// Forward-mode dual number: a value paired with its tangent (derivative).
///
/// `Dual { re, eps }` represents `re + eps·ε` where `ε² = 0`. The payload `T`
/// is any [`Scalar`], so duals nest: `Dual<Dual<f64>>` carries second
/// derivatives, `Dual<Dual<Dual<f64>>>` third derivatives, and
/// `Dual<Var<f64>>` runs forward-over-reverse (every tangent operation is
/// itself recorded on the tape).
#[derive(Clone, Copy, Debug, Default)]
pub struct Dual<T: Scalar> {
    /// Primal (real) value.
    pub re: T,
    /// Tangent (derivative) value.
    pub eps: T,
}

impl<T: Scalar> Display for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl<T: Scalar> Dual<T> {
    /// Create a new dual number.
    #[inline]
    pub fn new(re: T, eps: T) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(re: T) -> Self {
        Dual { re, eps: T::zero() }
    }

    /// Create a variable (unit derivative) for differentiation.
    #[inline]
    pub fn variable(re: T) -> Self {
        Dual { re, eps: T::one() }
    }

    /// Scale the tangent by a unary rule's partial.
    #[inline]
    fn chain(self, (value, slope): (T, T)) -> Self {
        Dual {
            re: value,
            eps: self.eps * slope,
        }
    }

    /// Combine both tangents through a binary rule's partials. A term whose
    /// tangent is a constant zero is skipped, so an undefined partial on a
    /// constant operand (`ln(x)` in `x^y` for `x <= 0`) stays out.
    #[inline]
    fn chain2(self, other: Self, (value, dx, dy): (T, T, T)) -> Self {
        let mut eps = T::zero();
        if !self.eps.is_constant_zero() {
            eps = self.eps * dx;
        }
        if !other.eps.is_constant_zero() {
            eps = eps + other.eps * dy;
        }
        Dual { re: value, eps }
    }

    elementals! {
        recip, sqrt, cbrt,
        exp, exp2, exp_m1, ln, log2, log10, ln_1p,
        sin, cos, tan, asin, acos, atan,
        sinh, cosh, tanh, asinh, acosh, atanh,
        abs, fract, to_degrees, to_radians,
    }

    flat! { signum, floor, ceil, round, trunc }

    #[inline]
    pub fn powi(self, n: i32) -> Self {
        self.chain(rules::powi(self.re, n))
    }

    #[inline]
    pub fn powf(self, n: Self) -> Self {
        self.chain2(n, rules::powf(self.re, n.re))
    }

    #[inline]
    pub fn atan2(self, other: Self) -> Self {
        self.chain2(other, rules::atan2(self.re, other.re))
    }

    #[inline]
    pub fn hypot(self, other: Self) -> Self {
        self.chain2(other, rules::hypot(self.re, other.re))
    }

    #[inline]
    pub fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }

    #[inline]
    pub fn sin_cos(self) -> (Self, Self) {
        let (s, c) = self.re.sin_cos();
        (self.chain((s, c)), self.chain((c, -s)))
    }

    #[inline]
    pub fn mul_add(self, a: Self, b: Self) -> Self {
        // d(x*a + b) = a*dx + x*da + db
        Dual {
            re: self.re.mul_add(a.re, b.re),
            eps: self.eps * a.re + self.re * a.eps + b.eps,
        }
    }

    /// The operand with the larger primal, ties going to `self`.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.re >= other.re {
            self
        } else {
            other
        }
    }

    /// The operand with the smaller primal, ties going to `self`.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self.re <= other.re {
            self
        } else {
            other
        }
    }
}
