use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

use crate::dual::Dual;
use crate::float::Float;
use crate::scalar::Scalar;
use crate::tape::TapeThreadLocal;
use crate::var::{rev_binary, rev_unary, Var};

// ──────────────────────────────────────────────
//  Dual<T> operators
// ──────────────────────────────────────────────

impl<T: Scalar> Add for Dual<T> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Dual {
            re: self.re + rhs.re,
            eps: self.eps + rhs.eps,
        }
    }
}

impl<T: Scalar> Sub for Dual<T> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Dual {
            re: self.re - rhs.re,
            eps: self.eps - rhs.eps,
        }
    }
}

impl<T: Scalar> Mul for Dual<T> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Dual {
            re: self.re * rhs.re,
            eps: self.re * rhs.eps + self.eps * rhs.re,
        }
    }
}

impl<T: Scalar> Div for Dual<T> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = rhs.re.recip();
        Dual {
            re: self.re * inv,
            eps: (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        }
    }
}

impl<T: Scalar> Neg for Dual<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Dual {
            re: -self.re,
            eps: -self.eps,
        }
    }
}

impl<T: Scalar> Rem for Dual<T> {
    type Output = Self;
    #[inline]
    fn rem(self, rhs: Self) -> Self {
        // a % b = a - trunc(a/b)·b; the quotient is locally constant.
        let q = (self.re / rhs.re).trunc();
        Dual {
            re: self.re % rhs.re,
            eps: self.eps - rhs.eps * q,
        }
    }
}

impl<T: Scalar> AddAssign for Dual<T> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Scalar> SubAssign for Dual<T> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Scalar> MulAssign for Dual<T> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<T: Scalar> DivAssign for Dual<T> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<T: Scalar> RemAssign for Dual<T> {
    #[inline]
    fn rem_assign(&mut self, rhs: Self) {
        *self = *self % rhs;
    }
}

// Mixed ops: Dual<T> with the primitive float at the bottom of T.
macro_rules! impl_dual_scalar_ops {
    ($f:ty) => {
        impl<T: Scalar<Float = $f>> Add<$f> for Dual<T> {
            type Output = Dual<T>;
            #[inline]
            fn add(self, rhs: $f) -> Dual<T> {
                Dual {
                    re: self.re + T::from_f(rhs),
                    eps: self.eps,
                }
            }
        }

        impl<T: Scalar<Float = $f>> Add<Dual<T>> for $f {
            type Output = Dual<T>;
            #[inline]
            fn add(self, rhs: Dual<T>) -> Dual<T> {
                rhs + self
            }
        }

        impl<T: Scalar<Float = $f>> Sub<$f> for Dual<T> {
            type Output = Dual<T>;
            #[inline]
            fn sub(self, rhs: $f) -> Dual<T> {
                Dual {
                    re: self.re - T::from_f(rhs),
                    eps: self.eps,
                }
            }
        }

        impl<T: Scalar<Float = $f>> Sub<Dual<T>> for $f {
            type Output = Dual<T>;
            #[inline]
            fn sub(self, rhs: Dual<T>) -> Dual<T> {
                Dual {
                    re: T::from_f(self) - rhs.re,
                    eps: -rhs.eps,
                }
            }
        }

        impl<T: Scalar<Float = $f>> Mul<$f> for Dual<T> {
            type Output = Dual<T>;
            #[inline]
            fn mul(self, rhs: $f) -> Dual<T> {
                let c = T::from_f(rhs);
                Dual {
                    re: self.re * c,
                    eps: self.eps * c,
                }
            }
        }

        impl<T: Scalar<Float = $f>> Mul<Dual<T>> for $f {
            type Output = Dual<T>;
            #[inline]
            fn mul(self, rhs: Dual<T>) -> Dual<T> {
                rhs * self
            }
        }

        impl<T: Scalar<Float = $f>> Div<$f> for Dual<T> {
            type Output = Dual<T>;
            #[inline]
            fn div(self, rhs: $f) -> Dual<T> {
                let inv = T::from_f(1.0 / rhs);
                Dual {
                    re: self.re * inv,
                    eps: self.eps * inv,
                }
            }
        }

        impl<T: Scalar<Float = $f>> Div<Dual<T>> for $f {
            type Output = Dual<T>;
            #[inline]
            fn div(self, rhs: Dual<T>) -> Dual<T> {
                let c = T::from_f(self);
                let inv = rhs.re.recip();
                Dual {
                    re: c * inv,
                    eps: -(c * rhs.eps * inv * inv),
                }
            }
        }

        impl<T: Scalar<Float = $f>> Rem<$f> for Dual<T> {
            type Output = Dual<T>;
            #[inline]
            fn rem(self, rhs: $f) -> Dual<T> {
                Dual {
                    re: self.re % T::from_f(rhs),
                    eps: self.eps,
                }
            }
        }
    };
}

impl_dual_scalar_ops!(f32);
impl_dual_scalar_ops!(f64);

impl<T: Scalar> PartialEq for Dual<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.re == other.re
    }
}

impl<T: Scalar> PartialOrd for Dual<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.re.partial_cmp(&other.re)
    }
}

// ──────────────────────────────────────────────
//  Var<F> operators
// ──────────────────────────────────────────────

impl<F: Float + TapeThreadLocal> Add for Var<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        rev_binary(self, rhs, self.value + rhs.value, F::one(), F::one())
    }
}

impl<F: Float + TapeThreadLocal> Sub for Var<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        rev_binary(self, rhs, self.value - rhs.value, F::one(), -F::one())
    }
}

impl<F: Float + TapeThreadLocal> Mul for Var<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        rev_binary(self, rhs, self.value * rhs.value, rhs.value, self.value)
    }
}

impl<F: Float + TapeThreadLocal> Div for Var<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = F::one() / rhs.value;
        let value = self.value * inv;
        rev_binary(self, rhs, value, inv, -value * inv)
    }
}

impl<F: Float + TapeThreadLocal> Neg for Var<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        rev_unary(self, -self.value, -F::one())
    }
}

impl<F: Float + TapeThreadLocal> Rem for Var<F> {
    type Output = Self;
    #[inline]
    fn rem(self, rhs: Self) -> Self {
        let q = (self.value / rhs.value).trunc();
        rev_binary(self, rhs, self.value % rhs.value, F::one(), -q)
    }
}

impl<F: Float + TapeThreadLocal> AddAssign for Var<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: Float + TapeThreadLocal> SubAssign for Var<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: Float + TapeThreadLocal> MulAssign for Var<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: Float + TapeThreadLocal> DivAssign for Var<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<F: Float + TapeThreadLocal> RemAssign for Var<F> {
    #[inline]
    fn rem_assign(&mut self, rhs: Self) {
        *self = *self % rhs;
    }
}

// Mixed ops: Var<F> with primitive floats.
macro_rules! impl_var_scalar_ops {
    ($f:ty) => {
        impl Add<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn add(self, rhs: $f) -> Var<$f> {
                rev_unary(self, self.value + rhs, 1.0)
            }
        }

        impl Add<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn add(self, rhs: Var<$f>) -> Var<$f> {
                rev_unary(rhs, self + rhs.value, 1.0)
            }
        }

        impl Sub<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> Var<$f> {
                rev_unary(self, self.value - rhs, 1.0)
            }
        }

        impl Sub<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn sub(self, rhs: Var<$f>) -> Var<$f> {
                rev_unary(rhs, self - rhs.value, -1.0)
            }
        }

        impl Mul<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> Var<$f> {
                rev_unary(self, self.value * rhs, rhs)
            }
        }

        impl Mul<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn mul(self, rhs: Var<$f>) -> Var<$f> {
                rev_unary(rhs, self * rhs.value, self)
            }
        }

        impl Div<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn div(self, rhs: $f) -> Var<$f> {
                let inv: $f = 1.0 / rhs;
                rev_unary(self, self.value * inv, inv)
            }
        }

        impl Div<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn div(self, rhs: Var<$f>) -> Var<$f> {
                let inv: $f = 1.0 / rhs.value;
                rev_unary(rhs, self * inv, -self * inv * inv)
            }
        }

        impl Rem<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn rem(self, rhs: $f) -> Var<$f> {
                rev_unary(self, self.value % rhs, 1.0)
            }
        }

        impl Rem<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn rem(self, rhs: Var<$f>) -> Var<$f> {
                let q = (self / rhs.value).trunc();
                rev_unary(rhs, self % rhs.value, -q)
            }
        }
    };
}

impl_var_scalar_ops!(f32);
impl_var_scalar_ops!(f64);

impl<F: Float> PartialEq for Var<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<F: Float> PartialOrd for Var<F> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}
