//! ndarray adapters.
//!
//! `Array1`/`ArrayView1` arguments for bundled functions, and functionals
//! accepting `Array1<F>` and returning `Array1<F>` / `Array2<F>`.

use ndarray::{Array1, Array2, ArrayView1};

use crate::dual::Dual;
use crate::float::Float;
use crate::partials::{write_element_refs, Bundle, Element, Operand};
use crate::tape::TapeThreadLocal;
use crate::var::Var;

macro_rules! impl_array_operand {
    ($($lt:lifetime)?; $ty:ty) => {
        impl<$($lt,)? R: Bundle, X: Element<R>> Operand<R> for $ty {
            #[inline]
            fn size(&self) -> usize {
                self.len()
            }
            #[inline]
            fn is_vector(&self) -> bool {
                true
            }
            #[inline]
            fn is_constant(&self) -> bool {
                !<X as Element<R>>::LIVE
            }
            #[inline]
            fn value_at(&self, n: usize) -> R::Partial {
                <X as Element<R>>::primal(&self[n])
            }
            fn write_refs(&self, out: &mut [R::Ref]) {
                write_element_refs::<R, X, _>(self.iter(), out);
            }
        }
    };
}

impl_array_operand!(; Array1<X>);
impl_array_operand!('a; ArrayView1<'a, X>);

/// Compute the gradient, returning an `Array1`.
pub fn grad_ndarray<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Var<F>,
    x: &Array1<F>,
) -> Array1<F> {
    let xs = x.to_vec();
    Array1::from_vec(crate::api::grad(f, &xs))
}

/// Value and gradient, returning `(value, Array1)`.
pub fn grad_ndarray_val<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Var<F>,
    x: &Array1<F>,
) -> (F, Array1<F>) {
    let xs = x.to_vec();
    let (val, g) = crate::api::value_and_grad(f, &xs);
    (val, Array1::from_vec(g))
}

/// Forward-over-reverse Hessian, returning `(value, gradient, hessian)`.
pub fn hessian_ndarray<F: Float + TapeThreadLocal>(
    f: impl Fn(&[Dual<Var<F>>]) -> Dual<Var<F>>,
    x: &Array1<F>,
) -> (F, Array1<F>, Array2<F>) {
    let xs = x.to_vec();
    let n = xs.len();
    let (val, grad, hess) = crate::api::hessian(f, &xs);
    let hess = Array2::from_shape_fn((n, n), |(i, j)| hess[i][j]);
    (val, Array1::from_vec(grad), hess)
}

/// Reverse-mode Jacobian of a multi-output function, returning `Array2<F>`.
///
/// Returns `J[i][j] = ∂f_i/∂x_j`.
pub fn jacobian_ndarray<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Vec<Var<F>>,
    x: &Array1<F>,
) -> Array2<F> {
    let xs = x.to_vec();
    let (_, jac) = crate::api::jacobian_rev(f, &xs);
    Array2::from_shape_fn((jac.len(), xs.len()), |(i, j)| jac[i][j])
}
